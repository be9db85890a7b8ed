use std::path::{Path, PathBuf};

use crate::consts::LUNA16_SUBSET_LEN;
use crate::data::{BoundaryMode, CubeShape, HuWindow};

/// 数据集配置.
///
/// 默认使用 `24 x 40 x 40` 的立方体, 结节 HU 窗口, 以及越界截断.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DatasetConfig {
    /// 数据集根目录, 下有 `subset{N}` 分片目录.
    pub root_dir: PathBuf,
    /// 候选表路径.
    pub candidates: PathBuf,
    /// 参与索引的分片, 按查找顺序排列.
    pub subsets: Vec<u32>,
    /// 立方体形状.
    pub cube: CubeShape,
    /// 归一化窗口.
    pub window: HuWindow,
    /// 越界处理方式.
    pub boundary: BoundaryMode,
}

impl DatasetConfig {
    /// 以 `root_dir` 和 `candidates` 构建, 默认只使用分片 0.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(root_dir: P, candidates: Q) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_owned(),
            candidates: candidates.as_ref().to_owned(),
            subsets: vec![0],
            cube: CubeShape::default(),
            window: HuWindow::default(),
            boundary: BoundaryMode::default(),
        }
    }

    /// 设置参与索引的分片.
    #[inline]
    pub fn with_subsets<I: IntoIterator<Item = u32>>(mut self, subsets: I) -> Self {
        self.subsets = subsets.into_iter().collect();
        self
    }

    /// 使用 LUNA16 的全部 10 个分片.
    #[inline]
    pub fn with_all_subsets(self) -> Self {
        self.with_subsets(0..LUNA16_SUBSET_LEN)
    }

    /// 设置立方体形状.
    #[inline]
    pub fn with_cube(mut self, cube: CubeShape) -> Self {
        self.cube = cube;
        self
    }

    /// 设置归一化窗口.
    #[inline]
    pub fn with_window(mut self, window: HuWindow) -> Self {
        self.window = window;
        self
    }

    /// 设置越界处理方式.
    #[inline]
    pub fn with_boundary(mut self, boundary: BoundaryMode) -> Self {
        self.boundary = boundary;
        self
    }
}
