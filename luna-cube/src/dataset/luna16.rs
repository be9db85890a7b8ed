//! LUNA16 候选立方体数据集.
//!
//! 每次取样都会重新读取对应的 CT 扫描, 提取立方体后立即释放. 数据集本身构建后只读.

use std::ops::Range;

use ndarray::{Array4, Axis};

use super::candidates::parse_table;
use super::config::DatasetConfig;
use super::index::{CandidateIndex, IndexedCandidate};
use crate::data::{BoundaryMode, CtVolume, CubeShape, HuWindow, SpatialAttr};
use crate::error::{Error, Result};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 一个样本: 归一化后的立方体和标签.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// 形状为 `(1, depth, height, width)` 的归一化立方体, 首轴为通道轴.
    pub cube: Array4<f32>,
    /// 0 (非结节) 或 1 (结节).
    pub label: u8,
}

impl Sample {
    /// 去掉通道轴后的形状.
    #[inline]
    pub fn cube_dim(&self) -> (usize, usize, usize) {
        let (_, d, h, w) = self.cube.dim();
        (d, h, w)
    }

    /// 立方体是否具有完整的 `shape` 形状 (即未被边界截断).
    #[inline]
    pub fn is_full(&self, shape: &CubeShape) -> bool {
        self.cube_dim() == shape.dim()
    }
}

/// LUNA16 候选立方体数据集.
#[derive(Clone, Debug)]
pub struct Luna16Dataset {
    index: CandidateIndex,
    cube: CubeShape,
    window: HuWindow,
    boundary: BoundaryMode,
}

impl Luna16Dataset {
    /// 读取候选表并建立索引.
    ///
    /// 候选表不存在或格式错误时返回 `Err`. 找不到 CT 文件的候选会被静默丢弃.
    pub fn open(config: &DatasetConfig) -> Result<Self> {
        let rows = parse_table(&config.candidates)?;
        log::info!(
            "{} candidate rows read from {}",
            rows.len(),
            config.candidates.display()
        );
        let index = CandidateIndex::build(rows, &config.root_dir, &config.subsets);
        Ok(Self::from_index(index, config))
    }

    /// 由已有索引构建. `config` 中的路径和分片列表会被忽略.
    pub fn from_index(index: CandidateIndex, config: &DatasetConfig) -> Self {
        Self {
            index,
            cube: config.cube,
            window: config.window,
            boundary: config.boundary,
        }
    }

    /// 样本个数, 即过滤后的候选个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// 是否没有任何样本.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// 底层候选索引.
    #[inline]
    pub fn index(&self) -> &CandidateIndex {
        &self.index
    }

    /// 请求的立方体形状.
    #[inline]
    pub fn cube_shape(&self) -> CubeShape {
        self.cube
    }

    /// 获取第 `index` 个样本对应的候选记录.
    #[inline]
    pub fn record(&self, index: usize) -> Option<&IndexedCandidate> {
        self.index.get(index)
    }

    /// 获取第 `index` 个样本.
    ///
    /// 依次执行: 读取 CT 扫描 -> 在候选坐标处提取立方体 -> 归一化 -> 附上标签.
    ///
    /// `index` 越界时返回 [`Error::IndexOutOfRange`]; CT 文件缺失或损坏时返回对应错误.
    pub fn sample(&self, index: usize) -> Result<Sample> {
        let entry = self.index.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.len(),
        })?;
        let path = entry.volume_path(self.index.root());
        let volume = CtVolume::open(&path)?;

        let world = entry.record.world();
        let bbox = volume.cube_box(&world, &self.cube);
        log::debug!(
            "sample {index}: {} at {world:?}, box {:?}..{:?}",
            path.display(),
            bbox.start(),
            bbox.end()
        );
        if self.boundary == BoundaryMode::Truncate && !bbox.is_inside(volume.shape()) {
            log::warn!(
                "sample {index}: cube truncated at volume boundary of {}",
                entry.record.series_uid
            );
        }

        let raw = bbox.extract(volume.data(), self.boundary);
        drop(volume);

        Ok(Sample {
            cube: self.window.normalize(raw.view()).insert_axis(Axis(0)),
            label: entry.record.label(),
        })
    }

    /// 获取能按索引序迭代所有样本的迭代器.
    #[inline]
    pub fn iter(&self) -> Samples<'_> {
        Samples {
            dataset: self,
            range: 0..self.len(),
        }
    }

    /// 借助 `rayon`, 并行地获取所有样本. 每个元素附带其索引.
    #[cfg(feature = "rayon")]
    pub fn par_samples(
        &self,
    ) -> impl IndexedParallelIterator<Item = (usize, Result<Sample>)> + '_ {
        (0..self.len())
            .into_par_iter()
            .map(move |i| (i, self.sample(i)))
    }
}

/// 样本迭代器, 见 [`Luna16Dataset::iter`].
#[derive(Debug)]
pub struct Samples<'a> {
    dataset: &'a Luna16Dataset,
    range: Range<usize>,
}

impl<'a> Iterator for Samples<'a> {
    type Item = (usize, Result<Sample>);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.range.next()?;
        Some((idx, self.dataset.sample(idx)))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl<'a> ExactSizeIterator for Samples<'a> {
    #[inline]
    fn len(&self) -> usize {
        self.range.len()
    }
}
