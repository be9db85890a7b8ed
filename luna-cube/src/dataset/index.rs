//! 候选记录到数据分片的索引.
//!
//! LUNA16 将 CT 扫描分散在 `{root}/subset0` .. `{root}/subset9` 中. 每条候选记录只有在
//! 给定的分片列表中找到对应的 `.mhd` 文件时才会被保留.

use std::path::{Path, PathBuf};

use super::candidates::CandidateRecord;
use super::{subset_dir, volume_file_name};
use crate::consts::ClassLabel;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 按 `subsets` 给定的顺序, 查找第一个包含 `record` 对应 CT 文件的分片.
///
/// 找不到时返回 `None`.
pub fn locate_subset(record: &CandidateRecord, root: &Path, subsets: &[u32]) -> Option<u32> {
    let name = volume_file_name(&record.series_uid);
    subsets.iter().copied().find(|id| {
        let mut p = subset_dir(root, *id);
        p.push(&name);
        p.is_file()
    })
}

/// 已定位分片的候选记录.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexedCandidate {
    /// 原始记录.
    pub record: CandidateRecord,
    /// CT 文件所在分片.
    pub subset: u32,
}

impl IndexedCandidate {
    /// CT 文件 (`.mhd`) 的完整路径.
    #[inline]
    pub fn volume_path(&self, root: &Path) -> PathBuf {
        let mut p = subset_dir(root, self.subset);
        p.push(volume_file_name(&self.record.series_uid));
        p
    }
}

/// 过滤 `rows`, 仅保留能在 `subsets` 中定位到 CT 文件的记录, 并附上分片编号.
///
/// 输出保持输入的相对顺序.
pub fn build_index(rows: Vec<CandidateRecord>, root: &Path, subsets: &[u32]) -> Vec<IndexedCandidate> {
    // `collect` 对 indexed 并行迭代器保持顺序.
    #[cfg(feature = "rayon")]
    let located: Vec<Option<u32>> = rows
        .as_slice()
        .into_par_iter()
        .map(|r| locate_subset(r, root, subsets))
        .collect();
    #[cfg(not(feature = "rayon"))]
    let located: Vec<Option<u32>> = rows.iter().map(|r| locate_subset(r, root, subsets)).collect();

    rows.into_iter()
        .zip(located)
        .filter_map(|(record, subset)| Some(IndexedCandidate { record, subset: subset? }))
        .collect()
}

/// 只读的候选索引. 构建后不再修改, 可以在多个线程间共享.
#[derive(Clone, Debug)]
pub struct CandidateIndex {
    root: PathBuf,
    subsets: Vec<u32>,
    entries: Vec<IndexedCandidate>,
}

impl CandidateIndex {
    /// 对 `rows` 建立索引, 见 [`build_index`].
    pub fn build<P: AsRef<Path>>(rows: Vec<CandidateRecord>, root: P, subsets: &[u32]) -> Self {
        let root = root.as_ref().to_owned();
        let total = rows.len();
        let entries = build_index(rows, &root, subsets);
        log::info!(
            "candidate index: {} of {total} records located in subsets {subsets:?}",
            entries.len()
        );
        Self {
            root,
            subsets: subsets.to_vec(),
            entries,
        }
    }

    /// 数据集根目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 建立索引时使用的分片列表.
    #[inline]
    pub fn subsets(&self) -> &[u32] {
        &self.subsets
    }

    /// 保留下来的记录数.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否没有任何记录.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 获取第 `index` 条记录.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&IndexedCandidate> {
        self.entries.get(index)
    }

    /// 按顺序迭代所有记录.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &IndexedCandidate> {
        self.entries.iter()
    }

    /// 第 `index` 条记录对应 CT 文件的完整路径.
    #[inline]
    pub fn volume_path(&self, index: usize) -> Option<PathBuf> {
        self.get(index).map(|e| e.volume_path(&self.root))
    }

    /// (非结节个数, 结节个数).
    pub fn label_counts(&self) -> (usize, usize) {
        let pos = self
            .entries
            .iter()
            .filter(|e| e.record.class_label == ClassLabel::Positive)
            .count();
        (self.len() - pos, pos)
    }

    /// 实际被记录引用的分片, 按 `subsets` 中的顺序.
    pub fn subsets_used(&self) -> Vec<u32> {
        self.subsets
            .iter()
            .copied()
            .filter(|id| self.entries.iter().any(|e| e.subset == *id))
            .collect()
    }
}
