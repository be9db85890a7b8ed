//! 数据集操作.

use std::path::{Path, PathBuf};

use crate::consts::{SUBSET_PREFIX, VOLUME_EXT};

pub mod candidates;
mod config;
pub mod index;
pub mod luna16;
mod npz_database;

pub use candidates::{parse_table, read_table, CandidateRecord};
pub use config::DatasetConfig;
pub use index::{build_index, locate_subset, CandidateIndex, IndexedCandidate};
pub use luna16::{Luna16Dataset, Sample};
pub use npz_database::{CubeArchive, CubeArchiveWriter, OpenArchiveError};

/// 第 `id` 个分片的目录, 即 `{root}/subset{id}`.
#[inline]
pub fn subset_dir(root: &Path, id: u32) -> PathBuf {
    root.join(format!("{SUBSET_PREFIX}{id}"))
}

/// series UID 对应的 CT 元数据文件名, 即 `{uid}.mhd`.
///
/// LUNA16 的 series UID 本身包含 `.`, 因此这里直接拼接, 不使用 `Path::with_extension`.
#[inline]
pub fn volume_file_name(series_uid: &str) -> String {
    format!("{series_uid}.{VOLUME_EXT}")
}

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_names() {
        let root = Path::new("/data/luna16");
        assert_eq!(subset_dir(root, 7), PathBuf::from("/data/luna16/subset7"));
        assert_eq!(
            volume_file_name("1.3.6.1.4.1.14519.5.2.1.6279.6001.105756658031515062000744821260"),
            "1.3.6.1.4.1.14519.5.2.1.6279.6001.105756658031515062000744821260.mhd"
        );
    }
}
