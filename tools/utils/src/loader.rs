//! 对 `luna-cube::dataset` 的更一层封装. 提供更直接的数据集加载器.

use luna_cube::dataset::{home_dataset_dir_with, DatasetConfig, Luna16Dataset};
use std::env;
use std::path::PathBuf;

/// 非空环境变量 `key` 对应的路径.
fn env_path(key: &str) -> Option<PathBuf> {
    match env::var(key) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => None,
    }
}

/// 获取 LUNA16 数据集根目录.
///
/// 1. 若环境变量 `$LUNA16_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/luna16`.
pub fn root_dir_from_env_or_home() -> Option<PathBuf> {
    env_path("LUNA16_DIR").or_else(|| home_dataset_dir_with(["luna16"]))
}

/// 由显式给出的路径构建配置, 缺失项才回退到环境变量或用户主目录.
///
/// - 根目录: `root`, 否则见 [`root_dir_from_env_or_home`];
/// - 候选表: `candidates`, 否则 `$LUNA16_CANDIDATES`, 否则根目录下的 `candidates.csv`.
///
/// 两者都给出时不会访问环境. 无法确定根目录时返回 `None`.
pub fn resolve_config(root: Option<PathBuf>, candidates: Option<PathBuf>) -> Option<DatasetConfig> {
    let root = root.or_else(root_dir_from_env_or_home)?;
    let candidates = candidates
        .or_else(|| env_path("LUNA16_CANDIDATES"))
        .unwrap_or_else(|| root.join("candidates.csv"));
    Some(DatasetConfig::new(root, candidates))
}

/// 按配置加载数据集.
#[inline]
pub fn dataset(config: &DatasetConfig) -> luna_cube::Result<Luna16Dataset> {
    Luna16Dataset::open(config)
}
