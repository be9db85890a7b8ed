//! 从合成的 LUNA16 目录结构出发, 测试 "候选表 -> 索引 -> 样本" 的完整流程.

use std::fs;
use std::path::Path;

use luna_cube::dataset::{subset_dir, volume_file_name};
use luna_cube::prelude::*;
use ndarray::Array3;
use tempfile::TempDir;

const UID_A: &str = "1.3.6.1.4.1.14519.5.2.1.6279.6001.111172165674661221381920536987";
const UID_B: &str = "1.3.6.1.4.1.14519.5.2.1.6279.6001.124154461048929153767743874565";
const UID_MISSING: &str = "1.3.6.1.4.1.14519.5.2.1.6279.6001.129055977637338639741695800950";

/// 体素值按 z 方向线性变化: 第 `z` 层的 HU 值为 `-700 + 10 * z`.
fn ramp_volume(shape: Idx3d, origin: Vec3, spacing: Vec3) -> CtVolume {
    let data = Array3::from_shape_fn(shape, |(z, _, _)| -700 + 10 * z as i16);
    CtVolume::new(data, origin, spacing).unwrap()
}

fn put_volume(root: &Path, subset: u32, uid: &str, volume: &CtVolume) {
    let dir = subset_dir(root, subset);
    fs::create_dir_all(&dir).unwrap();
    volume.save_mhd(dir.join(volume_file_name(uid))).unwrap();
}

/// subset0: A, 50x100x100, 单位间距, origin 为 0.
/// subset1: B, 40x80x80, 间距 (2.5, 0.5, 0.5), origin 为 (-100, -20, -20).
fn make_store() -> TempDir {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init();

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    put_volume(root, 0, UID_A, &ramp_volume((50, 100, 100), [0.0; 3], [1.0; 3]));
    put_volume(
        root,
        1,
        UID_B,
        &ramp_volume((40, 80, 80), [-100.0, -20.0, -20.0], [2.5, 0.5, 0.5]),
    );

    let table = format!(
        "seriesuid,coordX,coordY,coordZ,class\n\
         {UID_A},50,50,25,1\n\
         {UID_MISSING},0,0,0,1\n\
         {UID_B},0,0,-50,0\n\
         {UID_A},50,50,2,0\n\
         {UID_A},95.5,50,25,0\n"
    );
    fs::write(root.join("candidates.csv"), table).unwrap();
    dir
}

fn config(root: &Path) -> DatasetConfig {
    DatasetConfig::new(root, root.join("candidates.csv")).with_subsets([0, 1])
}

#[test]
fn test_index_filters_missing_volumes() {
    let store = make_store();
    let ds = Luna16Dataset::open(&config(store.path())).unwrap();
    assert_eq!(ds.len(), 4);

    let subsets: Vec<u32> = ds.index().iter().map(|e| e.subset).collect();
    assert_eq!(subsets, [0, 1, 0, 0]);
    assert_eq!(ds.record(1).unwrap().record.series_uid, UID_B);
    assert_eq!(ds.index().label_counts(), (3, 1));

    // 只使用 subset0 时, B 也会被过滤.
    let only0 = Luna16Dataset::open(&config(store.path()).with_subsets([0])).unwrap();
    assert_eq!(only0.len(), 3);
    assert!(only0.index().iter().all(|e| e.record.series_uid == UID_A));
}

#[test]
fn test_sample_center_of_volume() {
    let store = make_store();
    let ds = Luna16Dataset::open(&config(store.path())).unwrap();

    // 物理坐标 (x=50, y=50, z=25) -> 体素坐标 (25, 50, 50) -> z [13, 37), y [30, 70), x [30, 70).
    let s = ds.sample(0).unwrap();
    assert_eq!(s.label, 1);
    assert_eq!(s.cube.dim(), (1, 24, 40, 40));
    assert!(s.is_full(&CubeShape::default()));

    // 第 13 层 HU 为 -570, 归一化为 0.1.
    assert!((s.cube[(0, 0, 0, 0)] - 0.1).abs() < 1e-6);
    // 第 36 层 HU 为 -340, 归一化为 260 / 300.
    assert!((s.cube[(0, 23, 39, 39)] - 260.0 / 300.0).abs() < 1e-6);
    assert!(s.cube.iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn test_sample_with_anisotropic_spacing() {
    let store = make_store();
    let ds = Luna16Dataset::open(&config(store.path())).unwrap();

    // z: |-50 - (-100)| / 2.5 = 20, y: |0 - (-20)| / 0.5 = 40, x 同 y.
    let s = ds.sample(1).unwrap();
    assert_eq!(s.label, 0);
    assert_eq!(s.cube_dim(), (24, 40, 40));
    // 第 8 层 HU 为 -620, 低于窗口下限.
    assert_eq!(s.cube[(0, 0, 20, 20)], 0.0);
    // 第 20 层 HU 为 -500.
    assert!((s.cube[(0, 12, 0, 0)] - 100.0 / 300.0).abs() < 1e-6);
}

#[test]
fn test_sample_truncated_at_boundary() {
    let store = make_store();
    let ds = Luna16Dataset::open(&config(store.path())).unwrap();

    // z = 2 -> [-10, 14) 截断为 [0, 14).
    let s = ds.sample(2).unwrap();
    assert_eq!(s.cube_dim(), (14, 40, 40));
    assert!(!s.is_full(&ds.cube_shape()));

    // x = 95.5 -> [75, 115) 截断为 [75, 100).
    let s = ds.sample(3).unwrap();
    assert_eq!(s.cube_dim(), (24, 40, 25));
}

#[test]
fn test_sample_padded_at_boundary() {
    let store = make_store();
    let cfg = config(store.path()).with_boundary(BoundaryMode::Pad(AIR));
    let ds = Luna16Dataset::open(&cfg).unwrap();

    let s = ds.sample(2).unwrap();
    assert_eq!(s.cube_dim(), (24, 40, 40));
    // 前 10 层为填充的空气.
    assert!(s.cube.iter().take(10 * 40 * 40).all(|v| *v == 0.0));
    // 第 10 层对应体数据第 0 层, HU 为 -700, 同样为 0.0; 第 20 层对应 -600 + 0.
    assert_eq!(s.cube[(0, 20, 0, 0)], 0.0);
    assert!((s.cube[(0, 23, 0, 0)] - 0.1).abs() < 1e-6);
}

#[test]
fn test_custom_cube_shape() {
    let store = make_store();
    let cfg = config(store.path()).with_cube(CubeShape::new(20, 36, 36));
    let ds = Luna16Dataset::open(&cfg).unwrap();
    assert_eq!(ds.sample(0).unwrap().cube_dim(), (20, 36, 36));
}

#[test]
fn test_sample_index_out_of_range() {
    let store = make_store();
    let ds = Luna16Dataset::open(&config(store.path())).unwrap();
    assert!(matches!(
        ds.sample(4),
        Err(Error::IndexOutOfRange { index: 4, len: 4 })
    ));
}

#[test]
fn test_corrupt_volume_propagates() {
    let store = make_store();
    let ds = Luna16Dataset::open(&config(store.path())).unwrap();

    let raw = subset_dir(store.path(), 1).join(format!("{UID_B}.raw"));
    fs::write(&raw, [0u8; 10]).unwrap();
    assert!(matches!(ds.sample(1), Err(Error::Format(_))));

    fs::remove_file(&raw).unwrap();
    assert!(matches!(ds.sample(1), Err(Error::Io { .. })));

    // 其他样本不受影响.
    assert!(ds.sample(0).is_ok());
}

#[test]
fn test_malformed_table_is_fatal() {
    let store = make_store();
    let path = store.path().join("candidates.csv");
    fs::write(&path, format!("seriesuid,coordX,coordY,coordZ,class\n{UID_A},50,50,25\n")).unwrap();
    assert!(matches!(
        Luna16Dataset::open(&config(store.path())),
        Err(Error::Table { line: 2, .. })
    ));
}

#[test]
fn test_iterators_agree() {
    let store = make_store();
    let ds = Luna16Dataset::open(&config(store.path())).unwrap();

    let it = ds.iter();
    assert_eq!(it.len(), 4);
    let seq: Vec<Sample> = it.map(|(_, s)| s.unwrap()).collect();

    #[cfg(feature = "rayon")]
    {
        use rayon::iter::ParallelIterator;
        let mut par: Vec<(usize, Sample)> = ds
            .par_samples()
            .map(|(i, s)| (i, s.unwrap()))
            .collect();
        par.sort_by_key(|(i, _)| *i);
        assert_eq!(par.len(), seq.len());
        for ((_, p), s) in par.iter().zip(seq.iter()) {
            assert_eq!(p, s);
        }
    }
}

#[test]
fn test_quoted_table_fields_locate_volumes() {
    let store = make_store();
    let path = store.path().join("candidates.csv");
    fs::write(
        &path,
        format!("\"seriesuid\",\"coordX\",\"coordY\",\"coordZ\",\"class\"\n\"{UID_A}\",\"50\",\"50\",\"25\",\"1\"\n"),
    )
    .unwrap();

    let ds = Luna16Dataset::open(&config(store.path())).unwrap();
    assert_eq!(ds.len(), 1);
    assert_eq!(ds.record(0).unwrap().record.series_uid, UID_A);
    assert_eq!(ds.sample(0).unwrap().cube_dim(), (24, 40, 40));
}
