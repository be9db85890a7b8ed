//! 程序运行函数.

use std::path::Path;
use std::time::Instant;

use luna_cube::dataset::{CubeArchiveWriter, Luna16Dataset, Sample};
use rayon::prelude::*;

use crate::profile::Profile;
use crate::result::ExportResult;

/// 每批并行提取的样本数. 一批结果在写入归档前全部驻留内存.
const BATCH: usize = 256;

/// 归档中第 `index` 个样本的条目名.
#[inline]
fn entry_name(index: usize, series_uid: &str) -> String {
    format!("{index:06}_{series_uid}")
}

/// 在 `pool` 中并行提取 `dataset` 的全部样本, 按索引序写入 `out`.
///
/// 单个样本失败只记录日志, 不中断任务.
pub fn run(
    dataset: &Luna16Dataset,
    out: &Path,
    pool: &rayon::ThreadPool,
) -> luna_cube::Result<ExportResult> {
    let shape = dataset.cube_shape();
    let mut profile = Profile::new(dataset.len());
    let mut writer = CubeArchiveWriter::create(out)?;

    log::info!(
        "Exporting {} samples with {} threads...",
        dataset.len(),
        pool.current_num_threads()
    );
    for start in (0..dataset.len()).step_by(BATCH) {
        let end = (start + BATCH).min(dataset.len());
        let batch: Vec<(usize, luna_cube::Result<Sample>, _)> = pool.install(|| {
            (start..end)
                .into_par_iter()
                .map(|i| {
                    let t = Instant::now();
                    let s = dataset.sample(i);
                    (i, s, t.elapsed())
                })
                .collect()
        });

        for (i, result, took) in batch {
            profile.count(&result, &shape, took);
            match result {
                Ok(sample) => {
                    let uid = dataset
                        .record(i)
                        .map_or("", |e| e.record.series_uid.as_str());
                    writer.push(&entry_name(i, uid), &sample)?;
                }
                Err(e) => log::error!("sample {i} failed: {e}"),
            }
        }
        log::info!("{end} / {} samples processed", dataset.len());
    }

    Ok(ExportResult {
        archive: writer.finish()?,
        profile: profile.finish(),
    })
}
