use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ndarray::{Array1, Array4, Ix1, Ix4, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter, ReadNpzError};
use thiserror::Error;

use super::luna16::Sample;
use crate::error::{Error, Result};

/// 归档中保存标签数组的条目名.
const LABELS_ENTRY: &str = "labels";

/// npz 条目的完整文件名, 即 `{name}.npy`. 读写两端均使用该名称.
#[inline]
fn entry_name(name: &str) -> String {
    if name.ends_with(".npy") {
        name.to_owned()
    } else {
        format!("{name}.npy")
    }
}

/// 打开 [`CubeArchive`] 错误.
#[derive(Debug, Error)]
pub enum OpenArchiveError {
    /// workers 太大. 最多支持 64.
    #[error("too many workers, at most {0} supported")]
    TooManyWorkers(u32),

    /// 打开 npz 文件错误.
    #[error(transparent)]
    ReadNpzError(#[from] ReadNpzError),

    /// 其他底层 I/O 错误.
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// 立方体 npz 归档写入器.
///
/// 每个样本的立方体以 `{name}.npy` 保存, 标签在 [`CubeArchiveWriter::finish`]
/// 时按写入顺序统一保存为 `labels.npy`.
pub struct CubeArchiveWriter {
    path: PathBuf,
    writer: NpzWriter<BufWriter<File>>,
    labels: Vec<u8>,
}

impl CubeArchiveWriter {
    /// 在 `path` 处创建 (或覆盖) npz 文件.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
        Ok(Self {
            writer: NpzWriter::new(BufWriter::new(file)),
            path,
            labels: Vec::new(),
        })
    }

    /// 写入一个样本. `name` 不能是 `labels`, 且不应重复.
    ///
    /// `name` 为 `labels` (或 `labels.npy`) 时返回 [`Error::ReservedEntry`].
    pub fn push(&mut self, name: &str, sample: &Sample) -> Result<()> {
        let key = entry_name(name);
        if key == entry_name(LABELS_ENTRY) {
            return Err(Error::ReservedEntry(name.to_owned()));
        }
        self.writer.add_array(key, &sample.cube)?;
        self.labels.push(sample.label);
        Ok(())
    }

    /// 已写入的样本个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// 是否尚未写入任何样本.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// 写入标签数组并关闭文件. 返回归档路径.
    pub fn finish(mut self) -> Result<PathBuf> {
        let labels = Array1::from_vec(std::mem::take(&mut self.labels));
        self.writer.add_array(entry_name(LABELS_ENTRY), &labels)?;
        self.writer.finish()?;
        Ok(self.path)
    }
}

/// 立方体 npz 归档.
///
/// 该结构可用于建模硬盘上已存储的多个候选立方体的压缩文件.
pub struct CubeArchive {
    entries: Vec<Mutex<NpzReader<File>>>,
    turn: AtomicUsize,
}

impl CubeArchive {
    /// 初始化.
    ///
    /// `workers` 指定了底层工作通道的个数, 最大为 64. 系统会从路径 `p` 打开文件
    /// `workers` 次, 并为每个打开通道指定一个排他入口点 (以期获得更高的并行度).
    pub fn new<P: AsRef<Path>>(workers: NonZeroUsize, p: P) -> std::result::Result<Self, OpenArchiveError> {
        let workers = workers.get();
        if workers > 64 {
            return Err(OpenArchiveError::TooManyWorkers(64));
        }
        let mut v = Vec::with_capacity(workers);
        for _ in 0..workers {
            let file = OpenOptions::new().read(true).open(p.as_ref())?;
            v.push(Mutex::new(NpzReader::new(file)?));
        }
        Ok(Self {
            entries: v,
            turn: AtomicUsize::new(0),
        })
    }

    /// 通过写入时的样本名 `name` 获取立方体, 形状为 `(1, D, H, W)`.
    pub fn cube_by_name(&self, name: &str) -> std::result::Result<Array4<f32>, ReadNpzError> {
        let key = entry_name(name);
        self.with_reader(|r| r.by_name::<OwnedRepr<f32>, Ix4>(&key))
    }

    /// 通过 npz 数值索引获取立方体. 注意 `labels` 条目也占一个索引.
    pub fn cube_by_index(&self, index: usize) -> std::result::Result<Array4<f32>, ReadNpzError> {
        self.with_reader(|r| r.by_index::<OwnedRepr<f32>, Ix4>(index))
    }

    /// 按写入顺序获取全部标签.
    pub fn labels(&self) -> std::result::Result<Array1<u8>, ReadNpzError> {
        let key = entry_name(LABELS_ENTRY);
        self.with_reader(|r| r.by_name::<OwnedRepr<u8>, Ix1>(&key))
    }

    /// 获取所有样本名 (不含 `.npy` 后缀, 不含 `labels`).
    pub fn names(&self) -> std::result::Result<Vec<String>, ReadNpzError> {
        let names = self.with_reader(|r| r.names())?;
        Ok(names
            .into_iter()
            .map(|n| n.strip_suffix(".npy").map(str::to_owned).unwrap_or(n))
            .filter(|n| n != LABELS_ENTRY)
            .collect())
    }

    /// 工作通道个数.
    #[inline]
    pub fn worker_len(&self) -> usize {
        self.entries.len()
    }

    /// 获取底层 npz 文件的样本个数.
    pub fn len(&self) -> std::result::Result<usize, ReadNpzError> {
        Ok(self.names()?.len())
    }

    fn next_slot(&self) -> usize {
        self.turn.fetch_add(1, Ordering::Relaxed) % self.worker_len()
    }

    fn with_reader<T>(
        &self,
        op: impl FnOnce(&mut NpzReader<File>) -> std::result::Result<T, ReadNpzError>,
    ) -> std::result::Result<T, ReadNpzError> {
        let slot = self.next_slot();
        // 其他线程在持锁期间 panic 不会破坏 reader 本身的状态.
        let mut reader = match self.entries[slot].lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        op(&mut reader)
    }
}
