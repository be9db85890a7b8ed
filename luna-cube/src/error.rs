//! 运行时错误.

use std::io;
use std::path::PathBuf;

use ndarray_npy::{ReadNpzError, WriteNpzError};
use thiserror::Error;

/// MetaImage 文件格式错误.
#[derive(Debug, Error)]
pub enum FormatError {
    /// 缺少必需的 header 项.
    #[error("missing header key `{0}`")]
    MissingKey(&'static str),

    /// header 项的值无法解析.
    #[error("invalid value `{value}` for header key `{key}`")]
    InvalidValue {
        /// header 项名.
        key: String,
        /// 原始值.
        value: String,
    },

    /// header 行不是 `Key = Value` 形式.
    #[error("malformed header line {0}")]
    MalformedLine(usize),

    /// 维度不是 3.
    #[error("expected a 3D volume, got {0} dimensions")]
    NotVolume(usize),

    /// 多通道数据.
    #[error("expected a single channel, got {0}")]
    MultiChannel(usize),

    /// 不支持的体素类型.
    #[error("unsupported element type `{0}`")]
    UnsupportedElementType(String),

    /// 体素间距不为正数.
    #[error("voxel spacing must be strictly positive, got {0:?}")]
    NonPositiveSpacing([f64; 3]),

    /// 数据区长度与 header 描述不一致.
    #[error("payload has {actual} bytes, header describes {expected}")]
    PayloadSize {
        /// header 描述的字节数.
        expected: usize,
        /// 实际字节数.
        actual: usize,
    },
}

/// 本 crate 的统一错误类型.
#[derive(Debug, Error)]
pub enum Error {
    /// 底层 I/O 错误, 附带出错路径.
    #[error("{}: {source}", path.display())]
    Io {
        /// 出错的文件路径.
        path: PathBuf,
        /// 原始错误.
        source: io::Error,
    },

    /// CT 文件格式错误.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// 候选表格式错误. `line` 从 1 开始计数 (包含表头).
    #[error("candidate table line {line}: {reason}")]
    Table {
        /// 出错行号.
        line: usize,
        /// 出错原因.
        reason: String,
    },

    /// 样本索引越界.
    #[error("sample index {index} out of range for dataset of length {len}")]
    IndexOutOfRange {
        /// 请求的索引.
        index: usize,
        /// 数据集长度.
        len: usize,
    },

    /// 立方体归档条目名与保留名冲突.
    #[error("archive entry name `{0}` is reserved")]
    ReservedEntry(String),

    /// 读取 npz 归档错误.
    #[error(transparent)]
    ReadNpz(#[from] ReadNpzError),

    /// 写入 npz 归档错误.
    #[error(transparent)]
    WriteNpz(#[from] WriteNpzError),
}

impl Error {
    /// 将 `source` 包装为带路径的 I/O 错误.
    #[inline]
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 构建候选表错误.
    #[inline]
    pub(crate) fn table(line: usize, reason: impl Into<String>) -> Self {
        Self::Table {
            line,
            reason: reason.into(),
        }
    }
}

/// 本 crate 的统一结果类型.
pub type Result<T> = std::result::Result<T, Error>;
