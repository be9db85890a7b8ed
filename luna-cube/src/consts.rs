//! 通用常量.

/// HU 值相关常量.
pub mod hu {
    /// 结节窗口下限. 该值归一化后为 0.0.
    pub const NODULE_LOWER: f32 = -600.0;

    /// 结节窗口上限. 该值归一化后为 1.0.
    pub const NODULE_UPPER: f32 = -300.0;

    /// 空气的 HU 值. 常用作越界填充值.
    pub const AIR: i16 = -1000;

    /// 水的 HU 值.
    pub const WATER: i16 = 0;
}

/// 立方体默认深度 (z 方向体素个数).
pub const CUBE_DEPTH: usize = 24;

/// 立方体默认高度 (y 方向体素个数).
pub const CUBE_HEIGHT: usize = 40;

/// 立方体默认宽度 (x 方向体素个数).
pub const CUBE_WIDTH: usize = 40;

/// 分片目录名前缀. 第 `N` 个分片位于 `{root}/subset{N}`.
pub const SUBSET_PREFIX: &str = "subset";

/// LUNA16 数据集的分片个数.
pub const LUNA16_SUBSET_LEN: u32 = 10;

/// CT 元数据文件扩展名.
pub const VOLUME_EXT: &str = "mhd";

/// 候选表的列数: seriesUID, coordX, coordY, coordZ, class.
pub const CANDIDATE_COLUMNS: usize = 5;

/// 候选类别.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClassLabel {
    /// 非结节, 表中记为 0.
    Negative,

    /// 结节, 表中记为 1.
    Positive,
}

impl ClassLabel {
    /// 从表中的整数值构建. 仅接受 0 和 1.
    #[inline]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Negative),
            1 => Some(Self::Positive),
            _ => None,
        }
    }

    /// 整数表示.
    #[inline]
    pub const fn as_u8(&self) -> u8 {
        match self {
            Self::Negative => 0,
            Self::Positive => 1,
        }
    }

    /// 是否为结节.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        matches!(self, Self::Positive)
    }
}
