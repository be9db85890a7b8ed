use ndarray::{Array3, ArrayView3};

use crate::consts::hu::{NODULE_LOWER, NODULE_UPPER};

/// HU 窗口, 由下限和上限描述, 用于将 HU 值线性归一化到 `[0, 1]`.
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HuWindow {
    lower: f32,
    upper: f32,
}

impl Default for HuWindow {
    #[inline]
    fn default() -> Self {
        Self::nodule()
    }
}

impl HuWindow {
    /// 构建 HU 窗口.
    ///
    /// `lower` 和 `upper` 必须在合理范围内且 `lower < upper`, 否则返回 `None`.
    pub fn new(lower: f32, upper: f32) -> Option<HuWindow> {
        let range = -1e5..=1e5;
        if range.contains(&lower) && range.contains(&upper) && lower < upper {
            Some(Self { lower, upper })
        } else {
            None
        }
    }

    /// 从窗位 (window level) 和窗宽 (window width) 构建.
    #[inline]
    pub fn from_level_width(level: f32, width: f32) -> Option<HuWindow> {
        Self::new(level - width / 2.0, level + width / 2.0)
    }

    /// 结节立方体使用的窗口: -600 映射到 0.0, -300 映射到 1.0.
    #[inline]
    pub const fn nodule() -> HuWindow {
        Self {
            lower: NODULE_LOWER,
            upper: NODULE_UPPER,
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.lower
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.upper
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f32 {
        (self.lower + self.upper) / 2.0
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.upper - self.lower
    }

    /// 不检查输入, 直接求 `clip((hu - lower) / width, 0, 1)`.
    #[inline]
    fn map(&self, hu: f32) -> f32 {
        num::clamp((hu - self.lower) / self.width(), 0.0, 1.0)
    }

    /// 求在当前窗口设置下, `hu` 对应的归一化值 (0.0 <= value <= 1.0).
    ///
    /// 如果 `hu` 无意义 (如 inf, NaN), 则返回 `None`.
    #[inline]
    pub fn eval(&self, hu: f32) -> Option<f32> {
        hu.is_finite().then(|| self.map(hu))
    }

    /// 求在当前窗口设置下, `hu` 对应的灰度图像素整数值 (0 <= value <= 255).
    ///
    /// 如果 `hu` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval_u8(&self, hu: f32) -> Option<u8> {
        // 255, not 256.
        self.eval(hu).map(|v| (v * 255.0) as u8)
    }

    /// 对整个立方体逐元素归一化, 返回新数组.
    pub fn normalize(&self, cube: ArrayView3<'_, i16>) -> Array3<f32> {
        cube.mapv(|v| self.map(v as f32))
    }
}
