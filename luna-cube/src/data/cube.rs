//! 候选立方体的几何计算与提取.

use ndarray::{s, Array3, ArrayView3};

use crate::consts::{CUBE_DEPTH, CUBE_HEIGHT, CUBE_WIDTH};
use crate::{Idx3d, Vec3};

/// 立方体形状, 单位为体素.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CubeShape {
    /// z 方向体素个数.
    pub depth: usize,
    /// y 方向体素个数.
    pub height: usize,
    /// x 方向体素个数.
    pub width: usize,
}

impl Default for CubeShape {
    /// `24 x 40 x 40`.
    #[inline]
    fn default() -> Self {
        Self::new(CUBE_DEPTH, CUBE_HEIGHT, CUBE_WIDTH)
    }
}

impl CubeShape {
    /// 构建.
    #[inline]
    pub const fn new(depth: usize, height: usize, width: usize) -> Self {
        Self {
            depth,
            height,
            width,
        }
    }

    /// `(depth, height, width)`.
    #[inline]
    pub const fn dim(&self) -> Idx3d {
        (self.depth, self.height, self.width)
    }

    /// 体素个数.
    #[inline]
    pub const fn size(&self) -> usize {
        self.depth * self.height * self.width
    }

    #[inline]
    fn as_array(&self) -> [usize; 3] {
        [self.depth, self.height, self.width]
    }
}

/// 立方体越界时的处理方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundaryMode {
    /// 将包围盒裁剪到体数据范围内. 靠近边界时, 返回的立方体会小于请求的形状,
    /// 甚至在某个方向上为空.
    #[default]
    Truncate,

    /// 返回的立方体形状始终等于包围盒形状, 体数据范围以外的体素以给定 HU 值填充.
    Pad(i16),
}

/// 体素空间中的立方体包围盒, 每个轴上为半开区间 `[start, end)`, 按 `(z, y, x)` 组织.
///
/// 边界可以为负数或超出体数据范围, 提取时再根据 [`BoundaryMode`] 处理.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CubeBox {
    start: [i64; 3],
    end: [i64; 3],
}

impl CubeBox {
    /// 以体素坐标 `center` 为中心构建包围盒.
    ///
    /// 每个轴上 `start = trunc(center - n / 2)`, `end = trunc(center + n / 2)`.
    ///
    /// # 注意
    ///
    /// 取整方式是向零截断, 而不是四舍五入或向下取整. 因此包围盒相对真实中心最多偏移一个体素,
    /// 并且当 `center - n / 2` 为负的非整数时, 盒子会比 `n` 少一个体素.
    pub fn centered(center: Vec3, shape: &CubeShape) -> Self {
        let n = shape.as_array();
        let start = std::array::from_fn(|i| (center[i] - n[i] as f64 / 2.0) as i64);
        let end = std::array::from_fn(|i| (center[i] + n[i] as f64 / 2.0) as i64);
        Self { start, end }
    }

    /// 直接由边界构建.
    #[inline]
    pub const fn from_bounds(start: [i64; 3], end: [i64; 3]) -> Self {
        Self { start, end }
    }

    /// 区间起点 (包含).
    #[inline]
    pub const fn start(&self) -> [i64; 3] {
        self.start
    }

    /// 区间终点 (不包含).
    #[inline]
    pub const fn end(&self) -> [i64; 3] {
        self.end
    }

    /// 包围盒本身的形状 (不考虑体数据范围).
    #[inline]
    pub fn dim(&self) -> Idx3d {
        let [z, y, x]: [usize; 3] =
            std::array::from_fn(|i| (self.end[i] - self.start[i]).max(0) as usize);
        (z, y, x)
    }

    /// 包围盒是否完全位于形状为 `shape` 的体数据内部.
    pub fn is_inside(&self, (z, y, x): Idx3d) -> bool {
        let bound = [z, y, x];
        (0..3).all(|i| self.start[i] >= 0 && self.end[i] <= bound[i] as i64)
    }

    /// 包围盒与形状为 `shape` 的体数据的交集, 每个轴上为 `[lo, hi)`, `lo <= hi`.
    pub fn clipped(&self, (z, y, x): Idx3d) -> [(usize, usize); 3] {
        let bound = [z, y, x];
        std::array::from_fn(|i| {
            let n = bound[i] as i64;
            let lo = self.start[i].clamp(0, n);
            let hi = self.end[i].clamp(lo, n);
            (lo as usize, hi as usize)
        })
    }

    /// 从 `volume` 中提取该包围盒对应的区域.
    pub fn extract(&self, volume: ArrayView3<'_, i16>, mode: BoundaryMode) -> Array3<i16> {
        let clip = self.clipped(volume.dim());
        let [(z0, z1), (y0, y1), (x0, x1)] = clip;
        let inner = volume.slice(s![z0..z1, y0..y1, x0..x1]);

        match mode {
            BoundaryMode::Truncate => inner.to_owned(),
            BoundaryMode::Pad(fill) => {
                let mut out = Array3::from_elem(self.dim(), fill);
                if inner.is_empty() {
                    return out;
                }
                // 交集在输出数组中的偏移.
                let [dz, dy, dx]: [usize; 3] =
                    std::array::from_fn(|i| (clip[i].0 as i64 - self.start[i]) as usize);
                let (nz, ny, nx) = inner.dim();
                out.slice_mut(s![dz..dz + nz, dy..dy + ny, dx..dx + nx])
                    .assign(&inner);
                out
            }
        }
    }
}
