use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView, Axis, Ix2, Ix3};

use crate::error::{FormatError, Result};
use crate::{Idx3d, Vec3};

pub mod coord;
pub mod cube;
pub mod mhd;
pub mod window;

pub use coord::WorldCoord;
pub use cube::{BoundaryMode, CubeBox, CubeShape};
pub use window::HuWindow;

/// 3D CT 扫描. 体素值为 HU 值, 以 `i16` 保存.
///
/// 数据, `origin` 和 `spacing` 均按 `(z, y, x)` 组织. 构建后只读.
#[derive(Debug, Clone)]
pub struct CtVolume {
    data: Array3<i16>,
    origin: Vec3,
    spacing: Vec3,
}

/// 3D CT 体数据的空间几何属性和部分通用操作.
pub trait SpatialAttr {
    /// 体素 `(0, 0, 0)` 的物理坐标, `(z, y, x)`.
    fn origin(&self) -> Vec3;

    /// 体素间距 (毫米), `(z, y, x)`.
    fn spacing(&self) -> Vec3;

    /// 获取数据形状大小.
    fn shape(&self) -> Idx3d;

    /// 获取水平切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape();
        *z0 < z && *h0 < h && *w0 < w
    }

    /// 获取空间方向 (相邻 2D 切片的方向) 体素分辨率, 以毫米为单位.
    #[inline]
    fn z_mm(&self) -> f64 {
        self.spacing()[0]
    }

    /// 获取 height 方向体素分辨率, 以毫米为单位.
    #[inline]
    fn height_mm(&self) -> f64 {
        self.spacing()[1]
    }

    /// 获取 width 方向体素分辨率, 以毫米为单位.
    #[inline]
    fn width_mm(&self) -> f64 {
        self.spacing()[2]
    }

    /// 体素分辨率在三个维度上是否是各向同的?
    #[inline]
    fn is_isotropic(&self) -> bool {
        let [z, h, w] = self.spacing();
        z == h && z == w
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.spacing().iter().product()
    }

    /// 体数据覆盖的物理范围 (毫米), `(z, y, x)`.
    #[inline]
    fn extent_mm(&self) -> Vec3 {
        let (z, h, w) = self.shape();
        let [sz, sh, sw] = self.spacing();
        [z as f64 * sz, h as f64 * sh, w as f64 * sw]
    }
}

impl SpatialAttr for CtVolume {
    #[inline]
    fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    fn spacing(&self) -> Vec3 {
        self.spacing
    }

    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }
}

impl Index<Idx3d> for CtVolume {
    type Output = i16;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl CtVolume {
    /// 由 `(z, y, x)` 组织的体素数据和几何信息直接构建.
    ///
    /// 若 `spacing` 存在非正数 (或非有限值), 返回 `Err`.
    pub fn new(data: Array3<i16>, origin: Vec3, spacing: Vec3) -> Result<Self> {
        if !spacing.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(FormatError::NonPositiveSpacing(spacing).into());
        }
        Ok(Self {
            data,
            origin,
            spacing,
        })
    }

    /// 打开 MetaImage 文件格式的 3D CT 扫描. `path` 为 `.mhd` 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    ///
    /// header 中的 `Offset` 和 `ElementSpacing` 按 `(x, y, z)` 记录,
    /// 这里会倒序成 `(z, y, x)` 以和数组索引对齐.
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        mhd::read_volume(path.as_ref())
    }

    /// 以 MetaImage 格式保存到 `path` (`.mhd`), 数据写入同目录下的同名 `.raw` 文件.
    #[inline]
    pub fn save_mhd<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        mhd::write_volume(self, path.as_ref())
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, i16, Ix3> {
        self.data.view()
    }

    /// 消费自我, 获得底层数据.
    #[inline]
    pub fn into_data(self) -> Array3<i16> {
        self.data
    }

    /// 获取 3D 扫描 z 空间的第 `z_index` 层切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ArrayView<'_, i16, Ix2> {
        self.data.index_axis(Axis(0), z_index)
    }

    /// 将物理坐标 (`(z, y, x)`) 转换为该体数据下的体素坐标.
    #[inline]
    pub fn world_to_voxel(&self, world: Vec3) -> Vec3 {
        coord::world_to_voxel(world, self.origin, self.spacing)
    }

    /// 将体素坐标转换为物理坐标 (`(z, y, x)`).
    #[inline]
    pub fn voxel_to_world(&self, voxel: Vec3) -> Vec3 {
        coord::voxel_to_world(voxel, self.origin, self.spacing)
    }

    /// 计算以物理坐标 `world` 为中心, 形状为 `shape` 的立方体包围盒.
    #[inline]
    pub fn cube_box(&self, world: &WorldCoord, shape: &CubeShape) -> CubeBox {
        CubeBox::centered(self.world_to_voxel(world.to_zyx()), shape)
    }

    /// 以物理坐标 `world` 为中心提取原始 (未归一化) 立方体.
    ///
    /// 越界处理见 [`BoundaryMode`].
    pub fn extract_cube(
        &self,
        world: &WorldCoord,
        shape: &CubeShape,
        mode: BoundaryMode,
    ) -> Array3<i16> {
        self.cube_box(world, shape).extract(self.data(), mode)
    }

    /// 计算所有体素的 HU 平均值. 空数据返回 `None`.
    pub fn mean_hu(&self) -> Option<f64> {
        match self.size() {
            0 => None,
            n => Some(self.data.iter().map(|v| *v as f64).sum::<f64>() / n as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_volume_rejects_bad_spacing() {
        let data = Array3::<i16>::zeros((2, 2, 2));
        assert!(CtVolume::new(data.clone(), [0.0; 3], [1.0, 0.0, 1.0]).is_err());
        assert!(CtVolume::new(data.clone(), [0.0; 3], [1.0, -2.0, 1.0]).is_err());
        assert!(CtVolume::new(data.clone(), [0.0; 3], [f64::NAN, 1.0, 1.0]).is_err());
        assert!(CtVolume::new(data, [0.0; 3], [2.5, 0.7, 0.7]).is_ok());
    }

    #[test]
    fn test_volume_attr() {
        let data = Array3::<i16>::from_shape_fn((3, 4, 5), |(z, y, x)| (z * 100 + y * 10 + x) as i16);
        let v = CtVolume::new(data, [-10.0, 20.0, 30.0], [2.5, 0.5, 0.5]).unwrap();
        assert_eq!(v.shape(), (3, 4, 5));
        assert_eq!(v.size(), 60);
        assert_eq!(v.len_z(), 3);
        assert_eq!(v[(2, 3, 4)], 234);
        assert!(v.check(&(2, 3, 4)));
        assert!(!v.check(&(3, 0, 0)));
        assert!(!v.is_isotropic());
        assert_eq!(v.voxel(), 2.5 * 0.5 * 0.5);
        assert_eq!(v.extent_mm(), [7.5, 2.0, 2.5]);
        assert_eq!(v.z_mm(), 2.5);
        assert_eq!(v.slice_at(1)[(2, 3)], 123);
    }

    #[test]
    fn test_volume_mean_hu() {
        let v = CtVolume::new(Array3::from_elem((2, 2, 2), -500i16), [0.0; 3], [1.0; 3]).unwrap();
        assert_eq!(v.mean_hu(), Some(-500.0));

        let empty = CtVolume::new(Array3::zeros((0, 2, 2)), [0.0; 3], [1.0; 3]).unwrap();
        assert_eq!(empty.mean_hu(), None);
    }
}
