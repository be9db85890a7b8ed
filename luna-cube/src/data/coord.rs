//! 物理坐标系和体素坐标系之间的变换.
//!
//! 所有 [`Vec3`] 均按 `(z, y, x)` 组织, 和体数据数组的轴序一致.
//! 只有 [`WorldCoord`] 按候选表的记录习惯保存 `(x, y, z)`.

use crate::Vec3;

/// 物理空间中的点 (毫米). 字段按候选表记录的 `(x, y, z)` 保存.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldCoord {
    /// x 坐标.
    pub x: f64,
    /// y 坐标.
    pub y: f64,
    /// z 坐标.
    pub z: f64,
}

impl WorldCoord {
    /// 按 `(x, y, z)` 构建.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 倒序为 `(z, y, x)`, 与体数据数组轴序对齐.
    #[inline]
    pub const fn to_zyx(&self) -> Vec3 {
        [self.z, self.y, self.x]
    }

    /// 从 `(z, y, x)` 构建.
    #[inline]
    pub const fn from_zyx([z, y, x]: Vec3) -> Self {
        Self { x, y, z }
    }
}

/// 物理坐标 -> 体素坐标: `|world - origin| / spacing`, 逐分量计算.
///
/// # 注意
///
/// 这里取了差值的绝对值, 因此仅当 `world >= origin` (逐分量) 时,
/// 该变换才是 [`voxel_to_world`] 的精确逆变换. CT 扫描的 origin
/// 一般位于最小角点, 实际数据满足该条件.
#[inline]
pub fn world_to_voxel(world: Vec3, origin: Vec3, spacing: Vec3) -> Vec3 {
    std::array::from_fn(|i| (world[i] - origin[i]).abs() / spacing[i])
}

/// 体素坐标 -> 物理坐标: `voxel * spacing + origin`, 逐分量计算.
#[inline]
pub fn voxel_to_world(voxel: Vec3, origin: Vec3, spacing: Vec3) -> Vec3 {
    std::array::from_fn(|i| voxel[i] * spacing[i] + origin[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec3_eq(a: Vec3, b: Vec3) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_world_coord_reorder() {
        let w = WorldCoord::new(1.0, 2.0, 3.0);
        assert_eq!(w.to_zyx(), [3.0, 2.0, 1.0]);
        assert_eq!(WorldCoord::from_zyx(w.to_zyx()), w);
    }

    #[test]
    fn test_world_to_voxel_identity_geometry() {
        let v = world_to_voxel([25.0, 50.0, 50.0], [0.0; 3], [1.0; 3]);
        assert!(vec3_eq(v, [25.0, 50.0, 50.0]));
    }

    #[test]
    fn test_world_to_voxel_generic() {
        let origin = [-300.0, -200.0, -180.5];
        let spacing = [2.5, 0.7, 0.7];
        let v = world_to_voxel([-250.0, -130.0, -110.5], origin, spacing);
        assert!(vec3_eq(v, [20.0, 100.0, 100.0]));
    }

    #[test]
    fn test_world_to_voxel_takes_abs() {
        // 在 origin 的 "负方向" 一侧, 结果与正方向对称.
        let v = world_to_voxel([-5.0, 0.0, 0.0], [0.0; 3], [1.0; 3]);
        assert!(vec3_eq(v, [5.0, 0.0, 0.0]));
    }

    #[test]
    fn test_round_trip() {
        let origins = [[0.0; 3], [-312.5, -170.2, -165.9], [12.0, 3.0, -7.5]];
        let spacings = [[1.0; 3], [2.5, 0.68, 0.68], [0.625, 0.9, 1.25]];
        let voxels = [[0.0; 3], [25.0, 50.0, 50.0], [117.3, 12.25, 399.9]];
        for o in origins {
            for s in spacings {
                for v in voxels {
                    let back = world_to_voxel(voxel_to_world(v, o, s), o, s);
                    assert!(vec3_eq(back, v), "{v:?} -> {back:?}");
                }
            }
        }
    }
}
