#![warn(missing_docs)]

//! 核心库. 从 LUNA16 格式组织的肺部 CT 数据集中, 围绕候选结节坐标提取固定大小的
//! 3D 立方体 (cube), 并附带二分类标签, 供下游分类器使用.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 体素数组始终按照 `(z, y, x)` 组织. 候选表中的物理坐标按 `(x, y, z)` 存储,
//!   使用前必须显式倒序, 见 [`WorldCoord::to_zyx`].
//! 2. CT 数据以 MetaImage (`.mhd` + `.raw`) 格式存储, 读取时 origin 与 spacing
//!   同样从 `(x, y, z)` 倒序为 `(z, y, x)`.
//! 3. 数据集对象在构造后只读, 可以在多个线程中同时取样.
//!
//! # 流程
//!
//! ### 候选表解析与分片定位 ✅
//!
//! 读取候选表 (首行为表头), 对每条记录按给定分片顺序查找
//! `{root}/subset{N}/{seriesUID}.mhd`, 丢弃找不到的记录.
//!
//! 实现位于 `luna-cube/src/dataset/{candidates, index}.rs`.
//!
//! ### 坐标变换 ✅
//!
//! 物理坐标 -> 体素坐标: `|world - origin| / spacing`.
//! 体素坐标 -> 物理坐标: `voxel * spacing + origin`.
//!
//! 实现位于 `luna-cube/src/data/coord.rs`.
//!
//! ### 立方体提取 ✅
//!
//! 以候选体素坐标为中心, 按截断取整计算半开区间 `[start, end)`, 越界时截断或填充.
//!
//! 实现位于 `luna-cube/src/data/cube.rs`.
//!
//! ### HU 窗口归一化 ✅
//!
//! `clip((v + 600) / 300, 0, 1)`.
//!
//! 实现位于 `luna-cube/src/data/window.rs`.
//!
//! ### 立方体归档 ✅
//!
//! 将提取结果写入 npz 文件, 以便训练时直接读取.
//!
//! 实现位于 `luna-cube/src/dataset/npz_database.rs`.

/// 三维索引, 按 `(z, y, x)` 组织.
pub type Idx3d = (usize, usize, usize);

/// 三维物理量 (坐标, 间距等), 除特别说明外按 `(z, y, x)` 组织.
pub type Vec3 = [f64; 3];

mod error;

/// 3D CT 体数据及其几何操作.
mod data;

pub use data::{
    coord, mhd, BoundaryMode, CtVolume, CubeBox, CubeShape, HuWindow, SpatialAttr, WorldCoord,
};

pub use error::{Error, FormatError, Result};

pub mod consts;

pub mod dataset;
pub mod prelude;
