//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, Vec3};

pub use crate::data::coord::{voxel_to_world, world_to_voxel};
pub use crate::data::{BoundaryMode, CtVolume, CubeBox, CubeShape, HuWindow, SpatialAttr, WorldCoord};

pub use crate::consts::hu::{AIR, NODULE_LOWER, NODULE_UPPER};
pub use crate::consts::{ClassLabel, CUBE_DEPTH, CUBE_HEIGHT, CUBE_WIDTH, LUNA16_SUBSET_LEN};

pub use crate::dataset::{
    home_dataset_dir_with, CandidateIndex, CandidateRecord, CubeArchive, CubeArchiveWriter,
    DatasetConfig, Luna16Dataset, Sample,
};

pub use crate::error::{Error, Result};
