use cgmath::{Vector3, Vector4};

/////////////////////////////////////////////////////////////////////////////////////////////////

pub type Index = usize;
pub type Frame = u32; // 1-based, as written in the export
pub type Position = Vector3<f64>;
pub type Rgba = Vector4<f32>;

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Index of a marker inside one [`crate::parse::ParsedDataset`] (or one live rig).
/// Only meaningful for the dataset/rig that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub Index);

/// Opaque handle the presentation layer maps to its own visual entity.
/// Handles are never reused, not even across dataset reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointHandle(pub u64);

/////////////////////////////////////////////////////////////////////////////////////////////////

pub const GREEN: Rgba = Vector4 {
    x: 0.0,
    y: 1.0,
    z: 0.0,
    w: 1.0,
};
pub const RED: Rgba = Vector4 {
    x: 1.0,
    y: 0.0,
    z: 0.0,
    w: 1.0,
};
