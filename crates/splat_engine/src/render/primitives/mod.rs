//! Core rendering data: camera state and mesh geometry

pub mod camera;
pub mod mesh;

pub use camera::CameraState;
pub use mesh::{FaceIndex, GeometryData, Mesh};
