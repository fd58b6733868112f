//! Rendering
//!
//! The [`GraphicsDevice`] trait separates scene objects from the GPU:
//! renderables draw through it, [`backends`] implement it.

pub mod backends;
pub mod device;
pub mod error;
pub mod geometry;
pub mod primitives;
pub mod renderable;
pub mod shader;
pub mod trackball;
pub mod window;

pub use device::{GeometryHandle, GraphicsDevice, ShaderHandle, Topology, Uniform};
pub use error::{RenderError, RenderResult};
pub use geometry::GeometryBuffer;
pub use primitives::{CameraState, GeometryData, Mesh};
pub use renderable::{LightParameters, LightSource, PointCloud, Renderable};
pub use shader::ShaderProgram;
pub use trackball::{Rotation, Trackball};
pub use window::{Window, WindowError};
