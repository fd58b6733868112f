//! # Splat Engine
//!
//! Loads OBJ meshes and renders their vertices as lit, round point splats
//! through Vulkan.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use splat_engine::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     splat_engine::foundation::logging::init();
//!     let mut app = ViewerApp::new(&ViewerConfig::default())?;
//!     app.run()
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod core;

pub mod assets;
pub mod config;
pub mod foundation;
pub mod input;
pub mod render;
pub mod scene;

mod application;

pub use application::{AppError, ViewerApp};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{ObjError, ObjLoader},
        config::Config,
        core::config::ViewerConfig,
        foundation::math::{Mat4, Vec3},
        input::{Action, InputEvent, KeyCode, MouseButton},
        render::{
            CameraState, GeometryBuffer, GraphicsDevice, LightSource, PointCloud, RenderError, Renderable,
            ShaderProgram, Trackball, Uniform, Window,
        },
        scene::{EventResponse, SceneController},
        AppError, ViewerApp,
    };
}
