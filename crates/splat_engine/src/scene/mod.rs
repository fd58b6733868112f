//! Scene management
//!
//! [`SceneController`] owns the loaded point clouds and the light and maps
//! input events onto them.

pub mod controller;

pub use controller::{load_light, load_point_cloud, EventResponse, SceneController};

use thiserror::Error;

/// Scene construction errors
#[derive(Error, Debug)]
pub enum SceneError {
    /// No meshes were supplied
    #[error("scene needs at least one point cloud")]
    NoPointClouds,

    /// `ViewerConfig::validate` rejected the configuration
    #[error("invalid viewer configuration: {0}")]
    InvalidConfig(String),
}
