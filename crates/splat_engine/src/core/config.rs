//! # Viewer Configuration
//!
//! Every tunable of the viewer in one serializable tree. The binary runs on
//! [`ViewerConfig::default`]; the same structure can be written to or read
//! from TOML/RON through the [`Config`] trait.
//!
//! ## Configuration Categories
//!
//! - **Window**: title and initial framebuffer size
//! - **Camera**: eye, target, projection parameters
//! - **Meshes**: OBJ files loaded as point clouds, selected with F1..Fn
//! - **Light**: proxy mesh and point-light parameters
//! - **Points**: initial splat size and color
//! - **Renderer**: Vulkan backend tuning and shader locations

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use crate::config::{Config, ConfigError};
use crate::foundation::math::Vec3;

/// # Shader Configuration
///
/// Locations of the compiled SPIR-V modules used by the splat program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Create shader config with automatic path resolution
    ///
    /// Tries the common output locations so the viewer runs from the
    /// workspace root or from inside a crate directory.
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        let shader_dirs = ["target/shaders/", "shaders/", "resources/shaders/", "../target/shaders/", "./"];

        let find = |name: &str| {
            shader_dirs
                .iter()
                .map(|dir| format!("{dir}{name}"))
                .find(|candidate| Path::new(candidate).exists())
                .unwrap_or_else(|| format!("target/shaders/{name}"))
        };

        Self {
            vertex_shader_path: find(base_vertex),
            fragment_shader_path: find(base_fragment),
        }
    }

    /// Vertex shader path
    pub fn vertex_path(&self) -> PathBuf {
        PathBuf::from(&self.vertex_shader_path)
    }

    /// Fragment shader path
    pub fn fragment_path(&self) -> PathBuf {
        PathBuf::from(&self.fragment_shader_path)
    }

    /// Validate that shader files exist
    pub fn validate(&self) -> Result<(), String> {
        if !Path::new(&self.vertex_shader_path).exists() {
            return Err(format!("Vertex shader not found: {}", self.vertex_shader_path));
        }
        if !Path::new(&self.fragment_shader_path).exists() {
            return Err(format!("Fragment shader not found: {}", self.fragment_shader_path));
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution("splat_vert.spv", "splat_frag.spv")
    }
}

/// # Vulkan Renderer Configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VulkanRendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Maximum frames in flight
    pub max_frames_in_flight: usize,
    /// Upper bound on draw calls recorded in a single frame
    pub max_draws_per_frame: usize,
    /// Whether to enable Vulkan validation layers
    pub enable_validation: Option<bool>,
    /// Background color of the cleared framebuffer
    pub clear_color: [f32; 4],
}

impl VulkanRendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            application_version: (1, 0, 0),
            max_frames_in_flight: 2,
            max_draws_per_frame: 64,
            enable_validation: Some(cfg!(debug_assertions)),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Set maximum frames in flight
    pub fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.max_frames_in_flight = frames;
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Whether validation layers should be requested
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.application_name.is_empty() {
            return Err("Application name cannot be empty".to_string());
        }
        if self.max_frames_in_flight == 0 {
            return Err("Max frames in flight must be at least 1".to_string());
        }
        if self.max_frames_in_flight > 8 {
            return Err("Max frames in flight should not exceed 8".to_string());
        }
        if self.max_draws_per_frame == 0 {
            return Err("Max draws per frame must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for VulkanRendererConfig {
    fn default() -> Self {
        Self::new("Splat Viewer")
    }
}

/// Window title and initial size
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowConfig {
    /// Title bar text
    pub title: String,
    /// Initial width in pixels
    pub width: u32,
    /// Initial height in pixels
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Splat Viewer".to_string(),
            width: 640,
            height: 480,
        }
    }
}

/// Camera placement and projection parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraConfig {
    /// Eye position
    pub eye: [f32; 3],
    /// Point the camera looks at
    pub target: [f32; 3],
    /// Up direction
    pub up: [f32; 3],
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
    /// Closest the eye may be dollied toward the target
    pub min_distance: f32,
    /// Distance travelled per scroll step
    pub zoom_step: f32,
}

impl CameraConfig {
    /// Eye position as a vector
    pub fn eye(&self) -> Vec3 {
        Vec3::from(self.eye)
    }

    /// Target as a vector
    pub fn target(&self) -> Vec3 {
        Vec3::from(self.target)
    }

    /// Up direction as a vector
    pub fn up(&self) -> Vec3 {
        Vec3::from(self.up)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: [0.0, 0.0, 20.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov_y_degrees: 60.0,
            near: 1.0,
            far: 1000.0,
            min_distance: 2.0,
            zoom_step: 1.0,
        }
    }
}

/// Point light and its proxy mesh
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LightConfig {
    /// OBJ drawn at the light position; `None` lights the scene without a proxy
    pub mesh_path: Option<String>,
    /// World position of the light
    pub position: [f32; 3],
    /// Light color, also the proxy's ambient color
    pub color: [f32; 3],
    /// Constant, linear and quadratic attenuation
    pub attenuation: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            mesh_path: Some("resources/models/sphere.obj".to_string()),
            position: [6.0, 6.0, 6.0],
            color: [1.0, 0.95, 0.8],
            attenuation: [1.0, 0.02, 0.001],
        }
    }
}

/// Splat appearance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointConfig {
    /// Point size applied to every cloud at startup
    pub initial_size: f32,
    /// Base color of the splats
    pub color: [f32; 3],
}

impl Default for PointConfig {
    fn default() -> Self {
        Self {
            initial_size: 30.0,
            color: [0.8, 0.8, 0.8],
        }
    }
}

/// # Complete Viewer Configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewerConfig {
    /// Window settings
    pub window: WindowConfig,
    /// Camera settings
    pub camera: CameraConfig,
    /// OBJ files loaded at startup, in F-key order
    pub meshes: Vec<String>,
    /// Point light settings
    pub light: LightConfig,
    /// Splat settings
    pub points: PointConfig,
    /// Shader locations
    pub shaders: ShaderConfig,
    /// Vulkan backend settings
    pub renderer: VulkanRendererConfig,
}

impl ViewerConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.meshes.is_empty() {
            return Err("At least one mesh must be configured".to_string());
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err("Window dimensions must be non-zero".to_string());
        }
        let camera = &self.camera;
        if !(camera.near > 0.0 && camera.far > camera.near) {
            return Err(format!("Invalid clip range: near {} far {}", camera.near, camera.far));
        }
        if !(camera.fov_y_degrees > 0.0 && camera.fov_y_degrees < 180.0) {
            return Err(format!("Invalid field of view: {}", camera.fov_y_degrees));
        }
        let size = self.points.initial_size;
        if !(size.is_finite() && size > 0.0) {
            return Err(format!("Initial point size must be positive, got {}", size));
        }
        self.renderer.validate()
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            meshes: vec![
                "resources/models/bunny.obj".to_string(),
                "resources/models/sandal.obj".to_string(),
                "resources/models/bear.obj".to_string(),
            ],
            light: LightConfig::default(),
            points: PointConfig::default(),
            shaders: ShaderConfig::default(),
            renderer: VulkanRendererConfig::default(),
        }
    }
}

impl Config for ViewerConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("splat_engine_{}_{}", std::process::id(), name))
    }

    #[test]
    fn defaults_are_valid() {
        let config = ViewerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.meshes.len(), 3);
        assert_eq!(config.points.initial_size, 30.0);
        assert_eq!(config.camera.eye, [0.0, 0.0, 20.0]);
    }

    #[test]
    fn toml_and_ron_files_load_what_was_saved() {
        let mut config = ViewerConfig::default();
        config.window.title = "custom".to_string();
        config.points.initial_size = 12.0;

        for name in ["viewer.toml", "viewer.ron"] {
            let path = scratch_path(name);
            config.save_to_file(&path).unwrap();
            let loaded = ViewerConfig::load_from_file(&path).unwrap();
            std::fs::remove_file(&path).ok();
            assert_eq!(loaded, config, "format {name}");
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = ViewerConfig::default().save_to_file(scratch_path("viewer.json")).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn empty_mesh_list_fails_validation() {
        let config = ViewerConfig { meshes: Vec::new(), ..ViewerConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_point_size_fails_validation() {
        for size in [0.0, -4.0, f32::NAN, f32::INFINITY] {
            let mut config = ViewerConfig::default();
            config.points.initial_size = size;
            assert!(config.validate().is_err(), "size {size}");
        }
    }

    #[test]
    fn renderer_limits_are_checked() {
        assert!(VulkanRendererConfig::default().with_max_frames_in_flight(0).validate().is_err());
        assert!(VulkanRendererConfig::default().with_max_frames_in_flight(9).validate().is_err());
        assert!(VulkanRendererConfig::default().with_validation(false).validate().is_ok());
    }
}
