//! Camera state for the viewer
//!
//! The view matrix is a pure function of eye, target and up; the projection
//! is a pure function of field of view, aspect ratio and clip distances.
//! The projection returned here already includes the Vulkan coordinate flip
//! (`P × X`), so callers compose `projection * view * model` exactly as with
//! a right-handed OpenGL-style camera.

use crate::core::config::CameraConfig;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

/// Perspective camera looking at a fixed target
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    /// Eye position in world space
    pub position: Vec3,

    /// Point the camera looks at
    pub target: Vec3,

    /// Up direction
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Width divided by height
    pub aspect: f32,

    /// Near clip distance
    pub near: f32,

    /// Far clip distance
    pub far: f32,

    view: Mat4,
    projection: Mat4,
}

impl CameraState {
    /// Create a perspective camera
    ///
    /// `fov_degrees` is the vertical field of view.
    pub fn perspective(position: Vec3, target: Vec3, up: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position,
            target,
            up,
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
            view: Mat4::identity(),
            projection: Mat4::identity(),
        };
        camera.rebuild_view();
        camera.rebuild_projection();
        camera
    }

    /// Build from configuration for a framebuffer of `width` × `height`
    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        Self::perspective(
            config.eye(),
            config.target(),
            config.up(),
            config.fov_y_degrees,
            aspect_of(width, height).unwrap_or(1.0),
            config.near,
            config.far,
        )
    }

    /// Cached view matrix
    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    /// Cached projection matrix, Vulkan clip space
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// Recompute the projection for a new viewport
    ///
    /// Zero-sized viewports (minimized windows) are ignored and return `false`.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> bool {
        let Some(aspect) = aspect_of(width, height) else {
            log::debug!("Ignoring zero-sized viewport {}x{}", width, height);
            return false;
        };
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
        self.rebuild_projection();
        true
    }

    /// Move the eye along the view direction
    ///
    /// Positive `amount` moves toward the target. The eye never comes closer
    /// than `min_distance`.
    pub fn dolly(&mut self, amount: f32, min_distance: f32) {
        let offset = self.position - self.target;
        let distance = offset.norm();
        if distance <= f32::EPSILON || !amount.is_finite() {
            return;
        }
        let new_distance = (distance - amount).max(min_distance);
        self.position = self.target + offset * (new_distance / distance);
        log::trace!("Camera dolly to distance {:.3}", new_distance);
        self.rebuild_view();
    }

    /// Distance from eye to target
    pub fn distance(&self) -> f32 {
        (self.position - self.target).norm()
    }

    fn rebuild_view(&mut self) {
        self.view = Mat4::look_at(self.position, self.target, self.up);
    }

    fn rebuild_projection(&mut self) {
        self.projection = Mat4::perspective(self.fov, self.aspect, self.near, self.far)
            * Mat4::vulkan_coordinate_transform();
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 640, 480)
    }
}

fn aspect_of(width: u32, height: u32) -> Option<f32> {
    (width > 0 && height > 0).then(|| width as f32 / height as f32)
}
