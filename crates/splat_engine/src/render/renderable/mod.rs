//! Drawable scene objects
//!
//! A [`Renderable`] owns its [`GeometryBuffer`] and model matrix. Drawing
//! follows one fixed sequence: bind the program, upload matrices and the
//! variant's uniforms, bind geometry, draw, then unbind geometry and program.
//! Non-drawable geometry skips the sequence entirely.

mod light_source;
mod point_cloud;

pub use light_source::{LightParameters, LightSource};
pub use point_cloud::{PointCloud, MAX_POINT_SIZE, MIN_POINT_SIZE};

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::device::Uniform;
use crate::render::error::RenderResult;
use crate::render::geometry::GeometryBuffer;
use crate::render::shader::ShaderProgram;

/// Common interface of point clouds and the light proxy
pub trait Renderable {
    /// Draw with the given camera matrices
    fn draw(&self, view: &Mat4, projection: &Mat4, shader: &ShaderProgram) -> RenderResult<()>;

    /// Per-frame hook
    fn update(&mut self) {}

    /// Post-multiply the model matrix by a rotation of `angle_degrees` about `axis`
    ///
    /// Degenerate axes and non-finite angles leave the model unchanged.
    fn orbit(&mut self, angle_degrees: f32, axis: Vec3) {
        if let Some(rotation) = Mat4::axis_angle_degrees(axis, angle_degrees) {
            let model = self.model() * rotation;
            self.set_model(model);
        } else {
            log::trace!("Ignoring orbit of {} degrees about {:?}", angle_degrees, axis);
        }
    }

    /// Current model matrix
    fn model(&self) -> Mat4;

    /// Replace the model matrix
    fn set_model(&mut self, model: Mat4);
}

/// Run the shared draw sequence for `geometry`
///
/// `uniforms` are the variant's values, set after the three matrices;
/// `issue` performs the draw call itself. The program and geometry are unbound
/// afterwards even when a step fails.
pub(crate) fn draw_with(
    geometry: &GeometryBuffer,
    shader: &ShaderProgram,
    matrices: [Uniform; 3],
    uniforms: &[Uniform],
    issue: impl FnOnce(&GeometryBuffer) -> RenderResult<()>,
) -> RenderResult<()> {
    if !geometry.is_drawable() {
        return Ok(());
    }

    let device = geometry.device();
    shader.bind()?;

    let result = matrices
        .iter()
        .chain(uniforms)
        .try_for_each(|uniform| device.set_uniform(*uniform))
        .and_then(|()| geometry.bind())
        .and_then(|()| issue(geometry));

    let unbound = geometry.unbind().and_then(|()| shader.unbind());
    result.and(unbound)
}
