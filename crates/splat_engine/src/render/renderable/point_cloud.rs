//! Point cloud renderable
//!
//! Every vertex of the mesh becomes one round splat lit by the scene light.

use std::rc::Rc;

use crate::foundation::math::{Mat4, Vec3};
use crate::render::device::{GraphicsDevice, Topology, Uniform};
use crate::render::error::{RenderError, RenderResult};
use crate::render::geometry::GeometryBuffer;
use crate::render::primitives::mesh::Mesh;
use crate::render::shader::ShaderProgram;

use super::{draw_with, LightParameters, Renderable};

/// Smallest accepted splat size in pixels
pub const MIN_POINT_SIZE: f32 = 1.0;
/// Largest accepted splat size in pixels
pub const MAX_POINT_SIZE: f32 = 128.0;

const DEFAULT_COLOR: Vec3 = Vec3::new(0.8, 0.8, 0.8);

/// A mesh drawn as one shaded splat per vertex
#[derive(Debug)]
pub struct PointCloud {
    geometry: GeometryBuffer,
    model: Mat4,
    point_size: f32,
    color: Vec3,
    light: LightParameters,
}

impl PointCloud {
    /// Wrap uploaded geometry. `point_size` is validated as by
    /// [`update_point_size`](Self::update_point_size).
    pub fn new(geometry: GeometryBuffer, point_size: f32) -> RenderResult<Self> {
        Ok(Self {
            geometry,
            model: Mat4::identity(),
            point_size: validate_point_size(point_size)?,
            color: DEFAULT_COLOR,
            light: LightParameters::default(),
        })
    }

    /// Upload `mesh` and wrap it
    pub fn from_mesh(device: Rc<dyn GraphicsDevice>, mesh: &Mesh, point_size: f32) -> RenderResult<Self> {
        let geometry = GeometryBuffer::upload(device, &mesh.to_geometry())?;
        Self::new(geometry, point_size)
    }

    /// A cloud with no geometry, drawn as nothing
    pub fn placeholder(device: Rc<dyn GraphicsDevice>, point_size: f32) -> Self {
        Self {
            geometry: GeometryBuffer::empty(device),
            model: Mat4::identity(),
            point_size: clamp_point_size(point_size),
            color: DEFAULT_COLOR,
            light: LightParameters::default(),
        }
    }

    /// Set the base splat color
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    /// Set the point light shading this cloud
    pub fn set_light(&mut self, light: LightParameters) {
        self.light = light;
    }

    /// Change the splat size
    ///
    /// Non-finite and non-positive sizes are rejected; others are clamped to
    /// `[MIN_POINT_SIZE, MAX_POINT_SIZE]`. Returns the size now in effect.
    pub fn update_point_size(&mut self, size: f32) -> RenderResult<f32> {
        self.point_size = validate_point_size(size)?;
        log::debug!("Point size set to {}", self.point_size);
        Ok(self.point_size)
    }

    /// Current splat size
    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    /// The owned geometry
    pub fn geometry(&self) -> &GeometryBuffer {
        &self.geometry
    }
}

impl Renderable for PointCloud {
    fn draw(&self, view: &Mat4, projection: &Mat4, shader: &ShaderProgram) -> RenderResult<()> {
        let uniforms = [
            Uniform::Color(self.color),
            Uniform::PointSize(self.point_size),
            Uniform::LightPosition(self.light.position),
            Uniform::LightColor(self.light.color),
            Uniform::Attenuation(self.light.attenuation),
            Uniform::DrawLightProxy(false),
        ];
        draw_with(
            &self.geometry,
            shader,
            [Uniform::Model(self.model), Uniform::View(*view), Uniform::Projection(*projection)],
            &uniforms,
            |geometry| geometry.device().draw_arrays(Topology::Points, geometry.vertex_count()),
        )
    }

    fn model(&self) -> Mat4 {
        self.model
    }

    fn set_model(&mut self, model: Mat4) {
        self.model = model;
    }
}

fn validate_point_size(size: f32) -> RenderResult<f32> {
    if !size.is_finite() || size <= 0.0 {
        return Err(RenderError::InvalidPointSize(size));
    }
    Ok(size.clamp(MIN_POINT_SIZE, MAX_POINT_SIZE))
}

fn clamp_point_size(size: f32) -> f32 {
    if size.is_finite() {
        size.clamp(MIN_POINT_SIZE, MAX_POINT_SIZE)
    } else {
        MIN_POINT_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::headless::{DeviceCommand, HeadlessDevice};
    use crate::render::primitives::mesh::FaceIndex;
    use approx::assert_relative_eq;
    use std::path::Path;

    fn triangle_mesh() -> Mesh {
        Mesh {
            vertices: vec![Vec3::zeros(), Vec3::x(), Vec3::y()],
            normals: vec![Vec3::z()],
            faces: vec![FaceIndex { positions: [0, 1, 2], normals: [0, 0, 0] }],
        }
    }

    fn setup() -> (Rc<HeadlessDevice>, ShaderProgram) {
        let device = Rc::new(HeadlessDevice::new());
        let shader = ShaderProgram::load(device.clone(), Path::new("v.spv"), Path::new("f.spv")).unwrap();
        (device, shader)
    }

    #[test]
    fn draw_issues_one_point_draw_over_all_vertices() {
        let (device, shader) = setup();
        let cloud = PointCloud::from_mesh(device.clone(), &triangle_mesh(), 30.0).unwrap();
        device.clear_commands();

        cloud.draw(&Mat4::identity(), &Mat4::identity(), &shader).unwrap();

        let draws = device.draw_calls();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].topology, Topology::Points);
        assert_eq!(draws[0].count, 3);
        assert!(!draws[0].indexed);
        assert_eq!(device.last_uniform("pointSize"), Some(Uniform::PointSize(30.0)));
        assert_eq!(device.last_uniform("drawSphere"), Some(Uniform::DrawLightProxy(false)));
    }

    #[test]
    fn draw_sequence_binds_then_unbinds() {
        let (device, shader) = setup();
        let cloud = PointCloud::from_mesh(device.clone(), &triangle_mesh(), 8.0).unwrap();
        device.clear_commands();

        cloud.draw(&Mat4::identity(), &Mat4::identity(), &shader).unwrap();

        let commands = device.commands();
        assert_eq!(commands.first(), Some(&DeviceCommand::UseProgram(Some(shader.handle()))));
        assert!(matches!(commands[1], DeviceCommand::SetUniform(Uniform::Model(_))));
        assert!(matches!(commands[2], DeviceCommand::SetUniform(Uniform::View(_))));
        assert!(matches!(commands[3], DeviceCommand::SetUniform(Uniform::Projection(_))));
        assert_eq!(
            &commands[commands.len() - 2..],
            &[DeviceCommand::BindGeometry(None), DeviceCommand::UseProgram(None)]
        );
    }

    #[test]
    fn placeholder_draws_nothing() {
        let (device, shader) = setup();
        let cloud = PointCloud::placeholder(device.clone(), 30.0);
        device.clear_commands();
        cloud.draw(&Mat4::identity(), &Mat4::identity(), &shader).unwrap();
        assert!(device.commands().is_empty());
    }

    #[test]
    fn point_size_is_clamped_and_invalid_sizes_rejected() {
        let (device, _shader) = setup();
        let mut cloud = PointCloud::from_mesh(device, &triangle_mesh(), 30.0).unwrap();

        assert_eq!(cloud.update_point_size(15.0).unwrap(), 15.0);
        assert_eq!(cloud.update_point_size(0.25).unwrap(), MIN_POINT_SIZE);
        assert_eq!(cloud.update_point_size(1000.0).unwrap(), MAX_POINT_SIZE);
        assert!(matches!(cloud.update_point_size(0.0), Err(RenderError::InvalidPointSize(_))));
        assert!(cloud.update_point_size(f32::NAN).is_err());
        assert_eq!(cloud.point_size(), MAX_POINT_SIZE);
    }

    #[test]
    fn orbit_composes_about_the_same_axis() {
        let (device, _shader) = setup();
        let mut once = PointCloud::from_mesh(device.clone(), &triangle_mesh(), 30.0).unwrap();
        let mut twice = PointCloud::from_mesh(device, &triangle_mesh(), 30.0).unwrap();
        let axis = Vec3::new(1.0, 2.0, 0.5);

        once.orbit(70.0, axis);
        twice.orbit(30.0, axis);
        twice.orbit(40.0, axis);

        assert_relative_eq!(once.model(), twice.model(), epsilon = 1e-5);
    }

    #[test]
    fn orbit_with_zero_axis_is_ignored() {
        let (device, _shader) = setup();
        let mut cloud = PointCloud::from_mesh(device, &triangle_mesh(), 30.0).unwrap();
        cloud.orbit(45.0, Vec3::zeros());
        assert_eq!(cloud.model(), Mat4::identity());
    }
}
