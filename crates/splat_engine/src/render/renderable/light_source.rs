//! Point light and its proxy mesh

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::core::config::LightConfig;
use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::render::device::{GraphicsDevice, Topology, Uniform};
use crate::render::error::RenderResult;
use crate::render::geometry::GeometryBuffer;
use crate::render::primitives::mesh::Mesh;
use crate::render::shader::ShaderProgram;

use super::{draw_with, Renderable};

/// A single point light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightParameters {
    /// World position
    pub position: Vec3,
    /// Light color, also the proxy mesh's ambient color
    pub color: Vec3,
    /// Constant, linear and quadratic attenuation factors
    pub attenuation: Vec3,
}

impl Default for LightParameters {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            color: Vec3::new(1.0, 1.0, 1.0),
            attenuation: Vec3::new(1.0, 0.0, 0.0),
        }
    }
}

impl From<&LightConfig> for LightParameters {
    fn from(config: &LightConfig) -> Self {
        Self {
            position: Vec3::from(config.position),
            color: Vec3::from(config.color),
            attenuation: Vec3::from(config.attenuation),
        }
    }
}

/// Proxy mesh marking the point light, drawn as solid triangles
///
/// The mesh is expected to be already translated to the light position, so
/// orbiting the model swings the proxy around the world origin.
#[derive(Debug)]
pub struct LightSource {
    geometry: GeometryBuffer,
    model: Mat4,
    parameters: LightParameters,
}

impl LightSource {
    /// Light drawn with `geometry`, starting at the identity transform
    pub fn new(geometry: GeometryBuffer, parameters: LightParameters) -> Self {
        Self { geometry, model: Mat4::identity(), parameters }
    }

    /// Upload a mesh placed at `parameters.position`
    pub fn from_mesh(
        device: Rc<dyn GraphicsDevice>,
        mesh: &Mesh,
        parameters: LightParameters,
    ) -> RenderResult<Self> {
        let geometry = GeometryBuffer::upload(device, &mesh.to_geometry())?;
        Ok(Self::new(geometry, parameters))
    }

    /// A light with no proxy mesh; it still shades the scene
    pub fn without_proxy(device: Rc<dyn GraphicsDevice>, parameters: LightParameters) -> Self {
        Self::new(GeometryBuffer::empty(device), parameters)
    }

    /// Configured parameters, position in load-time coordinates
    pub fn parameters(&self) -> LightParameters {
        self.parameters
    }

    /// Light position after the current model transform
    pub fn world_position(&self) -> Vec3 {
        self.model.transform_point(&Point3::from(self.parameters.position)).coords
    }

    /// Parameters with the position carried to world space
    pub fn lighting(&self) -> LightParameters {
        LightParameters { position: self.world_position(), ..self.parameters }
    }

    /// Whether there is a proxy mesh to draw
    pub fn is_drawable(&self) -> bool {
        self.geometry.is_drawable()
    }
}

impl Renderable for LightSource {
    fn draw(&self, view: &Mat4, projection: &Mat4, shader: &ShaderProgram) -> RenderResult<()> {
        let light = self.lighting();
        let uniforms = [
            Uniform::Color(light.color),
            Uniform::LightPosition(light.position),
            Uniform::Attenuation(light.attenuation),
            Uniform::DrawLightProxy(true),
        ];
        draw_with(
            &self.geometry,
            shader,
            [Uniform::Model(self.model), Uniform::View(*view), Uniform::Projection(*projection)],
            &uniforms,
            |geometry| geometry.device().draw_elements(Topology::Triangles, geometry.index_count()),
        )
    }

    fn model(&self) -> Mat4 {
        self.model
    }

    fn set_model(&mut self, model: Mat4) {
        self.model = model;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ObjLoader;
    use crate::render::backends::headless::HeadlessDevice;
    use approx::assert_relative_eq;
    use std::io::Cursor;
    use std::path::Path;

    const TETRA: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
vn 0 0 -1
vn 0 -1 0
vn -1 0 0
vn 1 1 1
f 1//1 3//1 2//1
f 1//2 2//2 4//2
f 1//3 4//3 3//3
f 2//4 3//4 4//4
";

    fn parameters() -> LightParameters {
        LightParameters {
            position: Vec3::new(5.0, 0.0, 0.0),
            color: Vec3::new(1.0, 0.5, 0.25),
            attenuation: Vec3::new(1.0, 0.1, 0.01),
        }
    }

    fn placed_mesh() -> Mesh {
        let mut mesh = ObjLoader::parse(Cursor::new(TETRA)).unwrap();
        mesh.translate(parameters().position);
        mesh
    }

    #[test]
    fn draws_indexed_triangles_with_proxy_flag() {
        let device = Rc::new(HeadlessDevice::new());
        let shader = ShaderProgram::load(device.clone(), Path::new("v.spv"), Path::new("f.spv")).unwrap();
        let light = LightSource::from_mesh(device.clone(), &placed_mesh(), parameters()).unwrap();
        device.clear_commands();

        light.draw(&Mat4::identity(), &Mat4::identity(), &shader).unwrap();

        let draws = device.draw_calls();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].topology, Topology::Triangles);
        assert!(draws[0].indexed);
        assert_eq!(draws[0].count, 12);
        assert_eq!(device.last_uniform("drawSphere"), Some(Uniform::DrawLightProxy(true)));
        assert_eq!(device.last_uniform("color"), Some(Uniform::Color(parameters().color)));
    }

    #[test]
    fn orbit_moves_world_position() {
        let device = Rc::new(HeadlessDevice::new());
        let mut light = LightSource::from_mesh(device, &placed_mesh(), parameters()).unwrap();
        assert_relative_eq!(light.world_position(), Vec3::new(5.0, 0.0, 0.0), epsilon = 1e-6);

        light.orbit(90.0, Vec3::z());
        assert_relative_eq!(light.world_position(), Vec3::new(0.0, 5.0, 0.0), epsilon = 1e-5);
        assert_eq!(light.parameters().position, Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn light_without_proxy_draws_nothing() {
        let device = Rc::new(HeadlessDevice::new());
        let shader = ShaderProgram::load(device.clone(), Path::new("v.spv"), Path::new("f.spv")).unwrap();
        let light = LightSource::without_proxy(device.clone(), parameters());
        device.clear_commands();

        light.draw(&Mat4::identity(), &Mat4::identity(), &shader).unwrap();
        assert!(device.commands().is_empty());
        assert!(!light.is_drawable());
    }
}
