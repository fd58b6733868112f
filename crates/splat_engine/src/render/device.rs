//! Graphics device abstraction
//!
//! Everything above this trait (geometry buffers, renderables, the scene
//! controller) is backend-agnostic. A device owns every GPU object and hands
//! out opaque handles; the RAII wrappers in [`geometry`](super::geometry) and
//! [`shader`](super::shader) guarantee each handle is released exactly once.
//!
//! Devices are single-threaded. Methods take `&self` so a device can be
//! shared as `Rc<dyn GraphicsDevice>`; implementations keep their mutable
//! state behind a `RefCell`.

use std::path::Path;

use slotmap::new_key_type;

use crate::foundation::math::{Mat4, Vec3};
use crate::render::error::RenderResult;
use crate::render::primitives::mesh::GeometryData;

new_key_type! {
    /// Handle to a linked vertex+fragment program
    pub struct ShaderHandle;

    /// Handle to uploaded position, normal and index buffers
    pub struct GeometryHandle;
}

/// Primitive assembly mode for a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// One splat per vertex
    Points,
    /// Triangle list
    Triangles,
}

/// A per-draw uniform value
///
/// The set matches the uniform block shared by the splat shaders; values
/// persist until overwritten, as GL uniforms do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    /// Object to world transform
    Model(Mat4),
    /// World to eye transform
    View(Mat4),
    /// Eye to clip transform
    Projection(Mat4),
    /// Object base color (ambient color for the light proxy)
    Color(Vec3),
    /// Splat diameter in pixels
    PointSize(f32),
    /// Light position in world space
    LightPosition(Vec3),
    LightColor(Vec3),
    /// Constant, linear and quadratic attenuation
    Attenuation(Vec3),
    /// Non-zero when drawing the light proxy mesh
    DrawLightProxy(bool),
}

impl Uniform {
    /// Shader-side name of the uniform
    pub fn name(&self) -> &'static str {
        match self {
            Self::Model(_) => "model",
            Self::View(_) => "view",
            Self::Projection(_) => "projection",
            Self::Color(_) => "color",
            Self::PointSize(_) => "pointSize",
            Self::LightPosition(_) => "lightSourcePos",
            Self::LightColor(_) => "lightColor",
            Self::Attenuation(_) => "lightAtten",
            Self::DrawLightProxy(_) => "drawSphere",
        }
    }
}

/// Capability set the renderer needs from a graphics backend
pub trait GraphicsDevice {
    /// Load and link a vertex/fragment program
    fn create_program(&self, vertex: &Path, fragment: &Path) -> RenderResult<ShaderHandle>;

    /// Release a program. Unknown handles are ignored.
    fn destroy_program(&self, program: ShaderHandle);

    /// Upload geometry in one step; nothing is retained on failure
    fn create_geometry(&self, data: &GeometryData) -> RenderResult<GeometryHandle>;

    /// Release geometry. Unknown handles are ignored.
    fn destroy_geometry(&self, geometry: GeometryHandle);

    /// Make `program` current, or clear the current program
    fn use_program(&self, program: Option<ShaderHandle>) -> RenderResult<()>;

    /// Set a uniform on the current program
    fn set_uniform(&self, uniform: Uniform) -> RenderResult<()>;

    /// Bind geometry for the next draw, or clear the binding
    fn bind_geometry(&self, geometry: Option<GeometryHandle>) -> RenderResult<()>;

    /// Draw `vertex_count` vertices of the bound geometry
    fn draw_arrays(&self, topology: Topology, vertex_count: u32) -> RenderResult<()>;

    /// Draw `index_count` indices of the bound geometry
    fn draw_elements(&self, topology: Topology, index_count: u32) -> RenderResult<()>;

    /// Start a frame. `Ok(false)` means the frame should be skipped,
    /// e.g. while the swapchain is being recreated.
    fn begin_frame(&self) -> RenderResult<bool>;

    /// Finish and present the current frame
    fn end_frame(&self) -> RenderResult<()>;

    /// Framebuffer size changed
    fn resize(&self, width: u32, height: u32);
}
