//! Headless graphics device
//!
//! Implements [`GraphicsDevice`] without a GPU by recording every call. It
//! enforces the same binding rules as the Vulkan backend (a program must be
//! in use for uniforms and draws, geometry must be bound and live for draws)
//! but does not require draws to sit inside a frame.
//!
//! Allocation and shader failures can be injected to exercise error paths.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use slotmap::SlotMap;

use crate::render::device::{GeometryHandle, GraphicsDevice, ShaderHandle, Topology, Uniform};
use crate::render::error::{RenderError, RenderResult};
use crate::render::primitives::mesh::GeometryData;

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Program linked
    CreateProgram(ShaderHandle),
    /// Program released
    DestroyProgram(ShaderHandle),
    /// Geometry uploaded
    CreateGeometry(GeometryHandle),
    /// Geometry released
    DestroyGeometry(GeometryHandle),
    /// Current program changed or cleared
    UseProgram(Option<ShaderHandle>),
    /// Uniform written to the current program
    SetUniform(Uniform),
    /// Geometry binding changed or cleared
    BindGeometry(Option<GeometryHandle>),
    /// Draw accepted by the device
    Draw(DrawCall),
    BeginFrame,
    EndFrame,
    /// Framebuffer size reported by the scene
    Resize {
        /// New width in pixels
        width: u32,
        /// New height in pixels
        height: u32,
    },
}

/// A recorded draw with the state it was issued against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    /// Program in use at the draw
    pub program: ShaderHandle,
    /// Geometry bound at the draw
    pub geometry: GeometryHandle,
    /// Primitive assembly mode
    pub topology: Topology,
    /// Vertices or indices drawn
    pub count: u32,
    /// Whether the draw went through the index buffer
    pub indexed: bool,
}

#[derive(Debug)]
struct HeadlessGeometry {
    vertex_count: u32,
    index_count: u32,
}

#[derive(Debug, Default)]
struct HeadlessState {
    programs: SlotMap<ShaderHandle, (PathBuf, PathBuf)>,
    geometry: SlotMap<GeometryHandle, HeadlessGeometry>,
    current_program: Option<ShaderHandle>,
    bound_geometry: Option<GeometryHandle>,
    commands: Vec<DeviceCommand>,
    stale_releases: usize,
}

/// Recording device for tests and GPU-less runs
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    state: RefCell<HeadlessState>,
    fail_next_allocation: Cell<bool>,
    fail_next_program: Cell<bool>,
}

impl HeadlessDevice {
    /// Device with nothing allocated or recorded
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_geometry` fail with an allocation error
    pub fn fail_next_allocation(&self) {
        self.fail_next_allocation.set(true);
    }

    /// Make the next `create_program` fail with a shader error
    pub fn fail_next_program(&self) {
        self.fail_next_program.set(true);
    }

    /// Everything recorded so far
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.state.borrow().commands.clone()
    }

    /// Forget recorded commands, keeping live resources
    pub fn clear_commands(&self) {
        self.state.borrow_mut().commands.clear();
    }

    /// Recorded draws in issue order
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.state
            .borrow()
            .commands
            .iter()
            .filter_map(|command| match command {
                DeviceCommand::Draw(draw) => Some(*draw),
                _ => None,
            })
            .collect()
    }

    /// Geometry still allocated
    pub fn live_geometry(&self) -> usize {
        self.state.borrow().geometry.len()
    }

    /// Programs still allocated
    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// Releases of handles that were already gone
    pub fn stale_releases(&self) -> usize {
        self.state.borrow().stale_releases
    }

    /// Most recent value set for the uniform named `name`
    pub fn last_uniform(&self, name: &str) -> Option<Uniform> {
        self.state.borrow().commands.iter().rev().find_map(|command| match command {
            DeviceCommand::SetUniform(uniform) if uniform.name() == name => Some(*uniform),
            _ => None,
        })
    }

    fn draw(&self, topology: Topology, count: u32, indexed: bool) -> RenderResult<()> {
        let mut state = self.state.borrow_mut();
        let program = state.current_program.ok_or(RenderError::NoProgramBound)?;
        let geometry = state.bound_geometry.ok_or(RenderError::NoGeometryBound)?;
        let buffers = state
            .geometry
            .get(geometry)
            .ok_or(RenderError::UnknownHandle { kind: "geometry" })?;

        let available = if indexed { buffers.index_count } else { buffers.vertex_count };
        if count > available {
            return Err(RenderError::DrawOutOfRange { requested: count, available });
        }

        state.commands.push(DeviceCommand::Draw(DrawCall { program, geometry, topology, count, indexed }));
        Ok(())
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_program(&self, vertex: &Path, fragment: &Path) -> RenderResult<ShaderHandle> {
        if self.fail_next_program.replace(false) {
            return Err(RenderError::ShaderCompile {
                path: vertex.to_path_buf(),
                reason: "injected failure".to_string(),
            });
        }
        let mut state = self.state.borrow_mut();
        let handle = state.programs.insert((vertex.to_path_buf(), fragment.to_path_buf()));
        state.commands.push(DeviceCommand::CreateProgram(handle));
        Ok(handle)
    }

    fn destroy_program(&self, program: ShaderHandle) {
        let mut state = self.state.borrow_mut();
        if state.programs.remove(program).is_none() {
            state.stale_releases += 1;
            return;
        }
        if state.current_program == Some(program) {
            state.current_program = None;
        }
        state.commands.push(DeviceCommand::DestroyProgram(program));
    }

    fn create_geometry(&self, data: &GeometryData) -> RenderResult<GeometryHandle> {
        if self.fail_next_allocation.replace(false) {
            return Err(RenderError::Allocation("injected failure".to_string()));
        }
        let mut state = self.state.borrow_mut();
        let handle = state.geometry.insert(HeadlessGeometry {
            vertex_count: data.vertex_count(),
            index_count: data.index_count(),
        });
        state.commands.push(DeviceCommand::CreateGeometry(handle));
        Ok(handle)
    }

    fn destroy_geometry(&self, geometry: GeometryHandle) {
        let mut state = self.state.borrow_mut();
        if state.geometry.remove(geometry).is_none() {
            state.stale_releases += 1;
            return;
        }
        if state.bound_geometry == Some(geometry) {
            state.bound_geometry = None;
        }
        state.commands.push(DeviceCommand::DestroyGeometry(geometry));
    }

    fn use_program(&self, program: Option<ShaderHandle>) -> RenderResult<()> {
        let mut state = self.state.borrow_mut();
        if let Some(handle) = program {
            if !state.programs.contains_key(handle) {
                return Err(RenderError::UnknownHandle { kind: "program" });
            }
        }
        state.current_program = program;
        state.commands.push(DeviceCommand::UseProgram(program));
        Ok(())
    }

    fn set_uniform(&self, uniform: Uniform) -> RenderResult<()> {
        let mut state = self.state.borrow_mut();
        if state.current_program.is_none() {
            return Err(RenderError::NoProgramBound);
        }
        state.commands.push(DeviceCommand::SetUniform(uniform));
        Ok(())
    }

    fn bind_geometry(&self, geometry: Option<GeometryHandle>) -> RenderResult<()> {
        let mut state = self.state.borrow_mut();
        if let Some(handle) = geometry {
            if !state.geometry.contains_key(handle) {
                return Err(RenderError::UnknownHandle { kind: "geometry" });
            }
        }
        state.bound_geometry = geometry;
        state.commands.push(DeviceCommand::BindGeometry(geometry));
        Ok(())
    }

    fn draw_arrays(&self, topology: Topology, vertex_count: u32) -> RenderResult<()> {
        self.draw(topology, vertex_count, false)
    }

    fn draw_elements(&self, topology: Topology, index_count: u32) -> RenderResult<()> {
        self.draw(topology, index_count, true)
    }

    fn begin_frame(&self) -> RenderResult<bool> {
        self.state.borrow_mut().commands.push(DeviceCommand::BeginFrame);
        Ok(true)
    }

    fn end_frame(&self) -> RenderResult<()> {
        self.state.borrow_mut().commands.push(DeviceCommand::EndFrame);
        Ok(())
    }

    fn resize(&self, width: u32, height: u32) {
        self.state.borrow_mut().commands.push(DeviceCommand::Resize { width, height });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_point() -> GeometryData {
        GeometryData {
            positions: vec![[0.0, 0.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]],
            indices: Vec::new(),
        }
    }

    #[test]
    fn draw_requires_program_and_geometry() {
        let device = HeadlessDevice::new();
        let program = device.create_program(Path::new("a.spv"), Path::new("b.spv")).unwrap();
        let geometry = device.create_geometry(&one_point()).unwrap();

        assert!(matches!(device.draw_arrays(Topology::Points, 1), Err(RenderError::NoProgramBound)));
        device.use_program(Some(program)).unwrap();
        assert!(matches!(device.draw_arrays(Topology::Points, 1), Err(RenderError::NoGeometryBound)));
        device.bind_geometry(Some(geometry)).unwrap();
        device.draw_arrays(Topology::Points, 1).unwrap();

        assert_eq!(device.draw_calls().len(), 1);
    }

    #[test]
    fn released_handles_cannot_be_bound() {
        let device = HeadlessDevice::new();
        let geometry = device.create_geometry(&one_point()).unwrap();
        device.destroy_geometry(geometry);
        assert!(device.bind_geometry(Some(geometry)).is_err());

        device.destroy_geometry(geometry);
        assert_eq!(device.stale_releases(), 1);
        assert_eq!(device.live_geometry(), 0);
    }

    #[test]
    fn injected_allocation_failure_applies_once() {
        let device = HeadlessDevice::new();
        device.fail_next_allocation();
        assert!(matches!(device.create_geometry(&one_point()), Err(RenderError::Allocation(_))));
        assert!(device.create_geometry(&one_point()).is_ok());
    }

    #[test]
    fn draws_beyond_uploaded_data_are_rejected() {
        let device = HeadlessDevice::new();
        let program = device.create_program(Path::new("a.spv"), Path::new("b.spv")).unwrap();
        let geometry = device.create_geometry(&one_point()).unwrap();
        device.use_program(Some(program)).unwrap();
        device.bind_geometry(Some(geometry)).unwrap();

        assert!(matches!(
            device.draw_arrays(Topology::Points, 2),
            Err(RenderError::DrawOutOfRange { requested: 2, available: 1 })
        ));
        assert!(matches!(
            device.draw_elements(Topology::Triangles, 3),
            Err(RenderError::DrawOutOfRange { requested: 3, available: 0 })
        ));
        assert!(device.draw_calls().is_empty());
    }
}
