//! [`GraphicsDevice`] over Vulkan
//!
//! Draws are recorded straight into the frame's command buffer. Each draw
//! snapshots the pending uniform block into its own ring slot, which gives
//! GL-style "set uniforms, then draw" semantics on top of Vulkan.

use ash::vk;
use slotmap::SlotMap;
use std::cell::RefCell;
use std::path::Path;

use super::buffer::Buffer;
use super::commands::{CommandPool, FrameRecorder};
use super::context::VulkanContext;
use super::descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder};
use super::framebuffer::{create_framebuffers, DepthBuffer, Framebuffer};
use super::pipeline::{ShaderModule, SplatProgram};
use super::render_pass::RenderPass;
use super::sync::{render_finished_semaphores, FrameSync, Semaphore};
use super::uniforms::{DrawUniforms, UniformRing};
use super::{VulkanError, VulkanResult};
use crate::core::config::VulkanRendererConfig;
use crate::render::device::{GeometryHandle, GraphicsDevice, ShaderHandle, Topology, Uniform};
use crate::render::error::{RenderError, RenderResult};
use crate::render::primitives::mesh::GeometryData;
use crate::render::window::Window;

struct GpuGeometry {
    positions: Buffer,
    normals: Buffer,
    indices: Option<Buffer>,
    vertex_count: u32,
    index_count: u32,
}

/// Resource released while a frame was recording
///
/// The payload is only held so that it drops once the frame's fence signals.
enum Retired {
    Program(#[allow(dead_code)] SplatProgram),
    Geometry(#[allow(dead_code)] GpuGeometry),
}

struct FrameState {
    image_index: u32,
}

struct VulkanBackend {
    // Vulkan objects, dropped in declaration order with the context last.
    retired: Vec<Vec<Retired>>,
    programs: SlotMap<ShaderHandle, SplatProgram>,
    geometry: SlotMap<GeometryHandle, GpuGeometry>,
    uniform_rings: Vec<UniformRing>,
    _descriptor_pool: DescriptorPool,
    descriptor_layout: DescriptorSetLayout,
    frame_sync: Vec<FrameSync>,
    render_finished: Vec<Semaphore>,
    recorders: Vec<FrameRecorder>,
    _command_pool: CommandPool,
    framebuffers: Vec<Framebuffer>,
    depth_buffer: DepthBuffer,
    render_pass: RenderPass,
    context: VulkanContext,

    device: ash::Device,
    current_program: Option<ShaderHandle>,
    bound_geometry: Option<GeometryHandle>,
    pending: DrawUniforms,
    frame: Option<FrameState>,
    current_frame: usize,
    window_extent: vk::Extent2D,
    needs_recreate: bool,
    clear_color: [f32; 4],
}

/// Vulkan implementation of [`GraphicsDevice`]
pub struct VulkanDevice {
    inner: RefCell<VulkanBackend>,
}

impl VulkanDevice {
    /// Initialize Vulkan for `window`
    pub fn new(window: &mut Window, config: &VulkanRendererConfig) -> RenderResult<Self> {
        config.validate().map_err(VulkanError::InitializationFailed)?;
        let backend = VulkanBackend::new(window, config)?;
        Ok(Self {
            inner: RefCell::new(backend),
        })
    }

    /// Point sizes the GPU can rasterize
    pub fn point_size_range(&self) -> [f32; 2] {
        self.inner.borrow().context.physical_device.point_size_range()
    }

    /// Block until the GPU has finished all submitted work
    pub fn wait_idle(&self) -> RenderResult<()> {
        Ok(self.inner.borrow().context.wait_idle()?)
    }
}

impl VulkanBackend {
    fn new(window: &mut Window, config: &VulkanRendererConfig) -> VulkanResult<Self> {
        let context = VulkanContext::new(window, config)?;
        let device = context.raw_device();
        let memory_properties = context.physical_device.memory_properties;

        let swapchain = context.swapchain()?;
        let extent = swapchain.extent();
        let image_count = swapchain.image_count();

        let render_pass = RenderPass::new_forward_pass(device.clone(), swapchain.format().format)?;
        let depth_buffer = DepthBuffer::new(device.clone(), &memory_properties, extent)?;
        let framebuffers = create_framebuffers(
            &device,
            render_pass.handle(),
            swapchain.image_views(),
            depth_buffer.image_view(),
            extent,
        )?;

        let frames = config.max_frames_in_flight;
        let command_pool = CommandPool::new(device.clone(), context.graphics_queue_family())?;
        let recorders = command_pool.allocate_recorders(frames as u32)?;
        let render_finished = render_finished_semaphores(&device, image_count)?;
        let frame_sync = (0..frames)
            .map(|_| FrameSync::new(device.clone()))
            .collect::<VulkanResult<Vec<_>>>()?;

        let descriptor_layout = DescriptorSetLayoutBuilder::new()
            .add_dynamic_uniform_buffer(0, vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .build(&device)?;
        let descriptor_pool = DescriptorPool::new(device.clone(), frames as u32)?;
        let sets = descriptor_pool.allocate_descriptor_sets(&vec![descriptor_layout.handle(); frames])?;

        let min_alignment = context.physical_device.properties.limits.min_uniform_buffer_offset_alignment;
        let uniform_rings = sets
            .into_iter()
            .map(|set| UniformRing::new(&device, &memory_properties, min_alignment, config.max_draws_per_frame, set))
            .collect::<VulkanResult<Vec<_>>>()?;

        let [min_point, max_point] = context.physical_device.point_size_range();
        log::info!(
            "Vulkan device ready: {}x{}, {} frames in flight, point sizes {}..{}",
            extent.width,
            extent.height,
            frames,
            min_point,
            max_point
        );

        Ok(Self {
            retired: (0..frames).map(|_| Vec::new()).collect(),
            programs: SlotMap::with_key(),
            geometry: SlotMap::with_key(),
            uniform_rings,
            _descriptor_pool: descriptor_pool,
            descriptor_layout,
            frame_sync,
            render_finished,
            recorders,
            _command_pool: command_pool,
            framebuffers,
            depth_buffer,
            render_pass,
            context,
            device,
            current_program: None,
            bound_geometry: None,
            pending: DrawUniforms::default(),
            frame: None,
            current_frame: 0,
            window_extent: extent,
            needs_recreate: false,
            clear_color: config.clear_color,
        })
    }

    fn retire(&mut self, resource: Retired) {
        if self.frame.is_some() {
            self.retired[self.current_frame].push(resource);
            return;
        }
        if let Err(e) = self.context.wait_idle() {
            log::error!("wait_idle before releasing a resource failed: {}", e);
        }
        drop(resource);
    }

    fn recreate_swapchain(&mut self) -> VulkanResult<()> {
        log::debug!(
            "Recreating swapchain at {}x{}",
            self.window_extent.width,
            self.window_extent.height
        );
        self.framebuffers.clear();
        self.context.recreate_swapchain(self.window_extent)?;

        let swapchain = self.context.swapchain()?;
        let extent = swapchain.extent();
        self.depth_buffer = DepthBuffer::new(
            self.device.clone(),
            &self.context.physical_device.memory_properties,
            extent,
        )?;
        self.framebuffers = create_framebuffers(
            &self.device,
            self.render_pass.handle(),
            swapchain.image_views(),
            self.depth_buffer.image_view(),
            extent,
        )?;
        self.render_finished = render_finished_semaphores(&self.device, swapchain.image_count())?;
        self.needs_recreate = false;
        Ok(())
    }

    fn create_program(&mut self, vertex: &Path, fragment: &Path) -> RenderResult<ShaderHandle> {
        let compile_error = |path: &Path, e: VulkanError| RenderError::ShaderCompile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let vertex_module = ShaderModule::from_file(self.device.clone(), vertex).map_err(|e| compile_error(vertex, e))?;
        let fragment_module =
            ShaderModule::from_file(self.device.clone(), fragment).map_err(|e| compile_error(fragment, e))?;

        let program = SplatProgram::new(
            self.device.clone(),
            self.render_pass.handle(),
            self.descriptor_layout.handle(),
            &vertex_module,
            &fragment_module,
        )
        .map_err(|e| compile_error(vertex, e))?;

        Ok(self.programs.insert(program))
    }

    fn create_geometry(&mut self, data: &GeometryData) -> RenderResult<GeometryHandle> {
        if data.normals.len() != data.positions.len() {
            return Err(RenderError::Allocation(format!(
                "{} normals for {} positions",
                data.normals.len(),
                data.positions.len()
            )));
        }

        let allocation_error = |e: VulkanError| {
            if e.is_out_of_memory() {
                RenderError::Allocation(e.to_string())
            } else {
                RenderError::Vulkan(e)
            }
        };

        let memory_properties = &self.context.physical_device.memory_properties;
        let positions = Buffer::with_data(
            self.device.clone(),
            memory_properties,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            &data.positions,
        )
        .map_err(allocation_error)?;
        let normals = Buffer::with_data(
            self.device.clone(),
            memory_properties,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            &data.normals,
        )
        .map_err(allocation_error)?;
        let indices = if data.indices.is_empty() {
            None
        } else {
            Some(
                Buffer::with_data(
                    self.device.clone(),
                    memory_properties,
                    vk::BufferUsageFlags::INDEX_BUFFER,
                    &data.indices,
                )
                .map_err(allocation_error)?,
            )
        };

        Ok(self.geometry.insert(GpuGeometry {
            positions,
            normals,
            indices,
            vertex_count: data.vertex_count(),
            index_count: data.index_count(),
        }))
    }

    fn draw(&mut self, topology: Topology, count: u32, indexed: bool) -> RenderResult<()> {
        if self.frame.is_none() {
            return Err(RenderError::NoActiveFrame);
        }
        let program_handle = self.current_program.ok_or(RenderError::NoProgramBound)?;
        let geometry_handle = self.bound_geometry.ok_or(RenderError::NoGeometryBound)?;
        let program = self
            .programs
            .get(program_handle)
            .ok_or(RenderError::UnknownHandle { kind: "program" })?;
        let geometry = self
            .geometry
            .get(geometry_handle)
            .ok_or(RenderError::UnknownHandle { kind: "geometry" })?;

        let available = if indexed { geometry.index_count } else { geometry.vertex_count };
        if count > available {
            return Err(RenderError::DrawOutOfRange { requested: count, available });
        }
        if count == 0 {
            return Ok(());
        }

        let ring = &mut self.uniform_rings[self.current_frame];
        let offset = ring.push(&self.pending)?.ok_or(RenderError::DrawLimitExceeded {
            limit: ring.capacity(),
        })?;

        let recorder = &mut self.recorders[self.current_frame];
        recorder.bind_pipeline(program.pipeline(topology))?;
        recorder.bind_descriptor_set(program.layout(), ring.descriptor_set(), offset)?;
        recorder.bind_vertex_buffers(0, &[geometry.positions.handle(), geometry.normals.handle()])?;

        match (&geometry.indices, indexed) {
            (Some(indices), true) => {
                recorder.bind_index_buffer(indices.handle())?;
                recorder.draw_indexed(count)?;
            }
            _ => recorder.draw(count)?,
        }
        Ok(())
    }

    fn begin_frame(&mut self) -> RenderResult<bool> {
        if self.frame.is_some() {
            return Err(VulkanError::InvalidOperation {
                reason: "begin_frame called twice without end_frame".to_string(),
            }
            .into());
        }

        if self.needs_recreate {
            if self.window_extent.width == 0 || self.window_extent.height == 0 {
                return Ok(false);
            }
            self.recreate_swapchain()?;
        }

        let current = self.current_frame;
        let sync = &self.frame_sync[current];
        sync.in_flight.wait(u64::MAX)?;
        self.retired[current].clear();

        let swapchain = self.context.swapchain()?;
        let acquired = unsafe {
            self.context.swapchain_loader().acquire_next_image(
                swapchain.handle(),
                u64::MAX,
                sync.image_available.handle(),
                vk::Fence::null(),
            )
        };
        let image_index = match acquired {
            Ok((index, _suboptimal)) => index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.needs_recreate = true;
                return Ok(false);
            }
            Err(e) => return Err(VulkanError::Api(e).into()),
        };

        // Reset only once a submission is certain to follow.
        sync.in_flight.reset()?;
        self.uniform_rings[current].reset();

        let extent = swapchain.extent();
        let framebuffer = self.framebuffers[image_index as usize].handle();
        let [r, g, b, a] = self.clear_color;
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue { float32: [r, g, b, a] },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];

        let recorder = &mut self.recorders[current];
        let recorded = recorder
            .begin()
            .and_then(|()| recorder.begin_render_pass(self.render_pass.handle(), framebuffer, extent, &clear_values));
        if let Err(e) = recorded {
            recorder.abandon();
            self.submit_empty(current);
            return Err(e.into());
        }

        self.frame = Some(FrameState { image_index });
        Ok(true)
    }

    /// Consume the acquire semaphore and signal the frame fence with no work
    fn submit_empty(&self, current: usize) {
        let sync = &self.frame_sync[current];
        let wait = [sync.image_available.handle()];
        let stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let submit = vk::SubmitInfo::builder()
            .wait_semaphores(&wait)
            .wait_dst_stage_mask(&stages)
            .build();
        let result = unsafe {
            self.device
                .queue_submit(self.context.graphics_queue(), &[submit], sync.in_flight.handle())
        };
        if let Err(e) = result {
            log::error!("Empty submission after a failed frame failed: {:?}", e);
        }
    }

    fn end_frame(&mut self) -> RenderResult<()> {
        let frame = self.frame.take().ok_or(RenderError::NoActiveFrame)?;
        let current = self.current_frame;
        self.current_frame = (current + 1) % self.frame_sync.len();

        let recorder = &mut self.recorders[current];
        let command_buffer = match recorder.finish() {
            Ok(command_buffer) => command_buffer,
            Err(e) => {
                recorder.abandon();
                self.submit_empty(current);
                return Err(e.into());
            }
        };

        let sync = &self.frame_sync[current];
        let wait = [sync.image_available.handle()];
        let stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal = [self.render_finished[frame.image_index as usize].handle()];
        let submit = vk::SubmitInfo::builder()
            .wait_semaphores(&wait)
            .wait_dst_stage_mask(&stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal)
            .build();

        unsafe {
            self.device
                .queue_submit(self.context.graphics_queue(), &[submit], sync.in_flight.handle())
                .map_err(VulkanError::Api)?;
        }

        let swapchains = [self.context.swapchain()?.handle()];
        let image_indices = [frame.image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let presented = unsafe {
            self.context
                .swapchain_loader()
                .queue_present(self.context.present_queue(), &present_info)
        };
        match presented {
            Ok(false) => Ok(()),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.needs_recreate = true;
                Ok(())
            }
            Err(e) => Err(VulkanError::Api(e).into()),
        }
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        if self.frame.take().is_some() {
            self.recorders[self.current_frame].abandon();
            self.submit_empty(self.current_frame);
        }
        if let Err(e) = self.context.wait_idle() {
            log::error!("wait_idle during shutdown failed: {}", e);
        }
        log::debug!(
            "Releasing Vulkan device ({} programs, {} geometry still live)",
            self.programs.len(),
            self.geometry.len()
        );
    }
}

impl GraphicsDevice for VulkanDevice {
    fn create_program(&self, vertex: &Path, fragment: &Path) -> RenderResult<ShaderHandle> {
        self.inner.borrow_mut().create_program(vertex, fragment)
    }

    fn destroy_program(&self, program: ShaderHandle) {
        let mut backend = self.inner.borrow_mut();
        match backend.programs.remove(program) {
            Some(released) => {
                if backend.current_program == Some(program) {
                    backend.current_program = None;
                }
                backend.retire(Retired::Program(released));
            }
            None => log::debug!("Ignoring release of unknown program {:?}", program),
        }
    }

    fn create_geometry(&self, data: &GeometryData) -> RenderResult<GeometryHandle> {
        self.inner.borrow_mut().create_geometry(data)
    }

    fn destroy_geometry(&self, geometry: GeometryHandle) {
        let mut backend = self.inner.borrow_mut();
        match backend.geometry.remove(geometry) {
            Some(released) => {
                if backend.bound_geometry == Some(geometry) {
                    backend.bound_geometry = None;
                }
                backend.retire(Retired::Geometry(released));
            }
            None => log::debug!("Ignoring release of unknown geometry {:?}", geometry),
        }
    }

    fn use_program(&self, program: Option<ShaderHandle>) -> RenderResult<()> {
        let mut backend = self.inner.borrow_mut();
        if let Some(handle) = program {
            if !backend.programs.contains_key(handle) {
                return Err(RenderError::UnknownHandle { kind: "program" });
            }
        }
        backend.current_program = program;
        Ok(())
    }

    fn set_uniform(&self, uniform: Uniform) -> RenderResult<()> {
        let mut backend = self.inner.borrow_mut();
        if backend.current_program.is_none() {
            return Err(RenderError::NoProgramBound);
        }
        backend.pending.apply(uniform);
        Ok(())
    }

    fn bind_geometry(&self, geometry: Option<GeometryHandle>) -> RenderResult<()> {
        let mut backend = self.inner.borrow_mut();
        if let Some(handle) = geometry {
            if !backend.geometry.contains_key(handle) {
                return Err(RenderError::UnknownHandle { kind: "geometry" });
            }
        }
        backend.bound_geometry = geometry;
        Ok(())
    }

    fn draw_arrays(&self, topology: Topology, vertex_count: u32) -> RenderResult<()> {
        self.inner.borrow_mut().draw(topology, vertex_count, false)
    }

    fn draw_elements(&self, topology: Topology, index_count: u32) -> RenderResult<()> {
        self.inner.borrow_mut().draw(topology, index_count, true)
    }

    fn begin_frame(&self) -> RenderResult<bool> {
        self.inner.borrow_mut().begin_frame()
    }

    fn end_frame(&self) -> RenderResult<()> {
        self.inner.borrow_mut().end_frame()
    }

    fn resize(&self, width: u32, height: u32) {
        let mut backend = self.inner.borrow_mut();
        backend.window_extent = vk::Extent2D { width, height };
        backend.needs_recreate = true;
    }
}
