//! SPIR-V modules and the splat graphics pipelines

use ash::{vk, Device};
use std::ffi::CStr;
use std::io::Cursor;
use std::path::Path;

use super::{VulkanError, VulkanResult};
use crate::render::device::Topology;

/// Shader module wrapper with RAII cleanup
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create shader module from SPIR-V bytecode
    pub fn from_bytes(device: Device, bytes: &[u8]) -> VulkanResult<Self> {
        let code = ash::util::read_spv(&mut Cursor::new(bytes))
            .map_err(|e| VulkanError::InitializationFailed(format!("Invalid SPIR-V: {}", e)))?;

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&code);
        let module = unsafe { device.create_shader_module(&create_info, None).map_err(VulkanError::Api)? };

        Ok(Self { device, module })
    }

    /// Load shader from SPIR-V file
    pub fn from_file<P: AsRef<Path>>(device: Device, path: P) -> VulkanResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            VulkanError::InitializationFailed(format!("Failed to read shader file {}: {}", path.display(), e))
        })?;
        Self::from_bytes(device, &bytes)
    }

    /// Raw module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Pipeline layout wrapper with RAII cleanup
pub struct PipelineLayout {
    device: Device,
    layout: vk::PipelineLayout,
}

impl PipelineLayout {
    /// Layout over `set_layouts` with no push constants
    pub fn new(device: Device, set_layouts: &[vk::DescriptorSetLayout]) -> VulkanResult<Self> {
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(set_layouts);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None).map_err(VulkanError::Api)? };
        Ok(Self { device, layout })
    }

    /// Raw layout handle
    pub fn handle(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

/// Vertex inputs: binding 0 carries positions, binding 1 normals
fn vertex_bindings() -> ([vk::VertexInputBindingDescription; 2], [vk::VertexInputAttributeDescription; 2]) {
    let stride = std::mem::size_of::<[f32; 3]>() as u32;
    let bindings = [0, 1].map(|binding| vk::VertexInputBindingDescription {
        binding,
        stride,
        input_rate: vk::VertexInputRate::VERTEX,
    });
    let attributes = [0, 1].map(|location| vk::VertexInputAttributeDescription {
        location,
        binding: location,
        format: vk::Format::R32G32B32_SFLOAT,
        offset: 0,
    });
    (bindings, attributes)
}

fn primitive_topology(topology: Topology) -> vk::PrimitiveTopology {
    match topology {
        Topology::Points => vk::PrimitiveTopology::POINT_LIST,
        Topology::Triangles => vk::PrimitiveTopology::TRIANGLE_LIST,
    }
}

/// Linked splat program: one pipeline per [`Topology`] over a shared layout
pub struct SplatProgram {
    device: Device,
    layout: PipelineLayout,
    points: vk::Pipeline,
    triangles: vk::Pipeline,
}

impl SplatProgram {
    /// Build both pipelines from a vertex and fragment module
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        descriptor_layout: vk::DescriptorSetLayout,
        vertex_shader: &ShaderModule,
        fragment_shader: &ShaderModule,
    ) -> VulkanResult<Self> {
        let layout = PipelineLayout::new(device.clone(), &[descriptor_layout])?;

        let points = Self::create_pipeline(&device, render_pass, layout.handle(), vertex_shader, fragment_shader, Topology::Points)?;
        let triangles = match Self::create_pipeline(
            &device,
            render_pass,
            layout.handle(),
            vertex_shader,
            fragment_shader,
            Topology::Triangles,
        ) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                unsafe { device.destroy_pipeline(points, None) };
                return Err(e);
            }
        };

        Ok(Self {
            device,
            layout,
            points,
            triangles,
        })
    }

    fn create_pipeline(
        device: &Device,
        render_pass: vk::RenderPass,
        layout: vk::PipelineLayout,
        vertex_shader: &ShaderModule,
        fragment_shader: &ShaderModule,
        topology: Topology,
    ) -> VulkanResult<vk::Pipeline> {
        let entry_point = CStr::from_bytes_with_nul(b"main\0")
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;

        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_shader.handle())
                .name(entry_point)
                .build(),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_shader.handle())
                .name(entry_point)
                .build(),
        ];

        let (bindings, attributes) = vertex_bindings();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(primitive_topology(topology))
            .primitive_restart_enable(false);

        // Viewport and scissor are set per frame.
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build()];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
                .map_err(|(_, err)| VulkanError::Api(err))?
        };

        pipelines
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::InitializationFailed("Driver returned no pipeline".to_string()))
    }

    /// Pipeline for `topology`
    pub fn pipeline(&self, topology: Topology) -> vk::Pipeline {
        match topology {
            Topology::Points => self.points,
            Topology::Triangles => self.triangles,
        }
    }

    /// Layout shared by both pipelines
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout.handle()
    }
}

impl Drop for SplatProgram {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.points, None);
            self.device.destroy_pipeline(self.triangles, None);
        }
    }
}
