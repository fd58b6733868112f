//! Command buffer management
//!
//! [`FrameRecorder`] tracks the recording state of one primary command
//! buffer across the separate begin/draw/end calls of a frame.

use ash::{vk, Device};

use super::{VulkanError, VulkanResult};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Pool whose buffers can be reset individually
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe { device.create_command_pool(&create_info, None).map_err(VulkanError::Api)? };

        Ok(Self { device, command_pool })
    }

    /// Allocate `count` primary command buffers
    pub fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe { self.device.allocate_command_buffers(&alloc_info).map_err(VulkanError::Api) }
    }

    /// One recorder per frame in flight
    pub fn allocate_recorders(&self, count: u32) -> VulkanResult<Vec<FrameRecorder>> {
        Ok(self
            .allocate_command_buffers(count)?
            .into_iter()
            .map(|command_buffer| FrameRecorder::new(command_buffer, self.device.clone()))
            .collect())
    }

    /// Raw pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // Frees every buffer allocated from the pool.
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordingState {
    Idle,
    Recording,
    InRenderPass,
}

/// Primary command buffer recorder with state checks
pub struct FrameRecorder {
    command_buffer: vk::CommandBuffer,
    device: Device,
    state: RecordingState,
}

impl FrameRecorder {
    /// Wrap a command buffer allocated from a pool
    pub fn new(command_buffer: vk::CommandBuffer, device: Device) -> Self {
        Self {
            command_buffer,
            device,
            state: RecordingState::Idle,
        }
    }

    fn expect_state(&self, expected: RecordingState, action: &str) -> VulkanResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(VulkanError::InvalidOperation {
                reason: format!("Cannot {} while command buffer is {:?}", action, self.state),
            })
        }
    }

    /// Reset the buffer and start a one-time-submit recording
    pub fn begin(&mut self) -> VulkanResult<()> {
        self.expect_state(RecordingState::Idle, "begin recording")?;

        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::Api)?;
            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        self.state = RecordingState::Recording;
        Ok(())
    }

    /// Begin the pass and cover `extent` with viewport and scissor
    pub fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_values: &[vk::ClearValue],
    ) -> VulkanResult<()> {
        self.expect_state(RecordingState::Recording, "begin a render pass")?;

        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(clear_values);

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        unsafe {
            self.device
                .cmd_begin_render_pass(self.command_buffer, &begin_info, vk::SubpassContents::INLINE);
            self.device.cmd_set_viewport(self.command_buffer, 0, &[viewport]);
            self.device.cmd_set_scissor(self.command_buffer, 0, &[render_area]);
        }

        self.state = RecordingState::InRenderPass;
        Ok(())
    }

    /// Bind a graphics pipeline
    pub fn bind_pipeline(&mut self, pipeline: vk::Pipeline) -> VulkanResult<()> {
        self.expect_state(RecordingState::InRenderPass, "bind a pipeline")?;
        unsafe {
            self.device
                .cmd_bind_pipeline(self.command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
        Ok(())
    }

    /// Bind `set` at index 0, selecting the dynamic uniform slot at `dynamic_offset`
    pub fn bind_descriptor_set(
        &mut self,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
        dynamic_offset: u32,
    ) -> VulkanResult<()> {
        self.expect_state(RecordingState::InRenderPass, "bind descriptor sets")?;
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                &[set],
                &[dynamic_offset],
            );
        }
        Ok(())
    }

    /// Bind vertex buffers starting at `first_binding`
    pub fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[vk::Buffer]) -> VulkanResult<()> {
        self.expect_state(RecordingState::InRenderPass, "bind vertex buffers")?;
        let offsets = vec![0; buffers.len()];
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(self.command_buffer, first_binding, buffers, &offsets);
        }
        Ok(())
    }

    /// Bind a `u32` index buffer
    pub fn bind_index_buffer(&mut self, buffer: vk::Buffer) -> VulkanResult<()> {
        self.expect_state(RecordingState::InRenderPass, "bind an index buffer")?;
        unsafe {
            self.device
                .cmd_bind_index_buffer(self.command_buffer, buffer, 0, vk::IndexType::UINT32);
        }
        Ok(())
    }

    /// Non-indexed draw of `vertex_count` vertices
    pub fn draw(&mut self, vertex_count: u32) -> VulkanResult<()> {
        self.expect_state(RecordingState::InRenderPass, "draw")?;
        unsafe {
            self.device.cmd_draw(self.command_buffer, vertex_count, 1, 0, 0);
        }
        Ok(())
    }

    /// Indexed draw of `index_count` indices
    pub fn draw_indexed(&mut self, index_count: u32) -> VulkanResult<()> {
        self.expect_state(RecordingState::InRenderPass, "draw indexed")?;
        unsafe {
            self.device.cmd_draw_indexed(self.command_buffer, index_count, 1, 0, 0, 0);
        }
        Ok(())
    }

    /// End the render pass and the recording
    pub fn finish(&mut self) -> VulkanResult<vk::CommandBuffer> {
        self.expect_state(RecordingState::InRenderPass, "finish recording")?;
        unsafe {
            self.device.cmd_end_render_pass(self.command_buffer);
        }
        self.state = RecordingState::Recording;

        let result = unsafe { self.device.end_command_buffer(self.command_buffer) };
        self.state = RecordingState::Idle;
        result.map_err(VulkanError::Api)?;
        Ok(self.command_buffer)
    }

    /// Close out a half-recorded buffer so the next `begin` can reset it
    pub fn abandon(&mut self) {
        unsafe {
            if self.state == RecordingState::InRenderPass {
                self.device.cmd_end_render_pass(self.command_buffer);
            }
            if self.state != RecordingState::Idle {
                let _ = self.device.end_command_buffer(self.command_buffer);
            }
        }
        self.state = RecordingState::Idle;
    }

    /// Raw command buffer handle
    pub fn handle(&self) -> vk::CommandBuffer {
        self.command_buffer
    }
}
