//! Per-draw uniform block and the ring buffer that carries it
//!
//! Each draw of a frame gets its own slot in a persistently mapped buffer;
//! the slot is selected with a dynamic descriptor offset.

use ash::{vk, Device};
use bytemuck::{Pod, Zeroable};

use super::buffer::Buffer;
use super::descriptor_set::write_dynamic_uniform;
use super::VulkanResult;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::device::Uniform;

/// Uniform block laid out for std140, binding 0 in both splat shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    /// Object to world
    pub model: [[f32; 4]; 4],
    /// World to eye
    pub view: [[f32; 4]; 4],
    /// Eye to clip
    pub projection: [[f32; 4]; 4],
    /// Base color, `w` unused
    pub color: [f32; 4],
    /// Light position, `w` unused
    pub light_position: [f32; 4],
    /// Light color, `w` unused
    pub light_color: [f32; 4],
    /// Constant, linear and quadratic attenuation
    pub attenuation: [f32; 4],
    /// x: point size, y: 1.0 when drawing the light proxy
    pub params: [f32; 4],
}

fn mat(m: &Mat4) -> [[f32; 4]; 4] {
    (*m).into()
}

fn vec(v: &Vec3) -> [f32; 4] {
    [v.x, v.y, v.z, 0.0]
}

impl Default for DrawUniforms {
    fn default() -> Self {
        let identity = mat(&Mat4::identity());
        Self {
            model: identity,
            view: identity,
            projection: identity,
            color: [1.0, 1.0, 1.0, 0.0],
            light_position: [0.0; 4],
            light_color: [1.0, 1.0, 1.0, 0.0],
            attenuation: [1.0, 0.0, 0.0, 0.0],
            params: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

impl DrawUniforms {
    /// Overwrite the field `uniform` names
    pub fn apply(&mut self, uniform: Uniform) {
        match uniform {
            Uniform::Model(m) => self.model = mat(&m),
            Uniform::View(m) => self.view = mat(&m),
            Uniform::Projection(m) => self.projection = mat(&m),
            Uniform::Color(c) => self.color = vec(&c),
            Uniform::PointSize(size) => self.params[0] = size,
            Uniform::LightPosition(p) => self.light_position = vec(&p),
            Uniform::LightColor(c) => self.light_color = vec(&c),
            Uniform::Attenuation(a) => self.attenuation = vec(&a),
            Uniform::DrawLightProxy(on) => self.params[1] = if on { 1.0 } else { 0.0 },
        }
    }
}

/// Round `size` up to a multiple of `alignment` (a power of two, or zero)
pub fn aligned_stride(size: vk::DeviceSize, alignment: vk::DeviceSize) -> vk::DeviceSize {
    if alignment == 0 {
        size
    } else {
        (size + alignment - 1) & !(alignment - 1)
    }
}

/// Hands out slot offsets until a frame's capacity is spent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCursor {
    stride: vk::DeviceSize,
    capacity: usize,
    used: usize,
}

impl SlotCursor {
    /// Cursor over `capacity` slots of `stride` bytes
    pub fn new(stride: vk::DeviceSize, capacity: usize) -> Self {
        Self { stride, capacity, used: 0 }
    }

    /// Byte offset of the next free slot
    pub fn next_offset(&mut self) -> Option<vk::DeviceSize> {
        if self.used >= self.capacity {
            return None;
        }
        let offset = self.used as vk::DeviceSize * self.stride;
        self.used += 1;
        Some(offset)
    }

    /// Start handing out slots from the beginning again
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Slots handed out since the last reset
    pub fn used(&self) -> usize {
        self.used
    }

    /// Total slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// One frame's uniform slots plus the descriptor set that addresses them
pub struct UniformRing {
    buffer: Buffer,
    descriptor_set: vk::DescriptorSet,
    cursor: SlotCursor,
}

impl UniformRing {
    /// Allocate `capacity` slots and point `descriptor_set` at the first one
    pub fn new(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        min_alignment: vk::DeviceSize,
        capacity: usize,
        descriptor_set: vk::DescriptorSet,
    ) -> VulkanResult<Self> {
        let block = std::mem::size_of::<DrawUniforms>() as vk::DeviceSize;
        let stride = aligned_stride(block, min_alignment);
        let buffer = Buffer::persistently_mapped(
            device.clone(),
            memory_properties,
            stride * capacity as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
        )?;

        write_dynamic_uniform(device, descriptor_set, 0, buffer.handle(), block);

        Ok(Self {
            buffer,
            descriptor_set,
            cursor: SlotCursor::new(stride, capacity),
        })
    }

    /// Copy `uniforms` into the next slot; `None` once the frame is full
    pub fn push(&mut self, uniforms: &DrawUniforms) -> VulkanResult<Option<u32>> {
        let Some(offset) = self.cursor.next_offset() else {
            return Ok(None);
        };
        self.buffer.write_at(offset, bytemuck::bytes_of(uniforms))?;
        Ok(Some(offset as u32))
    }

    /// Start a new frame; the slots' previous reader must have finished
    pub fn reset(&mut self) {
        self.cursor.reset();
    }

    /// Set bound with each slot's dynamic offset
    pub fn descriptor_set(&self) -> vk::DescriptorSet {
        self.descriptor_set
    }

    /// Draws the ring can hold per frame
    pub fn capacity(&self) -> usize {
        self.cursor.capacity()
    }
}
