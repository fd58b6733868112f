//! Device buffers backed by host-visible memory

use ash::{vk, Device};
use bytemuck::Pod;
use std::ptr::NonNull;

use super::{VulkanError, VulkanResult};

const HOST_MEMORY: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
    vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw() | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
);

/// Buffer wrapper with memory management
///
/// A buffer can be mapped once for its whole lifetime with
/// [`Buffer::map_persistent`]; the mapping is released on drop.
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    mapped: Option<NonNull<u8>>,
}

impl Buffer {
    /// Create a buffer and bind freshly allocated memory to it
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        if size == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "Buffers must not be empty".to_string(),
            });
        }

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None).map_err(VulkanError::Api)? };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory = find_memory_type(requirements.memory_type_bits, properties, memory_properties)
            .and_then(|memory_type_index| {
                let alloc_info = vk::MemoryAllocateInfo::builder()
                    .allocation_size(requirements.size)
                    .memory_type_index(memory_type_index);
                unsafe { device.allocate_memory(&alloc_info, None) }.map_err(|e| match e {
                    vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
                        VulkanError::OutOfMemory {
                            requested: requirements.size as usize,
                        }
                    }
                    other => VulkanError::Api(other),
                })
            });

        let memory = match memory {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        if let Err(e) = unsafe { device.bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
            }
            return Err(VulkanError::Api(e));
        }

        Ok(Self {
            device,
            buffer,
            memory,
            size,
            mapped: None,
        })
    }

    /// Host-visible buffer initialized with `data`
    pub fn with_data<T: Pod>(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        usage: vk::BufferUsageFlags,
        data: &[T],
    ) -> VulkanResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let buffer = Self::new(device, memory_properties, bytes.len() as vk::DeviceSize, usage, HOST_MEMORY)?;
        buffer.write_data(bytes)?;
        Ok(buffer)
    }

    /// Host-visible buffer mapped for its whole lifetime
    pub fn persistently_mapped(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> VulkanResult<Self> {
        let mut buffer = Self::new(device, memory_properties, size, usage, HOST_MEMORY)?;
        buffer.map_persistent()?;
        Ok(buffer)
    }

    /// Keep the whole buffer mapped until drop
    pub fn map_persistent(&mut self) -> VulkanResult<()> {
        if self.mapped.is_some() {
            return Ok(());
        }
        let ptr = unsafe {
            self.device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?
        };
        self.mapped = NonNull::new(ptr.cast::<u8>());
        if self.mapped.is_none() {
            return Err(VulkanError::InvalidOperation {
                reason: "Driver returned a null mapping".to_string(),
            });
        }
        Ok(())
    }

    /// Copy `bytes` into a persistently mapped buffer at `offset`
    pub fn write_at(&self, offset: vk::DeviceSize, bytes: &[u8]) -> VulkanResult<()> {
        let mapped = self.mapped.ok_or_else(|| VulkanError::InvalidOperation {
            reason: "Buffer is not mapped".to_string(),
        })?;
        let end = offset.checked_add(bytes.len() as vk::DeviceSize);
        if end.map_or(true, |end| end > self.size) {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Write of {} bytes at {} overruns a {} byte buffer", bytes.len(), offset, self.size),
            });
        }

        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped.as_ptr().add(offset as usize), bytes.len());
        }
        Ok(())
    }

    /// Map, copy `bytes` to the start of the buffer, unmap
    pub fn write_data(&self, bytes: &[u8]) -> VulkanResult<()> {
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("{} bytes do not fit a {} byte buffer", bytes.len(), self.size),
            });
        }
        if self.mapped.is_some() {
            return self.write_at(0, bytes);
        }

        unsafe {
            let ptr = self
                .device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            self.device.unmap_memory(self.memory);
        }
        Ok(())
    }

    /// Raw buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if self.mapped.take().is_some() {
                self.device.unmap_memory(self.memory);
            }
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Find memory type with required properties
pub fn find_memory_type(
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
) -> VulkanResult<u32> {
    (0..memory_properties.memory_type_count)
        .find(|&i| {
            (type_filter & (1 << i)) != 0
                && memory_properties.memory_types[i as usize]
                    .property_flags
                    .contains(properties)
        })
        .ok_or(VulkanError::NoSuitableMemoryType)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (slot, &flag) in properties.memory_types.iter_mut().zip(flags) {
            slot.property_flags = flag;
        }
        properties
    }

    #[test]
    fn picks_first_type_with_all_requested_flags() {
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            HOST_MEMORY,
        ]);
        assert_eq!(find_memory_type(0b111, HOST_MEMORY, &properties).unwrap(), 2);
        assert_eq!(find_memory_type(0b111, vk::MemoryPropertyFlags::HOST_VISIBLE, &properties).unwrap(), 1);
    }

    #[test]
    fn type_filter_excludes_candidates() {
        let properties = memory_properties(&[HOST_MEMORY, HOST_MEMORY]);
        assert_eq!(find_memory_type(0b10, HOST_MEMORY, &properties).unwrap(), 1);
        assert!(matches!(
            find_memory_type(0b100, HOST_MEMORY, &properties),
            Err(VulkanError::NoSuitableMemoryType)
        ));
    }
}
