//! Vulkan synchronization primitives
//!
//! Semaphores order GPU work, fences let the CPU wait for a frame slot.

use ash::{vk, Device};

use super::{VulkanError, VulkanResult};

/// Binary semaphore with RAII cleanup
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Unsignaled binary semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();
        let semaphore = unsafe { device.create_semaphore(&create_info, None).map_err(VulkanError::Api)? };
        Ok(Self { device, semaphore })
    }

    /// Raw semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Fence wrapper with RAII cleanup
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Fence, optionally created signaled
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);
        let fence = unsafe { device.create_fence(&create_info, None).map_err(VulkanError::Api)? };

        Ok(Self { device, fence })
    }

    /// Block until signaled or `timeout` nanoseconds pass
    pub fn wait(&self, timeout: u64) -> VulkanResult<()> {
        unsafe { self.device.wait_for_fences(&[self.fence], true, timeout).map_err(VulkanError::Api) }
    }

    /// Return the fence to the unsignaled state
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe { self.device.reset_fences(&[self.fence]).map_err(VulkanError::Api) }
    }

    /// Raw fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Per frame-in-flight synchronization
///
/// The render-finished semaphore is tracked per swapchain image instead,
/// since presentation may still hold it when the frame slot comes around.
pub struct FrameSync {
    /// Signaled when the swapchain image is ready
    pub image_available: Semaphore,
    /// Signaled when the frame's submission finishes
    pub in_flight: Fence,
}

impl FrameSync {
    /// Fence starts signaled so the first wait returns immediately
    pub fn new(device: Device) -> VulkanResult<Self> {
        Ok(Self {
            image_available: Semaphore::new(device.clone())?,
            in_flight: Fence::new(device, true)?,
        })
    }
}

/// One render-finished semaphore per swapchain image
pub fn render_finished_semaphores(device: &Device, image_count: usize) -> VulkanResult<Vec<Semaphore>> {
    (0..image_count).map(|_| Semaphore::new(device.clone())).collect()
}
