//! GPU-resident geometry owned by a single renderable

use std::fmt;
use std::rc::Rc;

use crate::render::device::{GeometryHandle, GraphicsDevice};
use crate::render::error::RenderResult;
use crate::render::primitives::mesh::GeometryData;

/// Position, normal and index buffers of one renderable
///
/// Uploaded once at construction and released when dropped. Geometry with no
/// vertices uploads nothing and is never drawable.
pub struct GeometryBuffer {
    device: Rc<dyn GraphicsDevice>,
    handle: Option<GeometryHandle>,
    vertex_count: u32,
    index_count: u32,
}

impl GeometryBuffer {
    /// Upload `data` to `device`
    pub fn upload(device: Rc<dyn GraphicsDevice>, data: &GeometryData) -> RenderResult<Self> {
        if data.is_empty() {
            log::warn!("Geometry has no vertices; nothing uploaded");
            return Ok(Self::empty(device));
        }

        let handle = device.create_geometry(data)?;
        log::debug!(
            "Uploaded geometry {:?}: {} vertices, {} indices",
            handle,
            data.vertex_count(),
            data.index_count()
        );

        Ok(Self {
            device,
            handle: Some(handle),
            vertex_count: data.vertex_count(),
            index_count: data.index_count(),
        })
    }

    /// A placeholder that owns no device resources
    pub fn empty(device: Rc<dyn GraphicsDevice>) -> Self {
        Self { device, handle: None, vertex_count: 0, index_count: 0 }
    }

    /// Whether drawing this buffer would produce anything
    pub fn is_drawable(&self) -> bool {
        self.handle.is_some() && self.vertex_count > 0
    }

    /// Device handle, `None` for empty geometry
    pub fn handle(&self) -> Option<GeometryHandle> {
        self.handle
    }

    /// Number of uploaded vertices
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of uploaded indices
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Device this geometry lives on
    pub fn device(&self) -> &Rc<dyn GraphicsDevice> {
        &self.device
    }

    /// Bind for the next draw
    pub fn bind(&self) -> RenderResult<()> {
        self.device.bind_geometry(self.handle)
    }

    /// Clear the device's geometry binding
    pub fn unbind(&self) -> RenderResult<()> {
        self.device.bind_geometry(None)
    }
}

impl fmt::Debug for GeometryBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeometryBuffer")
            .field("handle", &self.handle)
            .field("vertex_count", &self.vertex_count)
            .field("index_count", &self.index_count)
            .finish()
    }
}

impl Drop for GeometryBuffer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            log::debug!("Releasing geometry {:?}", handle);
            self.device.destroy_geometry(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::headless::HeadlessDevice;
    use crate::render::error::RenderError;

    fn triangle() -> GeometryData {
        GeometryData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn drop_releases_exactly_once() {
        let device = Rc::new(HeadlessDevice::new());
        let buffer = GeometryBuffer::upload(device.clone(), &triangle()).unwrap();
        assert!(buffer.is_drawable());
        assert_eq!(device.live_geometry(), 1);

        drop(buffer);
        assert_eq!(device.live_geometry(), 0);
        assert_eq!(device.stale_releases(), 0);
    }

    #[test]
    fn empty_geometry_is_not_drawable_and_owns_nothing() {
        let device = Rc::new(HeadlessDevice::new());
        let buffer = GeometryBuffer::upload(device.clone(), &GeometryData::default()).unwrap();
        assert!(!buffer.is_drawable());
        assert!(buffer.handle().is_none());
        assert!(device.commands().is_empty());
    }

    #[test]
    fn failed_upload_leaves_no_resources() {
        let device = Rc::new(HeadlessDevice::new());
        device.fail_next_allocation();
        let result = GeometryBuffer::upload(device.clone(), &triangle());
        assert!(matches!(result, Err(RenderError::Allocation(_))));
        assert_eq!(device.live_geometry(), 0);
    }

    #[test]
    fn counts_match_uploaded_data() {
        let device = Rc::new(HeadlessDevice::new());
        let buffer = GeometryBuffer::upload(device, &triangle()).unwrap();
        assert_eq!(buffer.vertex_count(), 3);
        assert_eq!(buffer.index_count(), 3);
    }
}
