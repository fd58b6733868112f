//! Shader program ownership

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::core::config::ShaderConfig;
use crate::render::device::{GraphicsDevice, ShaderHandle};
use crate::render::error::RenderResult;

/// A linked vertex+fragment program, released when dropped
pub struct ShaderProgram {
    device: Rc<dyn GraphicsDevice>,
    handle: ShaderHandle,
}

impl ShaderProgram {
    /// Load the program from two SPIR-V files
    pub fn load(device: Rc<dyn GraphicsDevice>, vertex: &Path, fragment: &Path) -> RenderResult<Self> {
        let handle = device.create_program(vertex, fragment)?;
        log::info!("Shader program ready: {} + {}", vertex.display(), fragment.display());
        Ok(Self { device, handle })
    }

    /// Load the program named by a shader configuration
    pub fn from_config(device: Rc<dyn GraphicsDevice>, config: &ShaderConfig) -> RenderResult<Self> {
        Self::load(device, &config.vertex_path(), &config.fragment_path())
    }

    /// Device handle
    pub fn handle(&self) -> ShaderHandle {
        self.handle
    }

    /// Make this program current
    pub fn bind(&self) -> RenderResult<()> {
        self.device.use_program(Some(self.handle))
    }

    /// Clear the current program
    pub fn unbind(&self) -> RenderResult<()> {
        self.device.use_program(None)
    }
}

impl fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram").field("handle", &self.handle).finish()
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        log::debug!("Releasing shader program {:?}", self.handle);
        self.device.destroy_program(self.handle);
    }
}
