//! Viewer application lifecycle
//!
//! [`ViewerApp`] owns the window, the Vulkan device, the shader program and
//! the scene. Fields are declared in teardown order: scene, shader, device,
//! window.

use std::rc::Rc;

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::config::ViewerConfig;
use crate::input::InputEvent;
use crate::render::backends::vulkan::VulkanDevice;
use crate::render::device::GraphicsDevice;
use crate::render::error::RenderError;
use crate::render::shader::ShaderProgram;
use crate::render::window::{Window, WindowError};
use crate::scene::{EventResponse, SceneController, SceneError};

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Window creation or surface failure
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Device, shader or draw failure
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Configuration file failure
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Scene could not be assembled
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// The running viewer
pub struct ViewerApp {
    scene: SceneController,
    _shader: Rc<ShaderProgram>,
    device: Rc<VulkanDevice>,
    window: Window,
}

impl ViewerApp {
    /// Open the window, bring up Vulkan and load the scene
    ///
    /// A shader that fails to load is fatal; meshes that fail to load are
    /// logged and left empty.
    pub fn new(config: &ViewerConfig) -> Result<Self, AppError> {
        config.validate().map_err(SceneError::InvalidConfig)?;

        let mut window = Window::from_config(&config.window)?;
        let device = Rc::new(VulkanDevice::new(&mut window, &config.renderer)?);
        let shared: Rc<dyn GraphicsDevice> = device.clone();

        let shader = Rc::new(ShaderProgram::from_config(shared.clone(), &config.shaders)?);
        let scene = SceneController::load(shared, shader.clone(), config)?;

        let (window_width, window_height) = window.get_size();
        let (width, height) = window.get_framebuffer_size();
        let mut app = Self {
            scene,
            _shader: shader,
            device,
            window,
        };
        // On HiDPI displays the framebuffer is larger than the window's cursor space.
        app.scene.handle_event(InputEvent::WindowResized { width: window_width, height: window_height });
        app.scene.handle_event(InputEvent::Resized { width, height });
        Ok(app)
    }

    /// Run until the window closes or the scene asks to exit
    pub fn run(&mut self) -> Result<(), AppError> {
        log::info!("Entering main loop");

        while !self.window.should_close() {
            for event in self.window.poll_input() {
                if self.scene.handle_event(event) == EventResponse::Exit {
                    self.window.set_should_close(true);
                }
            }
            if self.window.should_close() {
                break;
            }

            let (width, height) = self.window.get_framebuffer_size();
            if width == 0 || height == 0 {
                self.window.wait_events();
                continue;
            }

            if let Err(e) = self.scene.frame() {
                log::error!("Frame failed: {}", e);
                return Err(e.into());
            }
        }

        self.device.wait_idle()?;
        log::info!("Main loop finished");
        Ok(())
    }

    /// The scene driven by the main loop
    pub fn scene(&self) -> &SceneController {
        &self.scene
    }
}
