//! Window management using GLFW
//!
//! Creates a window without a client API for Vulkan presentation and
//! translates GLFW events into [`InputEvent`]s.

use thiserror::Error;

use crate::core::config::WindowConfig;
use crate::input::{Action, InputEvent, KeyCode, MouseButton};

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    #[error("GLFW initialization failed")]
    InitializationFailed,

    #[error("Window creation failed")]
    CreationFailed,

    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window wrapper
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    cursor: (f64, f64),
}

impl Window {
    /// Open a resizable window with no client API
    pub fn new(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        if !glfw.vulkan_supported() {
            return Err(WindowError::GlfwError("Vulkan is not supported by this GLFW build".to_string()));
        }

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);
        window.set_size_polling(true);
        window.set_mouse_button_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_scroll_polling(true);

        let cursor = window.get_cursor_pos();
        log::info!("Created {}x{} window '{}'", width, height, title);
        Ok(Self { glfw, window, events, cursor })
    }

    /// Create the window described by `config`
    pub fn from_config(config: &WindowConfig) -> WindowResult<Self> {
        Self::new(&config.title, config.width, config.height)
    }

    /// Whether the user or the app asked to close
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Request or cancel closing
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Framebuffer size in pixels
    pub fn get_framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    /// Window size in screen coordinates, the space cursor positions use
    pub fn get_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    /// Block until an event arrives, used while minimized
    pub fn wait_events(&mut self) {
        self.glfw.wait_events();
    }

    /// Poll GLFW and return pending events in delivery order
    ///
    /// The cursor position carries over from the previous batch.
    pub fn poll_input(&mut self) -> Vec<InputEvent> {
        self.glfw.poll_events();
        translate_batch(glfw::flush_messages(&self.events).map(|(_, event)| event), &mut self.cursor)
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn get_required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Failed to get required extensions".to_string()))
    }

    /// Create Vulkan surface using GLFW's built-in functionality
    pub fn create_vulkan_surface(&mut self, instance: ash::vk::Instance) -> WindowResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {:?}", result)))
        }
    }
}

/// Translate a batch of GLFW events in delivery order
///
/// `cursor` tracks the last reported cursor position. Each mouse button event
/// is stamped with the position current at its place in the batch, since GLFW
/// does not report it with the button.
pub fn translate_batch<I>(events: I, cursor: &mut (f64, f64)) -> Vec<InputEvent>
where
    I: IntoIterator<Item = glfw::WindowEvent>,
{
    events
        .into_iter()
        .filter_map(|event| {
            if let glfw::WindowEvent::CursorPos(x, y) = event {
                *cursor = (x, y);
            }
            translate_event(&event, *cursor)
        })
        .collect()
}

/// Translate one GLFW event
///
/// Mouse button events take their position from `cursor`.
pub fn translate_event(event: &glfw::WindowEvent, cursor: (f64, f64)) -> Option<InputEvent> {
    use glfw::WindowEvent;

    match *event {
        WindowEvent::Key(key, _, action, _) => Some(InputEvent::Key {
            key: translate_key(key)?,
            action: translate_action(action),
        }),
        WindowEvent::MouseButton(button, action, _) => Some(InputEvent::MouseButton {
            button: translate_button(button)?,
            action: translate_action(action),
            x: cursor.0,
            y: cursor.1,
        }),
        WindowEvent::CursorPos(x, y) => Some(InputEvent::CursorMoved { x, y }),
        WindowEvent::Scroll(x_offset, y_offset) => Some(InputEvent::Scroll { x_offset, y_offset }),
        WindowEvent::FramebufferSize(width, height) => Some(InputEvent::Resized {
            width: width.max(0) as u32,
            height: height.max(0) as u32,
        }),
        WindowEvent::Size(width, height) => Some(InputEvent::WindowResized {
            width: width.max(0) as u32,
            height: height.max(0) as u32,
        }),
        WindowEvent::Close => Some(InputEvent::CloseRequested),
        _ => None,
    }
}

fn translate_action(action: glfw::Action) -> Action {
    match action {
        glfw::Action::Press => Action::Press,
        glfw::Action::Release => Action::Release,
        glfw::Action::Repeat => Action::Repeat,
    }
}

fn translate_button(button: glfw::MouseButton) -> Option<MouseButton> {
    match button {
        glfw::MouseButton::Button1 => Some(MouseButton::Left),
        glfw::MouseButton::Button2 => Some(MouseButton::Right),
        glfw::MouseButton::Button3 => Some(MouseButton::Middle),
        _ => None,
    }
}

fn translate_key(key: glfw::Key) -> Option<KeyCode> {
    use glfw::Key;

    let code = match key {
        Key::A => KeyCode::A,
        Key::B => KeyCode::B,
        Key::C => KeyCode::C,
        Key::D => KeyCode::D,
        Key::E => KeyCode::E,
        Key::F => KeyCode::F,
        Key::G => KeyCode::G,
        Key::H => KeyCode::H,
        Key::I => KeyCode::I,
        Key::J => KeyCode::J,
        Key::K => KeyCode::K,
        Key::L => KeyCode::L,
        Key::M => KeyCode::M,
        Key::N => KeyCode::N,
        Key::O => KeyCode::O,
        Key::P => KeyCode::P,
        Key::Q => KeyCode::Q,
        Key::R => KeyCode::R,
        Key::S => KeyCode::S,
        Key::T => KeyCode::T,
        Key::U => KeyCode::U,
        Key::V => KeyCode::V,
        Key::W => KeyCode::W,
        Key::X => KeyCode::X,
        Key::Y => KeyCode::Y,
        Key::Z => KeyCode::Z,
        Key::F1 => KeyCode::F1,
        Key::F2 => KeyCode::F2,
        Key::F3 => KeyCode::F3,
        Key::F4 => KeyCode::F4,
        Key::F5 => KeyCode::F5,
        Key::F6 => KeyCode::F6,
        Key::F7 => KeyCode::F7,
        Key::F8 => KeyCode::F8,
        Key::F9 => KeyCode::F9,
        Key::F10 => KeyCode::F10,
        Key::F11 => KeyCode::F11,
        Key::F12 => KeyCode::F12,
        Key::Escape => KeyCode::Escape,
        Key::Space => KeyCode::Space,
        Key::Enter => KeyCode::Enter,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_pick_up_the_polled_cursor() {
        let event = glfw::WindowEvent::MouseButton(
            glfw::MouseButton::Button1,
            glfw::Action::Press,
            glfw::Modifiers::empty(),
        );
        assert_eq!(
            translate_event(&event, (12.0, 34.0)),
            Some(InputEvent::MouseButton { button: MouseButton::Left, action: Action::Press, x: 12.0, y: 34.0 })
        );
    }

    #[test]
    fn keys_and_resizes_translate() {
        let key = glfw::WindowEvent::Key(glfw::Key::F2, 0, glfw::Action::Press, glfw::Modifiers::empty());
        assert_eq!(
            translate_event(&key, (0.0, 0.0)),
            Some(InputEvent::Key { key: KeyCode::F2, action: Action::Press })
        );

        let resize = glfw::WindowEvent::FramebufferSize(400, 300);
        assert_eq!(translate_event(&resize, (0.0, 0.0)), Some(InputEvent::Resized { width: 400, height: 300 }));
    }

    #[test]
    fn window_size_is_reported_apart_from_framebuffer() {
        let size = glfw::WindowEvent::Size(640, 480);
        assert_eq!(
            translate_event(&size, (0.0, 0.0)),
            Some(InputEvent::WindowResized { width: 640, height: 480 })
        );
    }

    #[test]
    fn buttons_in_a_batch_see_the_cursor_at_their_position() {
        let press = glfw::WindowEvent::MouseButton(
            glfw::MouseButton::Button1,
            glfw::Action::Press,
            glfw::Modifiers::empty(),
        );
        let batch = vec![
            glfw::WindowEvent::CursorPos(100.0, 240.0),
            press,
            glfw::WindowEvent::CursorPos(300.0, 240.0),
        ];
        let mut cursor = (0.0, 0.0);
        let events = translate_batch(batch, &mut cursor);

        assert_eq!(
            events,
            vec![
                InputEvent::CursorMoved { x: 100.0, y: 240.0 },
                InputEvent::MouseButton { button: MouseButton::Left, action: Action::Press, x: 100.0, y: 240.0 },
                InputEvent::CursorMoved { x: 300.0, y: 240.0 },
            ]
        );
        assert_eq!(cursor, (300.0, 240.0));
    }

    #[test]
    fn cursor_carries_over_between_batches() {
        let release = glfw::WindowEvent::MouseButton(
            glfw::MouseButton::Button2,
            glfw::Action::Release,
            glfw::Modifiers::empty(),
        );
        let mut cursor = (55.0, 66.0);
        assert_eq!(
            translate_batch(vec![release], &mut cursor),
            vec![InputEvent::MouseButton { button: MouseButton::Right, action: Action::Release, x: 55.0, y: 66.0 }]
        );
    }

    #[test]
    fn unmapped_events_are_dropped() {
        let focus = glfw::WindowEvent::Focus(true);
        assert_eq!(translate_event(&focus, (0.0, 0.0)), None);
        let key = glfw::WindowEvent::Key(glfw::Key::Tab, 0, glfw::Action::Press, glfw::Modifiers::empty());
        assert_eq!(translate_event(&key, (0.0, 0.0)), None);
    }
}
