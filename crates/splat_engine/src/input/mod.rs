//! Backend-agnostic input events
//!
//! The window layer translates platform events into [`InputEvent`]s; the
//! scene controller only ever sees these types.

/// Key or button transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Pressed down
    Press,
    /// Released
    Release,
    /// Held long enough to auto-repeat
    Repeat,
}

/// Key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
    /// Escape key
    Escape,
    /// Space bar
    Space,
    /// Enter key
    Enter,
}

impl KeyCode {
    const FUNCTION_KEYS: [KeyCode; 12] = [
        KeyCode::F1, KeyCode::F2, KeyCode::F3, KeyCode::F4,
        KeyCode::F5, KeyCode::F6, KeyCode::F7, KeyCode::F8,
        KeyCode::F9, KeyCode::F10, KeyCode::F11, KeyCode::F12,
    ];

    /// Zero-based index of a function key (`F1` is 0)
    pub fn function_index(self) -> Option<usize> {
        Self::FUNCTION_KEYS.iter().position(|&key| key == self)
    }
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
}

/// One input event, in delivery order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Keyboard key transition
    Key { key: KeyCode, action: Action },
    /// Mouse button transition at window cursor position `(x, y)`
    MouseButton { button: MouseButton, action: Action, x: f64, y: f64 },
    /// Cursor moved to window position `(x, y)`
    CursorMoved { x: f64, y: f64 },
    /// Scroll wheel offsets
    Scroll { x_offset: f64, y_offset: f64 },
    /// Framebuffer resized, in pixels
    Resized { width: u32, height: u32 },
    /// Window resized, in the screen coordinates cursor positions use
    WindowResized { width: u32, height: u32 },
    /// User asked to close the window
    CloseRequested,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_keys_index_from_zero() {
        assert_eq!(KeyCode::F1.function_index(), Some(0));
        assert_eq!(KeyCode::F3.function_index(), Some(2));
        assert_eq!(KeyCode::F12.function_index(), Some(11));
        assert_eq!(KeyCode::S.function_index(), None);
    }
}
