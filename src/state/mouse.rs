//! Mouse Module - pointer event types
//!
//! The platform input source reports three kinds of pointer events:
//!
//! - [`MouseMove`] - previous and current position, only when it changed
//! - [`MouseButtonEvent`] - a button went down or up at a position
//! - [`MouseWheel`] - the wheel turned at a position
//!
//! The layout manager hit-tests each against its symbols front-to-back.

use crate::types::Coord;

// =============================================================================
// TYPES
// =============================================================================

/// Mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Which buttons are currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    pub left: bool,
    pub right: bool,
}

impl ButtonState {
    /// Record a press or release.
    pub fn apply(&mut self, button: MouseButton, down: bool) {
        match button {
            MouseButton::Left => self.left = down,
            MouseButton::Right => self.right = down,
            MouseButton::Middle => {}
        }
    }
}

/// Pointer moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseMove {
    pub previous: Coord,
    pub current: Coord,
}

/// Button pressed or released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseButtonEvent {
    pub button: MouseButton,
    pub position: Coord,
    pub down: bool,
}

impl MouseButtonEvent {
    pub fn down(button: MouseButton, position: Coord) -> Self {
        Self {
            button,
            position,
            down: true,
        }
    }

    pub fn up(button: MouseButton, position: Coord) -> Self {
        Self {
            button,
            position,
            down: false,
        }
    }
}

/// Wheel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Wheel turned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseWheel {
    pub position: Coord,
    pub direction: WheelDirection,
}

// =============================================================================
// TESTS
// =============================================================================
