//! State Module - input event types and the input backend
//!
//! - **Keyboard** - key, modifiers and key press events
//! - **Mouse** - pointer move, button and wheel events
//! - **Input** - the event source channels, crossterm conversion and the
//!   dedicated input thread

pub mod input;
pub mod keyboard;
pub mod mouse;

pub use input::{InputEvent, InputSource, InputThread};
pub use keyboard::{Key, KeyEvent, Modifiers};
pub use mouse::{
    ButtonState, MouseButton, MouseButtonEvent, MouseMove, MouseWheel, WheelDirection,
};
