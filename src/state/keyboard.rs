//! Keyboard Module - key event types
//!
//! Key events are produced by the platform input source and routed by the
//! layout manager: Tab cycles focus, everything else goes to the focused
//! symbol.
//!
//! # Example
//!
//! ```
//! use tessera::state::keyboard::{Key, KeyEvent, Modifiers};
//!
//! let event = KeyEvent::with_modifiers(Key::Tab, Modifiers::ctrl());
//! assert!(event.is_tab());
//! assert_eq!(event.ch, '\t');
//! ```

// =============================================================================
// TYPES
// =============================================================================

/// Keyboard modifier state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    /// Create empty modifiers
    pub fn none() -> Self {
        Self::default()
    }

    /// Create modifiers with ctrl
    pub fn ctrl() -> Self {
        Self { ctrl: true, ..Self::default() }
    }

    /// Create modifiers with alt
    pub fn alt() -> Self {
        Self { alt: true, ..Self::default() }
    }

    /// Create modifiers with shift
    pub fn shift() -> Self {
        Self { shift: true, ..Self::default() }
    }
}

/// Logical key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Tab,
    Enter,
    Backspace,
    Delete,
    Insert,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
    Unknown,
}

impl Key {
    /// The character a key types, `'\0'` for keys that type nothing.
    pub fn character(self) -> char {
        match self {
            Key::Char(c) => c,
            Key::Tab => '\t',
            Key::Enter => '\r',
            Key::Backspace => '\u{8}',
            Key::Escape => '\u{1b}',
            _ => '\0',
        }
    }
}

/// Key press event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    /// Character typed, `'\0'` if none
    pub ch: char,
    /// Logical key
    pub key: Key,
    /// Modifier keys state
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Create a key press without modifiers
    pub fn new(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::none())
    }

    /// Create a key press with modifiers
    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self {
            ch: key.character(),
            key,
            modifiers,
        }
    }

    /// Create a key press typing `ch`
    pub fn char(ch: char) -> Self {
        Self::new(Key::Char(ch))
    }

    pub fn is_tab(&self) -> bool {
        self.key == Key::Tab
    }
}

// =============================================================================
// TESTS
// =============================================================================
