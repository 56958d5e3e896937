//! Concrete symbols.
//!
//! - [`Panel`] - filled rectangle with an editable title

mod panel;

pub use panel::Panel;
