//! Layout Module - composition of symbols onto one sink
//!
//! The [`LayoutManager`] owns z-order, focus, pointer routing and redraw
//! scheduling. See [`manager`] for the painting rules.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tessera::layout::LayoutManager;
//! use tessera::renderer::MemorySink;
//! use tessera::symbols::Panel;
//! use tessera::types::Rect;
//!
//! let manager = LayoutManager::new(MemorySink::new(20, 5));
//! let panel = Arc::new(Panel::new("status", Rect::new(0, 0, 9, 2)).with_title("ok"));
//! manager.add(panel).unwrap();
//! manager.set_active(true);
//! assert!(manager.with_sink(|sink| sink.screen().row_text(0).contains("ok")));
//! ```

pub mod manager;

pub use manager::{BufferGuard, LayoutManager};
