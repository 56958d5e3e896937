//! # tessera
//!
//! Retained-mode character-cell compositor for terminal UIs.
//!
//! ## Architecture
//!
//! Widgets ([`Symbol`]s) are anchored to mutable rectangles ([`Region`]s)
//! and registered with one [`LayoutManager`]. The manager owns paint order,
//! keyboard focus, pointer routing and redraw scheduling; every change
//! notification travels over a [`Channel`]:
//!
//! ```text
//! InputThread → InputSource channels → LayoutManager → Symbol hooks
//! Region.changed / Symbol redraw channel → LayoutManager::draw_region → Sink
//! ```
//!
//! ## Modules
//!
//! - [`types`] - `Coord`, `Rect`, `Rgba`, `Cell`
//! - [`channel`] - publish/subscribe primitive
//! - [`region`] - rectangle with cancelable two-phase change
//! - [`symbol`] - widget abstraction
//! - [`symbols`] - ready-made widgets
//! - [`layout`] - the compositor
//! - [`state`] - input events and the crossterm input backend
//! - [`renderer`] - sinks: in-memory and crossterm terminal output
//! - [`config`] - terminal session settings

pub mod channel;
pub mod config;
pub mod error;
pub mod layout;
pub mod region;
pub mod renderer;
pub mod state;
pub mod symbol;
pub mod symbols;
pub mod types;

pub use channel::{Channel, Observer, Subscription, SubscriptionSet};
pub use config::TerminalConfig;
pub use error::{Error, Fault, Result, fault};
pub use layout::{BufferGuard, LayoutManager};
pub use region::{ChangeKind, ChangeRequest, Region, RegionChange, Rejected};
pub use renderer::{FrameBuffer, MemorySink, Sink, TerminalSink};
pub use symbol::{RedrawRequest, Symbol, SymbolBase, SymbolId};
pub use types::{Cell, Coord, Rect, Rgba};
