//! Symbol - the widget abstraction
//!
//! A symbol is a [`Region`] plus drawing and input behavior. Concrete
//! widgets embed a [`SymbolBase`], implement [`Symbol::base`] and
//! [`Symbol::draw`], and override only the input hooks they care about.
//!
//! # Redraw contract
//!
//! [`Symbol::request_redraw`] is the only way a symbol tells its owner it
//! needs repainting. It must be called after any visible state change. The
//! base already does this when the symbol's own region commits a change,
//! requesting both the old and the new area.
//!
//! `draw` runs while the owner holds its sink, so it must not request a
//! redraw or mutate its region.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::channel::{Channel, Subscription};
use crate::error::{Error, Result};
use crate::region::Region;
use crate::renderer::Sink;
use crate::state::keyboard::KeyEvent;
use crate::state::mouse::{ButtonState, WheelDirection};
use crate::types::{Coord, Rect};

// =============================================================================
// TYPES
// =============================================================================

/// Identity of a symbol, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u64);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

/// Areas a symbol needs repainted, in absolute coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedrawRequest {
    pub regions: Vec<Rect>,
}

// =============================================================================
// SYMBOL BASE
// =============================================================================

/// State shared by every symbol.
pub struct SymbolBase {
    id: SymbolId,
    name: String,
    region: Arc<Region>,
    can_be_focused: AtomicBool,
    captures_tab_key: AtomicBool,
    redraw: Channel<RedrawRequest>,
    region_link: Mutex<Option<Subscription>>,
}

impl SymbolBase {
    /// Anchor a new symbol to `region`.
    pub fn new(name: impl Into<String>, region: Arc<Region>) -> Self {
        let redraw = Channel::new();
        let link = {
            let redraw = redraw.clone();
            region.changed().subscribe_fn(move |change| {
                let request = RedrawRequest {
                    regions: vec![change.before, change.after],
                };
                if let Err(e) = redraw.publish(request) {
                    log::trace!("Dropping geometry redraw: {}", e);
                }
            })
        };

        Self {
            id: SymbolId(NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            region,
            can_be_focused: AtomicBool::new(false),
            captures_tab_key: AtomicBool::new(false),
            redraw,
            region_link: Mutex::new(Some(link)),
        }
    }

    /// Builder: whether Tab and clicks may focus the symbol.
    pub fn focusable(self, focusable: bool) -> Self {
        self.set_can_be_focused(focusable);
        self
    }

    /// Builder: whether the symbol receives Tab as an ordinary key.
    pub fn capturing_tab(self, captures: bool) -> Self {
        self.set_captures_tab_key(captures);
        self
    }

    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> &Arc<Region> {
        &self.region
    }

    pub fn can_be_focused(&self) -> bool {
        self.can_be_focused.load(Ordering::Acquire)
    }

    pub fn set_can_be_focused(&self, focusable: bool) {
        self.can_be_focused.store(focusable, Ordering::Release);
    }

    pub fn captures_tab_key(&self) -> bool {
        self.captures_tab_key.load(Ordering::Acquire)
    }

    pub fn set_captures_tab_key(&self, captures: bool) {
        self.captures_tab_key.store(captures, Ordering::Release);
    }

    pub fn redraw_channel(&self) -> &Channel<RedrawRequest> {
        &self.redraw
    }

    /// Ask the owner to repaint `regions`.
    pub fn request_redraw(&self, regions: Vec<Rect>) -> Result<()> {
        if regions.is_empty() {
            return Ok(());
        }
        self.redraw.publish(RedrawRequest { regions })
    }

    /// Stop following the region and close the redraw channel.
    pub fn close(&self) -> Result<()> {
        if let Some(link) = self.region_link.lock().take() {
            link.unsubscribe();
        }
        self.redraw.dispose()
    }
}

impl Drop for SymbolBase {
    fn drop(&mut self) {
        if let Some(link) = self.region_link.get_mut().take() {
            link.unsubscribe();
        }
    }
}

impl fmt::Debug for SymbolBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolBase")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("region", &self.region.rect())
            .finish()
    }
}

// =============================================================================
// SYMBOL
// =============================================================================

/// A widget managed by a [`LayoutManager`](crate::layout::LayoutManager).
///
/// Hooks run on whichever thread delivers input, so implementations keep
/// their mutable state behind locks. Never hold such a lock while calling
/// [`Symbol::request_redraw`]: the owner repaints synchronously and will
/// call back into `draw`.
pub trait Symbol: Send + Sync {
    fn base(&self) -> &SymbolBase;

    /// Paint the part of the symbol inside `window` (absolute coordinates).
    fn draw(&self, sink: &mut dyn Sink, window: Rect);

    fn id(&self) -> SymbolId {
        self.base().id()
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    fn region(&self) -> &Arc<Region> {
        self.base().region()
    }

    fn can_be_focused(&self) -> bool {
        self.base().can_be_focused()
    }

    fn captures_tab_key(&self) -> bool {
        self.base().captures_tab_key()
    }

    fn request_redraw(&self, regions: Vec<Rect>) -> Result<()> {
        self.base().request_redraw(regions)
    }

    fn key_pressed(&self, _event: &KeyEvent) {}

    fn mouse_move_event(&self, _position: Coord) {}

    fn left_mouse_event(&self, _position: Coord, _down: bool) {}

    fn right_mouse_event(&self, _position: Coord, _down: bool) {}

    fn scroll_event(&self, _position: Coord, _direction: WheelDirection) {}

    fn mouse_entered_symbol(&self, _position: Coord, _buttons: ButtonState) {}

    fn mouse_exited_symbol(&self) {}

    fn focus_changed(&self, _focused: bool) {}
}

/// Lookup failure naming `symbol`.
pub(crate) fn not_found(symbol: &dyn Symbol) -> Error {
    Error::SymbolNotFound {
        name: symbol.name().to_owned(),
        id: symbol.id(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
