//! LayoutManager - the compositor
//!
//! Owns the ordered list of symbols, the focus state machine, pointer
//! routing and redraw scheduling.
//!
//! # Z-order
//!
//! Insertion order is paint order: index 0 is painted first (back), the
//! last index is painted last (front). Hit-testing scans front-to-back.
//!
//! # Redraw
//!
//! - `draw()` repaints every symbol back-to-front.
//! - `draw_region(r)` finds the front-most symbol whose region fully
//!   contains `r` and repaints from it to the front, each clipped to `r`.
//!   Symbols behind that occluder are skipped. Without an occluder `r` is
//!   blanked first and every symbol overlapping it repaints, so uncovered
//!   cells never keep stale content.
//! - Between [`LayoutManager::begin_buffer`] and the drop of the returned
//!   guard, draw requests are queued instead, including the repaints that
//!   `add`, `add_above`, `add_below` and `remove` would do. On release a
//!   queued full repaint subsumes everything else; otherwise each queued
//!   region is drawn as above.
//!
//! Nothing is painted while the manager is inactive.
//!
//! # Threads
//!
//! Input handlers run on the input thread, everything else on the
//! application thread. Membership changes are expected from a single
//! thread; the input thread only reads the list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::channel::{Subscription, SubscriptionSet};
use crate::error::{Error, Result};
use crate::renderer::{FrameBuffer, Sink};
use crate::state::input::InputSource;
use crate::state::keyboard::KeyEvent;
use crate::state::mouse::{ButtonState, MouseButton, MouseButtonEvent, MouseMove, MouseWheel};
use crate::symbol::{RedrawRequest, Symbol, SymbolId, not_found};
use crate::types::{Coord, Rect};

// =============================================================================
// MEMBERSHIP
// =============================================================================

struct Member {
    symbol: Arc<dyn Symbol>,
    redraw: Subscription,
}

/// Ordered symbols plus a side index from identity to position.
#[derive(Default)]
struct Members {
    order: Vec<Member>,
    index: HashMap<SymbolId, usize>,
}

impl Members {
    fn position(&self, id: SymbolId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    fn insert(&mut self, at: usize, member: Member) {
        self.order.insert(at, member);
        self.reindex(at);
    }

    fn remove(&mut self, at: usize) -> Member {
        let member = self.order.remove(at);
        self.index.remove(&member.symbol.id());
        self.reindex(at);
        member
    }

    fn reindex(&mut self, from: usize) {
        for (i, member) in self.order.iter().enumerate().skip(from) {
            self.index.insert(member.symbol.id(), i);
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn Symbol>> {
        self.order.iter().map(|m| Arc::clone(&m.symbol)).collect()
    }
}

#[derive(Default)]
struct PointerState {
    entered: Option<Arc<dyn Symbol>>,
    buttons: ButtonState,
}

fn same_symbol(a: &Option<Arc<dyn Symbol>>, b: &Option<Arc<dyn Symbol>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.id() == b.id(),
        _ => false,
    }
}

// =============================================================================
// LAYOUT MANAGER
// =============================================================================

struct Shared<S> {
    members: RwLock<Members>,
    focus: Mutex<Option<Arc<dyn Symbol>>>,
    active: AtomicBool,
    sink: Mutex<S>,
    /// Held for the whole life of a buffered transaction.
    transaction: Mutex<()>,
    /// `Some` while a transaction is open. A `None` entry is a full repaint.
    pending: Mutex<Option<Vec<Option<Rect>>>>,
    pointer: Mutex<PointerState>,
    inputs: Mutex<SubscriptionSet>,
}

/// The compositor. Cloning yields another handle to the same manager.
pub struct LayoutManager<S: Sink + Send + 'static> {
    shared: Arc<Shared<S>>,
}

impl<S: Sink + Send + 'static> Clone for LayoutManager<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: Sink + Send + 'static> LayoutManager<S> {
    /// Create an inactive manager drawing into `sink`.
    pub fn new(sink: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                members: RwLock::new(Members::default()),
                focus: Mutex::new(None),
                active: AtomicBool::new(false),
                sink: Mutex::new(sink),
                transaction: Mutex::new(()),
                pending: Mutex::new(None),
                pointer: Mutex::new(PointerState::default()),
                inputs: Mutex::new(SubscriptionSet::new()),
            }),
        }
    }

    fn from_weak(weak: &Weak<Shared<S>>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    /// Run `f` with exclusive access to the sink.
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.shared.sink.lock())
    }

    pub fn set_cursor(&self, position: Coord) {
        self.shared.sink.lock().set_cursor(position);
    }

    // =========================================================================
    // Activation
    // =========================================================================

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Activating repaints everything; deactivating clears focus.
    pub fn set_active(&self, active: bool) {
        self.shared.active.store(active, Ordering::Release);
        log::debug!("LayoutManager: active = {}", active);
        if active {
            self.draw();
        } else {
            self.focus_on(None);
        }
    }

    // =========================================================================
    // Membership
    // =========================================================================

    pub fn len(&self) -> usize {
        self.shared.members.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, symbol: &dyn Symbol) -> bool {
        self.shared.members.read().position(symbol.id()).is_some()
    }

    /// Symbols in paint order, back to front.
    pub fn symbols(&self) -> Vec<Arc<dyn Symbol>> {
        self.shared.members.read().snapshot()
    }

    /// Add `symbol` in front of every other symbol.
    pub fn add(&self, symbol: Arc<dyn Symbol>) -> Result<()> {
        self.insert_at(symbol.clone(), |members| Ok(members.order.len()))?;
        let area = symbol.region().rect();
        if !self.defer(area) && self.is_active() {
            let mut sink = self.shared.sink.lock();
            paint_symbol(&mut *sink, symbol.as_ref(), area);
        }
        Ok(())
    }

    /// Insert `symbol` directly in front of `existing`.
    pub fn add_above(&self, symbol: Arc<dyn Symbol>, existing: &dyn Symbol) -> Result<()> {
        let at = self.insert_at(symbol.clone(), |members| {
            members
                .position(existing.id())
                .map(|p| p + 1)
                .ok_or_else(|| not_found(existing))
        })?;
        self.repaint_inserted(at, symbol.as_ref());
        Ok(())
    }

    /// Insert `symbol` directly behind `existing`.
    pub fn add_below(&self, symbol: Arc<dyn Symbol>, existing: &dyn Symbol) -> Result<()> {
        let at = self.insert_at(symbol.clone(), |members| {
            members
                .position(existing.id())
                .ok_or_else(|| not_found(existing))
        })?;
        self.repaint_inserted(at, symbol.as_ref());
        Ok(())
    }

    fn insert_at(
        &self,
        symbol: Arc<dyn Symbol>,
        locate: impl FnOnce(&Members) -> Result<usize>,
    ) -> Result<usize> {
        // A removed or disposed symbol has a closed redraw channel and could
        // never repaint again.
        if symbol.base().redraw_channel().is_terminal() {
            return Err(Error::InvalidArgument(format!(
                "symbol `{}` ({}) was closed and cannot be added again",
                symbol.name(),
                symbol.id()
            )));
        }
        // Subscribed before taking the list lock: a publishing channel may
        // already be waiting on that lock to paint.
        let redraw = self.link(&symbol);
        let placed = {
            let mut members = self.shared.members.write();
            let at = if members.position(symbol.id()).is_some() {
                Err(Error::InvalidArgument(format!(
                    "symbol `{}` ({}) is already registered",
                    symbol.name(),
                    symbol.id()
                )))
            } else {
                locate(&members)
            };
            if let Ok(at) = at {
                members.insert(
                    at,
                    Member {
                        symbol: Arc::clone(&symbol),
                        redraw: redraw.clone(),
                    },
                );
            }
            at
        };

        match placed {
            Ok(at) => log::debug!(
                "LayoutManager: add `{}` ({}) at {}",
                symbol.name(),
                symbol.id(),
                at
            ),
            Err(_) => redraw.unsubscribe(),
        }
        placed
    }

    /// Forward the symbol's redraw requests to `draw_region`.
    fn link(&self, symbol: &Arc<dyn Symbol>) -> Subscription {
        let weak = Arc::downgrade(&self.shared);
        symbol
            .base()
            .redraw_channel()
            .subscribe_fn(move |request: &RedrawRequest| {
                if let Some(manager) = Self::from_weak(&weak) {
                    for region in &request.regions {
                        manager.draw_region(*region);
                    }
                }
            })
    }

    /// Later symbols may now be partly covered by the new one.
    fn repaint_inserted(&self, at: usize, symbol: &dyn Symbol) {
        let area = symbol.region().rect();
        if self.defer(area) || !self.is_active() {
            return;
        }
        let symbols = self.symbols();
        let mut sink = self.shared.sink.lock();
        for s in symbols.iter().skip(at) {
            paint_symbol(&mut *sink, s.as_ref(), area);
        }
    }

    /// Remove `symbol`, closing its redraw channel. A removed symbol cannot be
    /// added again.
    pub fn remove(&self, symbol: &dyn Symbol) -> Result<Arc<dyn Symbol>> {
        let member = {
            let mut members = self.shared.members.write();
            let at = members
                .position(symbol.id())
                .ok_or_else(|| not_found(symbol))?;
            members.remove(at)
        };
        log::debug!("LayoutManager: remove `{}` ({})", symbol.name(), symbol.id());

        member.redraw.unsubscribe();
        if let Err(e) = member.symbol.base().close() {
            log::warn!("LayoutManager: closing `{}` failed: {}", symbol.name(), e);
        }

        let removed = Some(Arc::clone(&member.symbol));
        if same_symbol(&self.focused(), &removed) {
            self.focus_on(None);
        }
        {
            let mut pointer = self.shared.pointer.lock();
            if same_symbol(&pointer.entered, &removed) {
                pointer.entered = None;
            }
        }

        let area = member.symbol.region().rect();
        if !self.defer(area) && self.is_active() {
            let symbols = self.symbols();
            let mut sink = self.shared.sink.lock();
            erase(&mut *sink, area);
            for s in &symbols {
                paint_symbol(&mut *sink, s.as_ref(), area);
            }
        }
        Ok(member.symbol)
    }

    fn member(&self, id: SymbolId) -> Option<Arc<dyn Symbol>> {
        let members = self.shared.members.read();
        members
            .position(id)
            .map(|at| Arc::clone(&members.order[at].symbol))
    }

    // =========================================================================
    // Focus
    // =========================================================================

    pub fn focused(&self) -> Option<Arc<dyn Symbol>> {
        self.shared.focus.lock().clone()
    }

    /// Focus `target`, or clear focus with `None`.
    pub fn set_focus(&self, target: Option<&dyn Symbol>) -> Result<()> {
        let next = match target {
            None => None,
            Some(t) => Some(self.member(t.id()).ok_or_else(|| not_found(t))?),
        };
        self.focus_on(next);
        Ok(())
    }

    pub fn clear_focus(&self) {
        self.focus_on(None);
    }

    fn focus_on(&self, next: Option<Arc<dyn Symbol>>) {
        let previous = {
            let mut focus = self.shared.focus.lock();
            if same_symbol(&focus, &next) {
                return;
            }
            std::mem::replace(&mut *focus, next.clone())
        };
        log::debug!(
            "LayoutManager: focus {} -> {}",
            previous.as_ref().map_or("none", |s| s.name()),
            next.as_ref().map_or("none", |s| s.name())
        );
        if let Some(previous) = previous {
            previous.focus_changed(false);
        }
        if let Some(next) = next {
            next.focus_changed(true);
        }
    }

    /// Move focus to the next focusable symbol in z-order.
    ///
    /// The cycle passes through "nothing focused" between the last focusable
    /// symbol and the first: with nothing focused the first focusable symbol
    /// gets focus, and running off the end clears focus. A single focusable
    /// symbol therefore alternates between focused and unfocused.
    pub fn cycle_focus(&self) {
        let current = self.focused();
        let next = {
            let members = self.shared.members.read();
            let start = match &current {
                None => 0,
                Some(current) => members.position(current.id()).map_or(0, |p| p + 1),
            };
            members.order[start.min(members.order.len())..]
                .iter()
                .find(|m| m.symbol.can_be_focused())
                .map(|m| Arc::clone(&m.symbol))
        };
        self.focus_on(next);
    }

    // =========================================================================
    // Input routing
    // =========================================================================

    /// Tab cycles focus unless the focused symbol captures Tab and Control
    /// is not held; every other key goes to the focused symbol.
    pub fn key_pressed(&self, event: &KeyEvent) {
        let focused = self.focused();
        if event.is_tab() {
            let captured = focused.as_ref().is_some_and(|f| f.captures_tab_key())
                && !event.modifiers.ctrl;
            if !captured {
                self.cycle_focus();
                return;
            }
        }
        if let Some(focused) = focused {
            focused.key_pressed(event);
        }
    }

    pub fn mouse_moved(&self, event: &MouseMove) {
        let hit = self.hit_test(event.current);
        let transition = {
            let mut pointer = self.shared.pointer.lock();
            if same_symbol(&pointer.entered, &hit) {
                None
            } else {
                let left = std::mem::replace(&mut pointer.entered, hit.clone());
                Some((left, pointer.buttons))
            }
        };

        match transition {
            None => {
                if let Some(symbol) = hit {
                    symbol.mouse_move_event(event.current);
                }
            }
            Some((left, buttons)) => {
                if let Some(left) = left {
                    left.mouse_exited_symbol();
                }
                if let Some(entered) = hit {
                    entered.mouse_entered_symbol(event.current, buttons);
                }
            }
        }
    }

    pub fn mouse_button(&self, event: &MouseButtonEvent) {
        self.shared
            .pointer
            .lock()
            .buttons
            .apply(event.button, event.down);

        self.focus_on(self.focus_target(event.position));
        let Some(symbol) = self.hit_test(event.position) else {
            return;
        };
        match event.button {
            MouseButton::Left => symbol.left_mouse_event(event.position, event.down),
            MouseButton::Right => symbol.right_mouse_event(event.position, event.down),
            MouseButton::Middle => {}
        }
    }

    pub fn mouse_wheel(&self, event: &MouseWheel) {
        self.focus_on(self.focus_target(event.position));
        if let Some(symbol) = self.hit_test(event.position) {
            symbol.scroll_event(event.position, event.direction);
        }
    }

    /// Front-most symbol under `at`.
    fn hit_test(&self, at: Coord) -> Option<Arc<dyn Symbol>> {
        self.front_most(at, |_| true)
    }

    /// Front-most focusable symbol under `at`.
    fn focus_target(&self, at: Coord) -> Option<Arc<dyn Symbol>> {
        self.front_most(at, |s| s.can_be_focused())
    }

    fn front_most(
        &self,
        at: Coord,
        accept: impl Fn(&dyn Symbol) -> bool,
    ) -> Option<Arc<dyn Symbol>> {
        let members = self.shared.members.read();
        members
            .order
            .iter()
            .rev()
            .find(|m| m.symbol.region().overlaps_coord(at) && accept(m.symbol.as_ref()))
            .map(|m| Arc::clone(&m.symbol))
    }

    /// Route every channel of `source` into this manager's input handlers.
    pub fn attach(&self, source: &InputSource) {
        let weak = Arc::downgrade(&self.shared);
        let mut inputs = self.shared.inputs.lock();
        inputs.push(
            source
                .key_pressed()
                .subscribe_fn(forward(&weak, |m, e: &KeyEvent| m.key_pressed(e))),
        );
        inputs.push(
            source
                .mouse_moved()
                .subscribe_fn(forward(&weak, |m, e: &MouseMove| m.mouse_moved(e))),
        );
        inputs.push(
            source
                .mouse_button()
                .subscribe_fn(forward(&weak, |m, e: &MouseButtonEvent| m.mouse_button(e))),
        );
        inputs.push(
            source
                .mouse_wheel()
                .subscribe_fn(forward(&weak, |m, e: &MouseWheel| m.mouse_wheel(e))),
        );
        log::debug!("LayoutManager: attached to input source");
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    /// Repaint everything.
    pub fn draw(&self) {
        self.request(None);
    }

    /// Repaint the area `dirty`.
    pub fn draw_region(&self, dirty: Rect) {
        self.request(Some(dirty));
    }

    fn request(&self, dirty: Option<Rect>) {
        {
            let mut pending = self.shared.pending.lock();
            if let Some(queue) = pending.as_mut() {
                queue.push(dirty);
                return;
            }
        }
        if !self.is_active() {
            return;
        }
        match dirty {
            None => self.paint_all(),
            Some(dirty) => self.paint_region(dirty),
        }
    }

    /// Queue `area` if a transaction is open. Returns whether it was queued.
    fn defer(&self, area: Rect) -> bool {
        match self.shared.pending.lock().as_mut() {
            Some(queue) => {
                queue.push(Some(area));
                true
            }
            None => false,
        }
    }

    /// Open a buffered transaction. Blocks while another one is open.
    pub fn begin_buffer(&self) -> BufferGuard<'_, S> {
        let hold = self.shared.transaction.lock();
        *self.shared.pending.lock() = Some(Vec::new());
        log::trace!("LayoutManager: buffer opened");
        BufferGuard {
            manager: self,
            _hold: hold,
        }
    }

    fn flush(&self, queued: Vec<Option<Rect>>) {
        log::trace!("LayoutManager: flushing {} queued draw(s)", queued.len());
        if queued.is_empty() || !self.is_active() {
            return;
        }
        if queued.iter().any(Option::is_none) {
            self.paint_all();
        } else {
            for dirty in queued.into_iter().flatten() {
                self.paint_region(dirty);
            }
        }
    }

    fn paint_all(&self) {
        let symbols = self.symbols();
        let mut sink = self.shared.sink.lock();
        for s in &symbols {
            paint_symbol(&mut *sink, s.as_ref(), s.region().rect());
        }
    }

    fn paint_region(&self, dirty: Rect) {
        let symbols = self.symbols();
        let start = symbols
            .iter()
            .rposition(|s| s.region().contains(&dirty));
        let mut sink = self.shared.sink.lock();
        if start.is_none() {
            erase(&mut *sink, dirty);
        }
        for s in &symbols[start.unwrap_or(0)..] {
            paint_symbol(&mut *sink, s.as_ref(), dirty);
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Detach from input, deactivate and release every symbol.
    ///
    /// Every failure is collected; teardown never stops early.
    pub fn dispose(&self) -> Result<()> {
        self.shared.active.store(false, Ordering::Release);
        self.focus_on(None);

        let mut errors = Vec::new();
        if let Err(e) = self.shared.inputs.lock().dispose() {
            errors.push(e);
        }

        let members = std::mem::take(&mut *self.shared.members.write());
        for member in members.order {
            member.redraw.unsubscribe();
            if let Err(e) = member.symbol.base().close() {
                errors.push(e);
            }
        }
        *self.shared.pointer.lock() = PointerState::default();

        if !errors.is_empty() {
            log::error!("LayoutManager: {} failure(s) during dispose", errors.len());
        }
        Error::collect(errors)
    }
}

fn forward<S, T, F>(weak: &Weak<Shared<S>>, handler: F) -> impl Fn(&T) + Send + Sync + 'static
where
    S: Sink + Send + 'static,
    T: 'static,
    F: Fn(&LayoutManager<S>, &T) + Send + Sync + 'static,
{
    let weak = weak.clone();
    move |event: &T| {
        if let Some(manager) = LayoutManager::from_weak(&weak) {
            handler(&manager, event);
        }
    }
}

/// Draw `symbol` clipped to `window`, if they share any cell.
fn paint_symbol(sink: &mut dyn Sink, symbol: &dyn Symbol, window: Rect) {
    if let Some(clip) = symbol.region().rect().intersection(&window) {
        symbol.draw(sink, clip);
    }
}

/// Blank `area` with default cells.
fn erase(sink: &mut dyn Sink, area: Rect) {
    let width = u16::try_from(area.horizontal_span()).unwrap_or(u16::MAX);
    let height = u16::try_from(area.vertical_span()).unwrap_or(u16::MAX);
    sink.write(&FrameBuffer::new(width, height), area.top_left(), None);
}

// =============================================================================
// BUFFERED TRANSACTION
// =============================================================================

/// An open buffered transaction. Dropping it flushes the queued draws
/// exactly once, on every exit path.
pub struct BufferGuard<'a, S: Sink + Send + 'static> {
    manager: &'a LayoutManager<S>,
    _hold: MutexGuard<'a, ()>,
}

impl<S: Sink + Send + 'static> Drop for BufferGuard<'_, S> {
    fn drop(&mut self) {
        let queued = self.manager.shared.pending.lock().take();
        if let Some(queued) = queued {
            self.manager.flush(queued);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
