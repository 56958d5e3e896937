//! Input Module - event source, conversion and the input thread
//!
//! Bridges crossterm's event system with the compositor.
//!
//! # API
//!
//! - [`InputSource`] - one channel per event kind; a layout manager
//!   subscribes with [`LayoutManager::attach`](crate::layout::LayoutManager::attach)
//! - [`convert_event`] - crossterm event to [`InputEvent`]
//! - [`InputThread`] - dedicated thread that polls the terminal and pushes
//!   every event into a source, in device order
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tessera::TerminalConfig;
//! use tessera::state::input::{InputSource, InputThread};
//!
//! let source = Arc::new(InputSource::new());
//! source.exit_accepted().subscribe_fn(|_| println!("bye"));
//! let mut thread = InputThread::spawn(Arc::clone(&source), &TerminalConfig::default())?;
//! // ... run the application ...
//! thread.shutdown()?;
//! # Ok::<(), tessera::Error>(())
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{
    self, Event as CrosstermEvent, KeyCode, KeyEvent as CrosstermKeyEvent, KeyEventKind,
    KeyModifiers, MouseButton as CrosstermMouseButton, MouseEvent as CrosstermMouseEvent,
    MouseEventKind,
};
use parking_lot::Mutex;

use super::keyboard::{Key, KeyEvent, Modifiers};
use super::mouse::{MouseButton, MouseButtonEvent, MouseMove, MouseWheel, WheelDirection};
use crate::channel::Channel;
use crate::config::TerminalConfig;
use crate::error::Result;
use crate::types::Coord;

// =============================================================================
// INPUT EVENT ENUM
// =============================================================================

/// Unified event type, before routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    /// Pointer now at this position (moves and drags).
    Move(Coord),
    Button(MouseButtonEvent),
    Wheel(MouseWheel),
    /// Terminal resized (new width, height)
    Resize(u16, u16),
    /// Nothing to route (focus changes, paste, key releases)
    None,
}

// =============================================================================
// CONVERSION
// =============================================================================

/// Convert any crossterm event.
pub fn convert_event(event: CrosstermEvent) -> InputEvent {
    match event {
        CrosstermEvent::Key(key) => {
            convert_key_event(key).map_or(InputEvent::None, InputEvent::Key)
        }
        CrosstermEvent::Mouse(mouse) => convert_mouse_event(mouse),
        CrosstermEvent::Resize(w, h) => InputEvent::Resize(w, h),
        _ => InputEvent::None,
    }
}

/// Convert a crossterm mouse event. Drags are reported as moves.
pub fn convert_mouse_event(event: CrosstermMouseEvent) -> InputEvent {
    let position = cell_position(event.column, event.row);
    let wheel = |direction| InputEvent::Wheel(MouseWheel { position, direction });
    match event.kind {
        MouseEventKind::Down(btn) => {
            InputEvent::Button(MouseButtonEvent::down(convert_mouse_button(btn), position))
        }
        MouseEventKind::Up(btn) => {
            InputEvent::Button(MouseButtonEvent::up(convert_mouse_button(btn), position))
        }
        MouseEventKind::Drag(_) | MouseEventKind::Moved => InputEvent::Move(position),
        MouseEventKind::ScrollUp => wheel(WheelDirection::Up),
        MouseEventKind::ScrollDown => wheel(WheelDirection::Down),
        MouseEventKind::ScrollLeft => wheel(WheelDirection::Left),
        MouseEventKind::ScrollRight => wheel(WheelDirection::Right),
    }
}

fn convert_mouse_button(btn: CrosstermMouseButton) -> MouseButton {
    match btn {
        CrosstermMouseButton::Left => MouseButton::Left,
        CrosstermMouseButton::Right => MouseButton::Right,
        CrosstermMouseButton::Middle => MouseButton::Middle,
    }
}

fn cell_position(column: u16, row: u16) -> Coord {
    let clamp = |v: u16| i16::try_from(v).unwrap_or(i16::MAX);
    Coord::new(clamp(column), clamp(row))
}

/// Convert a crossterm key event. Releases yield `None`.
pub fn convert_key_event(event: CrosstermKeyEvent) -> Option<KeyEvent> {
    if event.kind == KeyEventKind::Release {
        return None;
    }

    let key = match event.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab | KeyCode::BackTab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Insert => Key::Insert,
        KeyCode::Esc => Key::Escape,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::F(n) => Key::F(n),
        _ => Key::Unknown,
    };

    let mut modifiers = convert_modifiers(event.modifiers);
    // crossterm reports Shift+Tab as its own key code.
    if event.code == KeyCode::BackTab {
        modifiers.shift = true;
    }
    Some(KeyEvent::with_modifiers(key, modifiers))
}

fn convert_modifiers(mods: KeyModifiers) -> Modifiers {
    Modifiers {
        ctrl: mods.contains(KeyModifiers::CONTROL),
        alt: mods.contains(KeyModifiers::ALT),
        shift: mods.contains(KeyModifiers::SHIFT),
    }
}

fn is_ctrl_c(event: &CrosstermEvent) -> bool {
    matches!(
        event,
        CrosstermEvent::Key(key)
            if key.code == KeyCode::Char('c')
                && key.modifiers.contains(KeyModifiers::CONTROL)
                && key.kind != KeyEventKind::Release
    )
}

// =============================================================================
// INPUT SOURCE
// =============================================================================

/// The input collaborator: one channel per event kind.
///
/// Events pushed from one thread are published in push order. Mouse moves to
/// the position already reported are suppressed.
#[derive(Default)]
pub struct InputSource {
    key_pressed: Channel<KeyEvent>,
    mouse_moved: Channel<MouseMove>,
    mouse_button: Channel<MouseButtonEvent>,
    mouse_wheel: Channel<MouseWheel>,
    resized: Channel<(u16, u16)>,
    exit_accepted: Channel<()>,
    last_position: Mutex<Option<Coord>>,
    exited: AtomicBool,
}

impl InputSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_pressed(&self) -> &Channel<KeyEvent> {
        &self.key_pressed
    }

    pub fn mouse_moved(&self) -> &Channel<MouseMove> {
        &self.mouse_moved
    }

    pub fn mouse_button(&self) -> &Channel<MouseButtonEvent> {
        &self.mouse_button
    }

    pub fn mouse_wheel(&self) -> &Channel<MouseWheel> {
        &self.mouse_wheel
    }

    pub fn resized(&self) -> &Channel<(u16, u16)> {
        &self.resized
    }

    /// Fires once, then completes.
    pub fn exit_accepted(&self) -> &Channel<()> {
        &self.exit_accepted
    }

    /// Publish `event` on its channel.
    pub fn push(&self, event: InputEvent) -> Result<()> {
        match event {
            InputEvent::Key(key) => self.push_key(key),
            InputEvent::Move(position) => self.push_move(position),
            InputEvent::Button(button) => self.mouse_button.publish(button),
            InputEvent::Wheel(wheel) => self.mouse_wheel.publish(wheel),
            InputEvent::Resize(w, h) => self.resized.publish((w, h)),
            InputEvent::None => Ok(()),
        }
    }

    pub fn push_key(&self, event: KeyEvent) -> Result<()> {
        self.key_pressed.publish(event)
    }

    /// Report the pointer at `position`. The first move reports the same
    /// position as previous and current.
    pub fn push_move(&self, position: Coord) -> Result<()> {
        let previous = {
            let mut last = self.last_position.lock();
            match last.replace(position) {
                Some(previous) if previous == position => return Ok(()),
                Some(previous) => previous,
                None => position,
            }
        };
        self.mouse_moved.publish(MouseMove {
            previous,
            current: position,
        })
    }

    pub fn push_button(&self, button: MouseButton, position: Coord, down: bool) -> Result<()> {
        self.mouse_button.publish(MouseButtonEvent {
            button,
            position,
            down,
        })
    }

    pub fn push_wheel(&self, position: Coord, direction: WheelDirection) -> Result<()> {
        self.mouse_wheel.publish(MouseWheel { position, direction })
    }

    /// Fire exit-accepted. Returns false if it already fired.
    pub fn accept_exit(&self) -> bool {
        if self.exited.swap(true, Ordering::AcqRel) {
            return false;
        }
        log::debug!("InputSource: exit accepted");
        if let Err(e) = self
            .exit_accepted
            .publish(())
            .and_then(|()| self.exit_accepted.complete())
        {
            log::warn!("InputSource: exit handler failed: {}", e);
        }
        true
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }
}

// =============================================================================
// INPUT THREAD
// =============================================================================

/// Dedicated thread that polls crossterm and pushes into an [`InputSource`].
///
/// Each wait is bounded by [`TerminalConfig::poll_interval`], after which
/// the running flag is re-checked; that interval bounds shutdown latency.
/// A failing or panicking handler costs only the event it was handling.
pub struct InputThread {
    source: Arc<InputSource>,
    running: Arc<Mutex<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl InputThread {
    pub fn spawn(source: Arc<InputSource>, config: &TerminalConfig) -> Result<Self> {
        let running = Arc::new(Mutex::new(true));
        let handle = thread::Builder::new()
            .name("tessera-input".to_owned())
            .spawn({
                let source = Arc::clone(&source);
                let running = Arc::clone(&running);
                let interval = config.poll_interval;
                let exit_on_ctrl_c = config.exit_on_ctrl_c;
                move || poll_loop(&source, &running, interval, exit_on_ctrl_c)
            })?;

        Ok(Self {
            source,
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }

    pub fn source(&self) -> &Arc<InputSource> {
        &self.source
    }

    /// Stop the thread, wait for it, and fire exit-accepted if it has not
    /// fired yet. Idempotent.
    pub fn shutdown(&mut self) -> Result<()> {
        *self.running.lock() = false;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Input thread panicked");
            }
        }
        self.source.accept_exit();
        Ok(())
    }
}

impl Drop for InputThread {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("Input thread shutdown failed: {}", e);
        }
    }
}

fn poll_loop(
    source: &InputSource,
    running: &Mutex<bool>,
    interval: Duration,
    exit_on_ctrl_c: bool,
) {
    log::debug!("Input thread started");
    'outer: while *running.lock() {
        match event::poll(interval) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                log::error!("Input poll failed: {}", e);
                break;
            }
        }

        // Drain everything already queued before waiting again.
        loop {
            let raw = match event::read() {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("Input read failed: {}", e);
                    break;
                }
            };
            if exit_on_ctrl_c && is_ctrl_c(&raw) {
                *running.lock() = false;
                source.accept_exit();
                break 'outer;
            }
            dispatch(source, convert_event(raw));

            if !*running.lock() || !matches!(event::poll(Duration::ZERO), Ok(true)) {
                break;
            }
        }
    }
    log::debug!("Input thread stopped");
}

/// Push one event, discarding it with a warning if any handler fails.
fn dispatch(source: &InputSource, event: InputEvent) {
    log::trace!("Input: {:?}", event);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| source.push(event.clone())));
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("Discarding input event {:?}: {}", event, e),
        Err(_) => log::warn!("Input handler panicked; discarding {:?}", event),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use test_log::test;

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> CrosstermMouseEvent {
        CrosstermMouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::empty(),
        }
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> CrosstermKeyEvent {
        CrosstermKeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    // -------------------------------------------------------------------------
    // Conversion
    // -------------------------------------------------------------------------

    #[test]
    fn test_convert_mouse_down() {
        let event = convert_mouse_event(mouse(
            MouseEventKind::Down(CrosstermMouseButton::Left),
            10,
            5,
        ));
        assert_eq!(
            event,
            InputEvent::Button(MouseButtonEvent::down(MouseButton::Left, Coord::new(10, 5)))
        );
    }

    #[test]
    fn test_convert_mouse_up() {
        let event = convert_mouse_event(mouse(
            MouseEventKind::Up(CrosstermMouseButton::Right),
            20,
            15,
        ));
        assert_eq!(
            event,
            InputEvent::Button(MouseButtonEvent::up(MouseButton::Right, Coord::new(20, 15)))
        );
    }

    #[test]
    fn test_convert_mouse_scroll_directions() {
        let directions = [
            (MouseEventKind::ScrollUp, WheelDirection::Up),
            (MouseEventKind::ScrollDown, WheelDirection::Down),
            (MouseEventKind::ScrollLeft, WheelDirection::Left),
            (MouseEventKind::ScrollRight, WheelDirection::Right),
        ];

        for (kind, direction) in directions {
            let event = convert_mouse_event(mouse(kind, 3, 4));
            assert_eq!(
                event,
                InputEvent::Wheel(MouseWheel {
                    position: Coord::new(3, 4),
                    direction,
                })
            );
        }
    }

    #[test]
    fn test_convert_mouse_move_and_drag() {
        assert_eq!(
            convert_mouse_event(mouse(MouseEventKind::Moved, 30, 20)),
            InputEvent::Move(Coord::new(30, 20))
        );
        assert_eq!(
            convert_mouse_event(mouse(MouseEventKind::Drag(CrosstermMouseButton::Left), 5, 5)),
            InputEvent::Move(Coord::new(5, 5))
        );
    }

    #[test]
    fn test_convert_mouse_position_clamps() {
        assert_eq!(
            convert_mouse_event(mouse(MouseEventKind::Moved, u16::MAX, 1)),
            InputEvent::Move(Coord::new(i16::MAX, 1))
        );
    }

    #[test]
    fn test_convert_key_char() {
        let event = convert_key_event(key(KeyCode::Char('a'), KeyModifiers::empty())).unwrap();
        assert_eq!(event.key, Key::Char('a'));
        assert_eq!(event.ch, 'a');
        assert!(!event.modifiers.ctrl);
    }

    #[test]
    fn test_convert_key_navigation() {
        let nav_keys = [
            (KeyCode::Home, Key::Home),
            (KeyCode::End, Key::End),
            (KeyCode::PageUp, Key::PageUp),
            (KeyCode::PageDown, Key::PageDown),
            (KeyCode::Insert, Key::Insert),
            (KeyCode::Delete, Key::Delete),
            (KeyCode::Backspace, Key::Backspace),
            (KeyCode::Tab, Key::Tab),
            (KeyCode::Esc, Key::Escape),
            (KeyCode::Up, Key::Up),
            (KeyCode::Down, Key::Down),
            (KeyCode::Left, Key::Left),
            (KeyCode::Right, Key::Right),
            (KeyCode::F(7), Key::F(7)),
            (KeyCode::CapsLock, Key::Unknown),
        ];

        for (code, expected) in nav_keys {
            let event = convert_key_event(key(code, KeyModifiers::empty())).unwrap();
            assert_eq!(event.key, expected);
        }
    }

    #[test]
    fn test_convert_back_tab_is_shift_tab() {
        let event = convert_key_event(key(KeyCode::BackTab, KeyModifiers::empty())).unwrap();
        assert!(event.is_tab());
        assert!(event.modifiers.shift);
    }

    #[test]
    fn test_convert_key_with_all_modifiers() {
        let event = convert_key_event(key(
            KeyCode::Char('x'),
            KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SHIFT,
        ))
        .unwrap();
        assert_eq!(
            event.modifiers,
            Modifiers {
                ctrl: true,
                alt: true,
                shift: true,
            }
        );
    }

    #[test]
    fn test_convert_key_release_is_dropped() {
        let mut release = key(KeyCode::Char('a'), KeyModifiers::empty());
        release.kind = KeyEventKind::Release;
        assert!(convert_key_event(release).is_none());
        assert_eq!(convert_event(CrosstermEvent::Key(release)), InputEvent::None);

        let mut repeat = release;
        repeat.kind = KeyEventKind::Repeat;
        assert!(convert_key_event(repeat).is_some());
    }

    #[test]
    fn test_convert_event_resize_and_other() {
        assert_eq!(convert_event(CrosstermEvent::Resize(80, 24)), InputEvent::Resize(80, 24));
        assert_eq!(convert_event(CrosstermEvent::FocusGained), InputEvent::None);
    }

    #[test]
    fn test_ctrl_c_detection() {
        assert!(is_ctrl_c(&CrosstermEvent::Key(key(KeyCode::Char('c'), KeyModifiers::CONTROL))));
        assert!(!is_ctrl_c(&CrosstermEvent::Key(key(KeyCode::Char('c'), KeyModifiers::empty()))));
        assert!(!is_ctrl_c(&CrosstermEvent::Resize(1, 1)));
    }

    // -------------------------------------------------------------------------
    // Source
    // -------------------------------------------------------------------------

    #[test]
    fn test_move_suppresses_unchanged_position() {
        let source = InputSource::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        source.mouse_moved().subscribe_fn(move |m| s.lock().push(*m));

        source.push_move(Coord::new(1, 1)).unwrap();
        source.push_move(Coord::new(1, 1)).unwrap();
        source.push(InputEvent::Move(Coord::new(2, 1))).unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                MouseMove {
                    previous: Coord::new(1, 1),
                    current: Coord::new(1, 1),
                },
                MouseMove {
                    previous: Coord::new(1, 1),
                    current: Coord::new(2, 1),
                },
            ]
        );
    }

    #[test]
    fn test_events_arrive_in_push_order() {
        let source = InputSource::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let s = Arc::clone(&seen);
            source.key_pressed().subscribe_fn(move |k| s.lock().push(format!("key {:?}", k.key)));
            let s = Arc::clone(&seen);
            source
                .mouse_button()
                .subscribe_fn(move |b| s.lock().push(format!("button {}", b.down)));
            let s = Arc::clone(&seen);
            source
                .mouse_wheel()
                .subscribe_fn(move |w| s.lock().push(format!("wheel {:?}", w.direction)));
        }

        source.push(InputEvent::Key(KeyEvent::char('a'))).unwrap();
        source.push_button(MouseButton::Left, Coord::ZERO, true).unwrap();
        source.push_wheel(Coord::ZERO, WheelDirection::Up).unwrap();
        source.push(InputEvent::None).unwrap();

        assert_eq!(
            *seen.lock(),
            vec!["key Char('a')", "button true", "wheel Up"]
        );
    }

    #[test]
    fn test_exit_fires_at_most_once() {
        let source = InputSource::new();
        let count = Arc::new(Mutex::new(0));
        let c = Arc::clone(&count);
        source.exit_accepted().subscribe_fn(move |_| *c.lock() += 1);

        assert!(source.accept_exit());
        assert!(!source.accept_exit());
        assert!(source.has_exited());
        assert_eq!(*count.lock(), 1);
        assert!(source.exit_accepted().is_completed());
    }

    #[test]
    fn test_dispatch_survives_panicking_handler() {
        let source = InputSource::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        source.key_pressed().subscribe_fn(move |k| {
            if k.ch == 'x' {
                panic!("handler bug");
            }
            s.lock().push(k.ch);
        });

        dispatch(&source, InputEvent::Key(KeyEvent::char('a')));
        dispatch(&source, InputEvent::Key(KeyEvent::char('x')));
        dispatch(&source, InputEvent::Key(KeyEvent::char('b')));

        assert_eq!(*seen.lock(), vec!['a', 'b']);
    }

    #[test]
    fn test_dispatch_discards_on_terminal_channel() {
        let source = InputSource::new();
        source.key_pressed().complete().unwrap();
        // Logged and dropped, never propagated.
        dispatch(&source, InputEvent::Key(KeyEvent::char('a')));
    }
}
