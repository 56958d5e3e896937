//! Panel - a filled rectangle with a one-line title.
//!
//! The panel reacts to the hooks a typical widget needs:
//!
//! - focus swaps the background for the focus background
//! - a held left button inverts the title
//! - typed characters append to the title, Backspace removes the last one
//!
//! Every visible change ends in a redraw request for the panel's area.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::region::Region;
use crate::renderer::{FrameBuffer, Sink};
use crate::state::keyboard::{Key, KeyEvent};
use crate::symbol::{Symbol, SymbolBase};
use crate::types::{Cell, Coord, Rect, Rgba};

#[derive(Debug, Clone)]
struct PanelState {
    title: String,
    fg: Rgba,
    bg: Rgba,
    focus_bg: Rgba,
    focused: bool,
    pressed: bool,
}

/// Filled rectangle with a title on its first row.
#[derive(Debug)]
pub struct Panel {
    base: SymbolBase,
    state: Mutex<PanelState>,
}

impl Panel {
    /// A focusable panel covering `rect`.
    pub fn new(name: impl Into<String>, rect: Rect) -> Self {
        Self::with_region(name, Arc::new(Region::from_rect(rect)))
    }

    /// A focusable panel anchored to an existing region.
    pub fn with_region(name: impl Into<String>, region: Arc<Region>) -> Self {
        Self {
            base: SymbolBase::new(name, region).focusable(true),
            state: Mutex::new(PanelState {
                title: String::new(),
                fg: Rgba::WHITE,
                bg: Rgba::BLUE,
                focus_bg: Rgba::CYAN,
                focused: false,
                pressed: false,
            }),
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.state.lock().title = title.into();
        self
    }

    pub fn with_colors(self, fg: Rgba, bg: Rgba) -> Self {
        {
            let mut state = self.state.lock();
            state.fg = fg;
            state.bg = bg;
        }
        self
    }

    pub fn with_focus_background(self, bg: Rgba) -> Self {
        self.state.lock().focus_bg = bg;
        self
    }

    pub fn focusable(self, focusable: bool) -> Self {
        self.base.set_can_be_focused(focusable);
        self
    }

    pub fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.update(|state| state.title = title.into());
    }

    pub fn is_focused(&self) -> bool {
        self.state.lock().focused
    }

    pub fn is_pressed(&self) -> bool {
        self.state.lock().pressed
    }

    /// Apply `change`, then ask for a repaint if anything visible moved.
    fn update(&self, change: impl FnOnce(&mut PanelState)) {
        let changed = {
            let mut state = self.state.lock();
            let before = state.clone();
            change(&mut state);
            before.title != state.title
                || before.focused != state.focused
                || before.pressed != state.pressed
        };
        if changed {
            let area = self.region().rect();
            if let Err(e) = self.request_redraw(vec![area]) {
                log::debug!("Panel `{}`: redraw dropped: {}", self.name(), e);
            }
        }
    }

    fn render(&self, rect: Rect) -> FrameBuffer {
        let state = self.state.lock().clone();
        let width = u16::try_from(rect.horizontal_span()).unwrap_or(u16::MAX);
        let height = u16::try_from(rect.vertical_span()).unwrap_or(u16::MAX);
        let bg = if state.focused { state.focus_bg } else { state.bg };

        let mut cells = FrameBuffer::filled(width, height, Cell::new(' ', state.fg, bg));
        let (fg, bg) = if state.pressed { (bg, state.fg) } else { (state.fg, bg) };
        cells.put_str(1, 0, &state.title, fg, bg);
        cells
    }
}

impl Symbol for Panel {
    fn base(&self) -> &SymbolBase {
        &self.base
    }

    fn draw(&self, sink: &mut dyn Sink, window: Rect) {
        let rect = self.region().rect();
        if rect.intersection(&window).is_none() {
            return;
        }
        sink.write(&self.render(rect), rect.top_left(), Some(window));
    }

    fn key_pressed(&self, event: &KeyEvent) {
        if event.modifiers.ctrl || event.modifiers.alt {
            return;
        }
        match event.key {
            Key::Char(c) => self.update(|state| state.title.push(c)),
            Key::Backspace => self.update(|state| {
                state.title.pop();
            }),
            _ => {}
        }
    }

    fn left_mouse_event(&self, _position: Coord, down: bool) {
        self.update(|state| state.pressed = down);
    }

    fn mouse_exited_symbol(&self) {
        self.update(|state| state.pressed = false);
    }

    fn focus_changed(&self, focused: bool) {
        self.update(|state| state.focused = focused);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::MemorySink;
    use crate::symbol::RedrawRequest;
    use test_log::test;

    fn requests(panel: &Panel) -> Arc<Mutex<Vec<RedrawRequest>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        panel
            .base()
            .redraw_channel()
            .subscribe_fn(move |r| s.lock().push(r.clone()));
        seen
    }

    #[test]
    fn test_draws_title_on_background() {
        let panel = Panel::new("p", Rect::new(1, 1, 6, 2)).with_title("hey");
        let mut sink = MemorySink::new(8, 4);
        panel.draw(&mut sink, panel.region().rect());

        assert_eq!(sink.screen().row_text(1), "  hey   ");
        assert_eq!(sink.screen().row_text(2), "        ");
        assert_eq!(sink.cell(Coord::new(1, 2)).map(|c| c.bg), Some(Rgba::BLUE));
        assert_eq!(sink.cell(Coord::new(0, 0)).map(|c| c.bg), Some(Rgba::TERMINAL_DEFAULT));
    }

    #[test]
    fn test_draw_clips_to_window() {
        let panel = Panel::new("p", Rect::new(0, 0, 5, 0)).with_title("abcd");
        let mut sink = MemorySink::new(6, 1);
        panel.draw(&mut sink, Rect::new(2, 0, 3, 0));
        assert_eq!(sink.screen().row_text(0), "  bc  ");
    }

    #[test]
    fn test_draw_outside_window_writes_nothing() {
        let panel = Panel::new("p", Rect::new(0, 0, 1, 1));
        let mut sink = MemorySink::new(6, 6);
        panel.draw(&mut sink, Rect::new(4, 4, 5, 5));
        assert_eq!(sink.writes(), 0);
    }

    #[test]
    fn test_focus_changes_background_and_requests_redraw() {
        let panel = Panel::new("p", Rect::new(0, 0, 3, 0)).with_focus_background(Rgba::RED);
        let seen = requests(&panel);

        panel.focus_changed(true);
        assert!(panel.is_focused());
        panel.focus_changed(true);
        assert_eq!(seen.lock().len(), 1, "unchanged state requests nothing");

        let mut sink = MemorySink::new(4, 1);
        panel.draw(&mut sink, panel.region().rect());
        assert_eq!(sink.cell(Coord::new(0, 0)).map(|c| c.bg), Some(Rgba::RED));
    }

    #[test]
    fn test_typing_edits_title() {
        let panel = Panel::new("p", Rect::new(0, 0, 9, 0)).with_title("ab");
        let seen = requests(&panel);

        panel.key_pressed(&KeyEvent::char('c'));
        panel.key_pressed(&KeyEvent::new(Key::Backspace));
        panel.key_pressed(&KeyEvent::new(Key::Backspace));
        panel.key_pressed(&KeyEvent::with_modifiers(
            Key::Char('z'),
            crate::state::keyboard::Modifiers::ctrl(),
        ));
        panel.key_pressed(&KeyEvent::new(Key::Up));

        assert_eq!(panel.title(), "a");
        assert_eq!(seen.lock().len(), 3);
        assert_eq!(seen.lock()[0].regions, vec![Rect::new(0, 0, 9, 0)]);
    }

    #[test]
    fn test_press_inverts_title_until_release_or_exit() {
        let panel = Panel::new("p", Rect::new(0, 0, 3, 0))
            .with_title("x")
            .with_colors(Rgba::BLACK, Rgba::WHITE);

        panel.left_mouse_event(Coord::ZERO, true);
        assert!(panel.is_pressed());
        let mut sink = MemorySink::new(4, 1);
        panel.draw(&mut sink, panel.region().rect());
        assert_eq!(sink.cell(Coord::new(1, 0)).map(|c| c.bg), Some(Rgba::BLACK));

        panel.mouse_exited_symbol();
        assert!(!panel.is_pressed());
        panel.left_mouse_event(Coord::ZERO, true);
        panel.left_mouse_event(Coord::ZERO, false);
        assert!(!panel.is_pressed());
    }

    #[test]
    fn test_moving_region_requests_old_and_new_area() {
        let panel = Panel::new("p", Rect::new(0, 0, 1, 1));
        let seen = requests(&panel);
        assert!(panel.region().translate(Coord::new(2, 0)));
        assert_eq!(
            seen.lock()[0].regions,
            vec![Rect::new(0, 0, 1, 1), Rect::new(2, 0, 3, 1)]
        );
    }
}
