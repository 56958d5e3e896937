//! Differential terminal sink.
//!
//! The TerminalSink keeps a shadow copy of what the terminal currently shows
//! and only emits cells that differ from it. Each `write` is flushed with a
//! single syscall unless a cell carries a delay hint, in which case output
//! is flushed up to that cell and the sink sleeps before continuing.
//!
//! # Algorithm
//!
//! 1. For each cell placed inside the window:
//!    - Out of screen: remember the write was not fully inside, skip
//!    - Same as shadow: skip
//!    - Otherwise: move, set colors, print, update shadow
//! 2. Flush output buffer

use std::io::{self, Stdout, Write};
use std::thread;
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

use super::buffer::FrameBuffer;
use super::{Sink, placed_cells};
use crate::config::TerminalConfig;
use crate::types::{Cell, Coord, Rect, Rgba};

/// Marks a shadow cell as unknown so the next write always emits it.
const UNKNOWN: Cell = Cell::new('\0', Rgba::TERMINAL_DEFAULT, Rgba::TERMINAL_DEFAULT);

/// Terminal output sink.
pub struct TerminalSink<W: Write = Stdout> {
    out: W,
    shadow: FrameBuffer,
    config: TerminalConfig,
    entered: bool,
}

impl TerminalSink<Stdout> {
    /// Sink for the process terminal, sized to the current window.
    pub fn stdout(config: TerminalConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_writer(io::stdout(), width, height, config))
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn with_writer(out: W, width: u16, height: u16, config: TerminalConfig) -> Self {
        Self {
            out,
            shadow: FrameBuffer::filled(width, height, UNKNOWN),
            config,
            entered: false,
        }
    }

    pub fn width(&self) -> u16 {
        self.shadow.width()
    }

    pub fn height(&self) -> u16 {
        self.shadow.height()
    }

    /// Screen bounds as a rect.
    pub fn bounds(&self) -> Rect {
        Rect::from_size(Coord::ZERO, self.width(), self.height())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Forget what the terminal shows. The next writes emit every cell.
    ///
    /// Use this after terminal resize or when the screen is corrupted.
    pub fn invalidate(&mut self) {
        self.shadow.fill(UNKNOWN);
    }

    /// Adopt a new terminal size.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.shadow = FrameBuffer::filled(width, height, UNKNOWN);
    }

    /// Switch the terminal into compositor mode according to the config.
    pub fn enter(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        if self.config.alternate_screen {
            execute!(self.out, EnterAlternateScreen)?;
        }
        if self.config.hide_cursor {
            execute!(self.out, Hide)?;
        }
        if self.config.mouse_capture {
            execute!(self.out, EnableMouseCapture)?;
        }
        execute!(self.out, terminal::Clear(terminal::ClearType::All))?;
        self.invalidate();
        self.entered = true;
        log::debug!("TerminalSink: entered {}x{}", self.width(), self.height());
        Ok(())
    }

    /// Restore the terminal. Safe to call when not entered.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.entered {
            return Ok(());
        }
        self.entered = false;
        if self.config.mouse_capture {
            execute!(self.out, DisableMouseCapture)?;
        }
        execute!(self.out, ResetColor, Show)?;
        if self.config.alternate_screen {
            execute!(self.out, LeaveAlternateScreen)?;
        }
        terminal::disable_raw_mode()?;
        log::debug!("TerminalSink: left terminal");
        Ok(())
    }

    fn emit(
        &mut self,
        cells: &FrameBuffer,
        top_left: Coord,
        window: Option<Rect>,
    ) -> io::Result<bool> {
        let mut inside = true;

        for (ax, ay, cell) in placed_cells(cells, top_left, window) {
            let (Ok(x), Ok(y)) = (u16::try_from(ax), u16::try_from(ay)) else {
                inside = false;
                continue;
            };
            let Some(shown) = self.shadow.get_mut(x, y) else {
                inside = false;
                continue;
            };
            if *shown == *cell {
                continue;
            }
            *shown = *cell;

            queue!(
                self.out,
                MoveTo(x, y),
                SetForegroundColor(to_color(cell.fg)),
                SetBackgroundColor(to_color(cell.bg)),
                Print(cell.ch)
            )?;

            if cell.delay > 0 {
                self.out.flush()?;
                thread::sleep(Duration::from_millis(u64::from(cell.delay)));
            }
        }

        self.out.flush()?;
        Ok(inside)
    }
}

impl<W: Write> Sink for TerminalSink<W> {
    fn write(&mut self, cells: &FrameBuffer, top_left: Coord, window: Option<Rect>) -> bool {
        match self.emit(cells, top_left, window) {
            Ok(inside) => inside,
            Err(e) => {
                log::error!("TerminalSink: write failed: {}", e);
                self.invalidate();
                false
            }
        }
    }

    fn set_cursor(&mut self, position: Coord) {
        let (Ok(x), Ok(y)) = (u16::try_from(position.x), u16::try_from(position.y)) else {
            return;
        };
        if let Err(e) = execute!(self.out, MoveTo(x, y)) {
            log::error!("TerminalSink: cursor move failed: {}", e);
        }
    }
}

impl<W: Write> Drop for TerminalSink<W> {
    fn drop(&mut self) {
        if let Err(e) = self.leave() {
            log::error!("TerminalSink: failed to restore terminal on drop: {}", e);
        }
    }
}

/// Map a cell color onto crossterm's color model.
fn to_color(color: Rgba) -> Color {
    if color.is_terminal_default() {
        Color::Reset
    } else if color.is_ansi() {
        Color::AnsiValue(color.ansi_index())
    } else {
        Color::Rgb {
            r: color.r.clamp(0, 255) as u8,
            g: color.g.clamp(0, 255) as u8,
            b: color.b.clamp(0, 255) as u8,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(width: u16, height: u16) -> TerminalSink<Vec<u8>> {
        TerminalSink::with_writer(Vec::new(), width, height, TerminalConfig::default())
    }

    fn word(text: &str) -> FrameBuffer {
        FrameBuffer::text(text, Rgba::WHITE, Rgba::BLACK)
    }

    fn printed(sink: &TerminalSink<Vec<u8>>) -> String {
        String::from_utf8_lossy(sink.get_ref()).into_owned()
    }

    #[test]
    fn test_first_write_emits_cells() {
        let mut sink = sink(10, 2);
        assert!(sink.write(&word("hi"), Coord::new(1, 1), None));
        let out = printed(&sink);
        assert!(out.contains('h'));
        assert!(out.contains('i'));
    }

    #[test]
    fn test_unchanged_cells_are_skipped() {
        let mut sink = sink(10, 2);
        sink.write(&word("hi"), Coord::ZERO, None);
        let len = sink.get_ref().len();

        assert!(sink.write(&word("hi"), Coord::ZERO, None));
        assert_eq!(sink.get_ref().len(), len);
    }

    #[test]
    fn test_invalidate_forces_full_emit() {
        let mut sink = sink(10, 2);
        sink.write(&word("hi"), Coord::ZERO, None);
        let len = sink.get_ref().len();

        sink.invalidate();
        sink.write(&word("hi"), Coord::ZERO, None);
        assert!(sink.get_ref().len() > len);
    }

    #[test]
    fn test_window_clip_and_bounds() {
        let mut sink = sink(3, 1);
        let window = Rect::new(0, 0, 0, 0);
        assert!(sink.write(&word("xyz"), Coord::ZERO, Some(window)));
        let out = printed(&sink);
        assert!(out.contains('x'));
        assert!(!out.contains('y'));

        assert!(!sink.write(&word("abcd"), Coord::ZERO, None));
    }

    #[test]
    fn test_to_color() {
        assert_eq!(to_color(Rgba::TERMINAL_DEFAULT), Color::Reset);
        assert_eq!(to_color(Rgba::ansi(9)), Color::AnsiValue(9));
        assert_eq!(to_color(Rgba::rgb(1, 2, 3)), Color::Rgb { r: 1, g: 2, b: 3 });
    }

    #[test]
    fn test_bounds() {
        let sink = sink(80, 24);
        assert_eq!(sink.bounds(), Rect::new(0, 0, 79, 23));
    }
}
