//! Renderer - output side of the compositor.
//!
//! - [`Sink`] - what symbols and the layout manager draw into
//! - [`FrameBuffer`] - 2D cell grid handed to a sink
//! - [`MemorySink`] - in-memory screen image (tests, off-screen composition)
//! - [`TerminalSink`] - crossterm-backed terminal output with diffing

pub mod buffer;
pub mod diff;

pub use buffer::FrameBuffer;
pub use diff::TerminalSink;

use crate::types::{Cell, Coord, Rect};

// =============================================================================
// Sink
// =============================================================================

/// Output collaborator.
///
/// Coordinates are absolute screen cells; negative or out-of-range cells are
/// outside the writable area.
pub trait Sink {
    /// Write `cells` with its top-left corner at `top_left`, skipping any cell
    /// outside `window` when one is given.
    ///
    /// Returns true if every cell that survived the window clip landed inside
    /// the writable area.
    fn write(&mut self, cells: &FrameBuffer, top_left: Coord, window: Option<Rect>) -> bool;

    /// Move the terminal cursor.
    fn set_cursor(&mut self, position: Coord);
}

/// Cells of `cells` placed at `top_left` that fall inside `window`.
pub(crate) fn placed_cells<'a>(
    cells: &'a FrameBuffer,
    top_left: Coord,
    window: Option<Rect>,
) -> impl Iterator<Item = (i32, i32, &'a Cell)> + 'a {
    cells.iter().filter_map(move |(x, y, cell)| {
        let ax = i32::from(top_left.x) + i32::from(x);
        let ay = i32::from(top_left.y) + i32::from(y);
        if let Some(window) = window {
            let inside = ax >= i32::from(window.left())
                && ax <= i32::from(window.right())
                && ay >= i32::from(window.top())
                && ay <= i32::from(window.bottom());
            if !inside {
                return None;
            }
        }
        Some((ax, ay, cell))
    })
}

// =============================================================================
// MemorySink
// =============================================================================

/// A sink that composes into an in-memory [`FrameBuffer`].
#[derive(Debug, Clone)]
pub struct MemorySink {
    screen: FrameBuffer,
    cursor: Coord,
    writes: usize,
}

impl MemorySink {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            screen: FrameBuffer::new(width, height),
            cursor: Coord::ZERO,
            writes: 0,
        }
    }

    /// The composed screen image.
    pub fn screen(&self) -> &FrameBuffer {
        &self.screen
    }

    pub fn cursor(&self) -> Coord {
        self.cursor
    }

    /// Number of `write` calls received.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Cell at an absolute position.
    pub fn cell(&self, at: Coord) -> Option<&Cell> {
        let x = u16::try_from(at.x).ok()?;
        let y = u16::try_from(at.y).ok()?;
        self.screen.get(x, y)
    }
}

impl Sink for MemorySink {
    fn write(&mut self, cells: &FrameBuffer, top_left: Coord, window: Option<Rect>) -> bool {
        self.writes += 1;
        let mut inside = true;
        for (ax, ay, cell) in placed_cells(cells, top_left, window) {
            let placed = match (u16::try_from(ax), u16::try_from(ay)) {
                (Ok(x), Ok(y)) => self.screen.set(x, y, *cell),
                _ => false,
            };
            inside &= placed;
        }
        inside
    }

    fn set_cursor(&mut self, position: Coord) {
        self.cursor = position;
    }
}

// =============================================================================
// Tests
// =============================================================================
