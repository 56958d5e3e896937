//! FrameBuffer - a 2D grid of cells.
//!
//! Symbols paint into a FrameBuffer and hand it to a [`Sink`](super::Sink)
//! at an absolute position. Sinks that keep a screen image use one too.
//!
//! Flat storage with row-major indexing: `index = y * width + x`.

use crate::types::{Cell, Rgba};

// =============================================================================
// FrameBuffer
// =============================================================================

/// A 2D buffer of terminal cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    /// Create a new buffer filled with default cells.
    pub fn new(width: u16, height: u16) -> Self {
        Self::filled(width, height, Cell::default())
    }

    /// Create a new buffer where every cell is `cell`.
    pub fn filled(width: u16, height: u16, cell: Cell) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![cell; size],
        }
    }

    /// A single-row buffer holding `text`.
    pub fn text(text: &str, fg: Rgba, bg: Rgba) -> Self {
        let cells: Vec<Cell> = text.chars().map(|ch| Cell::new(ch, fg, bg)).collect();
        let width = u16::try_from(cells.len()).unwrap_or(u16::MAX);
        Self {
            width,
            height: if width == 0 { 0 } else { 1 },
            cells: cells.into_iter().take(width as usize).collect(),
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    /// Get a cell reference (returns None if out of bounds).
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// Get a mutable cell reference (returns None if out of bounds).
    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// Set a single cell. Returns false if out of bounds.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        match self.get_mut(x, y) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// Write `text` starting at `(x, y)`, truncated at the right edge.
    ///
    /// Returns the number of cells written.
    pub fn put_str(&mut self, x: u16, y: u16, text: &str, fg: Rgba, bg: Rgba) -> usize {
        let mut written = 0;
        for (offset, ch) in text.chars().enumerate() {
            let Ok(offset) = u16::try_from(offset) else {
                break;
            };
            let Some(cx) = x.checked_add(offset) else {
                break;
            };
            if !self.set(cx, y, Cell::new(ch, fg, bg)) {
                break;
            }
            written += 1;
        }
        written
    }

    /// Get raw cells slice.
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Iterate over cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16, &Cell)> {
        let width = self.width.max(1) as usize;
        self.cells.iter().enumerate().map(move |(i, cell)| {
            let x = (i % width) as u16;
            let y = (i / width) as u16;
            (x, y, cell)
        })
    }

    /// The characters of row `y` as a string (for assertions and debugging).
    pub fn row_text(&self, y: u16) -> String {
        (0..self.width)
            .filter_map(|x| self.get(x, y))
            .map(|cell| cell.ch)
            .collect()
    }

    /// Fill every cell with `cell`.
    pub fn fill(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    /// Clear the entire buffer to default cells.
    pub fn clear(&mut self) {
        self.fill(Cell::default());
    }

    /// Resize the buffer (clears content).
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        let size = width as usize * height as usize;
        self.cells.resize(size, Cell::default());
        self.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
