//! Core types for tessera.
//!
//! These types define the foundation that everything builds on: the integer
//! coordinate space of the character grid, the rectangles laid over it, and
//! the cells that end up in a sink.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

// =============================================================================
// Coord
// =============================================================================

/// A 2D integer vector in cell units.
///
/// Used both as a position (column, row) and as an offset between positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Coord {
    pub x: i16,
    pub y: i16,
}

impl Coord {
    /// The origin, `(0, 0)`.
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a new coordinate.
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Add for Coord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl AddAssign for Coord {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Coord {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

impl SubAssign for Coord {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<i16> for Coord {
    type Output = Self;

    fn mul(self, rhs: i16) -> Self {
        Self::new(self.x.saturating_mul(rhs), self.y.saturating_mul(rhs))
    }
}

impl Neg for Coord {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(self.x.saturating_neg(), self.y.saturating_neg())
    }
}

impl From<(i16, i16)> for Coord {
    fn from((x, y): (i16, i16)) -> Self {
        Self::new(x, y)
    }
}

// =============================================================================
// Rect
// =============================================================================

/// An axis-aligned box with inclusive bounds on all four sides.
///
/// Always normalized: `left <= right` and `top <= bottom`. Constructors swap
/// reversed bounds instead of rejecting them, so the fields are private.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    left: i16,
    top: i16,
    right: i16,
    bottom: i16,
}

impl Rect {
    /// Create a rect from four bounds, swapping any reversed pair.
    pub fn new(left: i16, top: i16, right: i16, bottom: i16) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    /// Create a rect spanning two opposite corners, in any order.
    pub fn from_corners(a: Coord, b: Coord) -> Self {
        Self::new(a.x, a.y, b.x, b.y)
    }

    /// Create a rect covering `width` x `height` cells starting at `top_left`.
    ///
    /// Zero sizes are treated as one cell, since a rect always covers at
    /// least the cell at its top-left corner.
    pub fn from_size(top_left: Coord, width: u16, height: u16) -> Self {
        let w = i16::try_from(width.max(1) - 1).unwrap_or(i16::MAX);
        let h = i16::try_from(height.max(1) - 1).unwrap_or(i16::MAX);
        Self::new(
            top_left.x,
            top_left.y,
            top_left.x.saturating_add(w),
            top_left.y.saturating_add(h),
        )
    }

    #[inline]
    pub const fn left(&self) -> i16 {
        self.left
    }

    #[inline]
    pub const fn top(&self) -> i16 {
        self.top
    }

    #[inline]
    pub const fn right(&self) -> i16 {
        self.right
    }

    #[inline]
    pub const fn bottom(&self) -> i16 {
        self.bottom
    }

    #[inline]
    pub const fn top_left(&self) -> Coord {
        Coord::new(self.left, self.top)
    }

    #[inline]
    pub const fn bottom_right(&self) -> Coord {
        Coord::new(self.right, self.bottom)
    }

    /// Exclusive horizontal extent, `right - left`.
    #[inline]
    pub fn width(&self) -> i32 {
        i32::from(self.right) - i32::from(self.left)
    }

    /// Exclusive vertical extent, `bottom - top`.
    #[inline]
    pub fn height(&self) -> i32 {
        i32::from(self.bottom) - i32::from(self.top)
    }

    /// Number of columns covered, `width + 1`.
    #[inline]
    pub fn horizontal_span(&self) -> i32 {
        self.width() + 1
    }

    /// Number of rows covered, `height + 1`.
    #[inline]
    pub fn vertical_span(&self) -> i32 {
        self.height() + 1
    }

    /// Inclusive point test.
    #[inline]
    pub fn contains_coord(&self, at: Coord) -> bool {
        at.x >= self.left && at.x <= self.right && at.y >= self.top && at.y <= self.bottom
    }

    /// True when `other` lies entirely within this rect (bounds inclusive).
    #[inline]
    pub fn contains(&self, other: &Rect) -> bool {
        self.contains_coord(other.top_left()) && self.contains_coord(other.bottom_right())
    }

    /// Strict overlap test on open intervals.
    ///
    /// Rects that only share an edge do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// The cells shared by both rects, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);

        if left <= right && top <= bottom {
            Some(Rect { left, top, right, bottom })
        } else {
            None
        }
    }

    /// Smallest rect covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// The same rect shifted by `delta`.
    pub fn translate(&self, delta: Coord) -> Rect {
        Rect::from_corners(self.top_left() + delta, self.bottom_right() + delta)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.top_left(), self.bottom_right())
    }
}

// =============================================================================
// Color
// =============================================================================

/// RGBA color with 8-bit channels (0-255).
///
/// Special value: r=-1 means "terminal default" (let terminal pick),
/// r=-2 marks an ANSI palette entry stored in `g`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: i16,
    pub g: i16,
    pub b: i16,
    pub a: i16,
}

impl Rgba {
    /// Create a new RGBA color.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as i16,
            g: g as i16,
            b: b as i16,
            a: a as i16,
        }
    }

    /// Create an opaque RGB color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Terminal default color (let terminal decide).
    pub const TERMINAL_DEFAULT: Self = Self {
        r: -1,
        g: -1,
        b: -1,
        a: -1,
    };

    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const YELLOW: Self = Self::rgb(255, 255, 0);
    pub const CYAN: Self = Self::rgb(0, 255, 255);
    pub const MAGENTA: Self = Self::rgb(255, 0, 255);
    pub const GRAY: Self = Self::rgb(128, 128, 128);

    /// Create an ANSI palette color (0-255).
    pub const fn ansi(index: u8) -> Self {
        Self {
            r: -2,
            g: index as i16,
            b: 0,
            a: 255,
        }
    }

    #[inline]
    pub const fn is_terminal_default(&self) -> bool {
        self.r == -1
    }

    #[inline]
    pub const fn is_ansi(&self) -> bool {
        self.r == -2
    }

    /// Get ANSI palette index (only valid if is_ansi() returns true).
    #[inline]
    pub const fn ansi_index(&self) -> u8 {
        self.g as u8
    }
}

// =============================================================================
// Cell - The atomic unit of terminal rendering
// =============================================================================

/// A single terminal cell.
///
/// `delay` is a hint in milliseconds that a sink may wait after presenting
/// the cell; zero means render immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub ch: char,
    pub fg: Rgba,
    pub bg: Rgba,
    pub delay: u32,
}

impl Cell {
    pub const fn new(ch: char, fg: Rgba, bg: Rgba) -> Self {
        Self { ch, fg, bg, delay: 0 }
    }

    /// The same cell with a presentation delay hint.
    pub const fn with_delay(self, delay: u32) -> Self {
        Self { delay, ..self }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new(' ', Rgba::TERMINAL_DEFAULT, Rgba::TERMINAL_DEFAULT)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_arithmetic() {
        let a = Coord::new(3, 4);
        let b = Coord::new(1, -2);
        assert_eq!(a + b, Coord::new(4, 2));
        assert_eq!(a - b, Coord::new(2, 6));
        assert_eq!(a * 2, Coord::new(6, 8));
        assert_eq!(-a, Coord::new(-3, -4));
        assert_eq!(a + Coord::ZERO, a);
    }

    #[test]
    fn test_coord_saturates() {
        let edge = Coord::new(i16::MAX, i16::MIN);
        assert_eq!(edge + Coord::new(1, -1), edge);
    }

    #[test]
    fn test_rect_normalizes_on_construction() {
        let r = Rect::new(10, 10, 5, 5);
        assert_eq!(r.top_left(), Coord::new(5, 5));
        assert_eq!(r.bottom_right(), Coord::new(10, 10));
        assert_eq!(r, Rect::from_corners(Coord::new(5, 10), Coord::new(10, 5)));
    }

    #[test]
    fn test_rect_spans() {
        let r = Rect::new(0, 0, 5, 2);
        assert_eq!(r.width(), 5);
        assert_eq!(r.height(), 2);
        assert_eq!(r.horizontal_span(), 6);
        assert_eq!(r.vertical_span(), 3);
    }

    #[test]
    fn test_rect_from_size() {
        let r = Rect::from_size(Coord::new(2, 3), 4, 1);
        assert_eq!(r, Rect::new(2, 3, 5, 3));
        assert_eq!(Rect::from_size(Coord::ZERO, 0, 0), Rect::new(0, 0, 0, 0));
    }

    #[test]
    fn test_rect_contains_coord_is_inclusive() {
        let r = Rect::new(0, 0, 5, 5);
        assert!(r.contains_coord(Coord::new(0, 0)));
        assert!(r.contains_coord(Coord::new(5, 5)));
        assert!(!r.contains_coord(Coord::new(6, 0)));
        assert!(!r.contains_coord(Coord::new(-1, 0)));
    }

    #[test]
    fn test_rect_overlap_excludes_shared_edge() {
        let a = Rect::new(0, 0, 5, 5);
        let touching = Rect::new(5, 0, 9, 5);
        let crossing = Rect::new(4, 4, 9, 9);
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&crossing));
        assert!(crossing.overlaps(&a));
    }

    #[test]
    fn test_rect_intersection_and_union() {
        let a = Rect::new(0, 0, 5, 5);
        let b = Rect::new(5, 3, 9, 9);
        assert_eq!(a.intersection(&b), Some(Rect::new(5, 3, 5, 5)));
        assert_eq!(a.intersection(&Rect::new(6, 6, 7, 7)), None);
        assert_eq!(a.union(&b), Rect::new(0, 0, 9, 9));
    }

    #[test]
    fn test_rect_contains_rect() {
        let outer = Rect::new(0, 0, 10, 10);
        assert!(outer.contains(&Rect::new(0, 0, 10, 10)));
        assert!(outer.contains(&Rect::new(2, 2, 3, 3)));
        assert!(!outer.contains(&Rect::new(2, 2, 11, 3)));
    }

    #[test]
    fn test_rect_translate() {
        let r = Rect::new(1, 1, 3, 3).translate(Coord::new(2, -1));
        assert_eq!(r, Rect::new(3, 0, 5, 2));
    }

    #[test]
    fn test_cell_equality_covers_delay() {
        let a = Cell::new('x', Rgba::WHITE, Rgba::BLACK);
        assert_eq!(a, a);
        assert_ne!(a, a.with_delay(5));
        assert_ne!(a, Cell { ch: 'y', ..a });
        assert_eq!(Cell::default().delay, 0);
    }

    #[test]
    fn test_rgba_special_colors() {
        assert!(Rgba::TERMINAL_DEFAULT.is_terminal_default());
        let palette = Rgba::ansi(42);
        assert!(palette.is_ansi());
        assert_eq!(palette.ansi_index(), 42);
        assert!(!Rgba::RED.is_ansi());
    }
}
