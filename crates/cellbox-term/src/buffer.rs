// SPDX-License-Identifier: MIT
//
// Cell buffer — a flat, row-major grid of cells.
//
// Each session owns two of these: the back buffer (what the application asked
// for) and the front buffer (what was last physically written). Both are
// plain `Vec<Cell>` with `width × height` entries so the flush engine can walk
// them with simple offset arithmetic.
//
// Resizing keeps the overlapping top-left rectangle of the old content and
// fills everything newly exposed with the caller's blank cell, so a window
// that grows does not lose what was already drawn.

use unicode_width::UnicodeWidthChar;

use crate::cell::Cell;

// ─── CellBuffer ──────────────────────────────────────────────────────────────

/// A 2D grid of cells stored row-major.
///
/// ```
/// use cellbox_term::buffer::CellBuffer;
/// use cellbox_term::cell::{Attribute, Cell};
///
/// let mut buf = CellBuffer::new(80, 24);
/// buf.set(5, 3, Cell::new('X', Attribute::RED, Attribute::DEFAULT));
/// assert_eq!(buf.get(5, 3).map(|c| c.ch), Some('X'));
/// assert!(buf.get(80, 0).is_none());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct CellBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl CellBuffer {
    // ─── Construction ────────────────────────────────────────────────────

    /// Allocate a grid of default blank cells.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; area(width, height)],
        }
    }

    /// Reallocate to `width × height`, discarding all content.
    pub fn init(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.resize(area(width, height), Cell::EMPTY);
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    /// Width in columns.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Height in rows.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Whether `(x, y)` lies inside the grid.
    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// The cell at `(x, y)`, or `None` outside the grid.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// Mutable access to the cell at `(x, y)`.
    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// Bounds-checked write. Returns `false` (and changes nothing) when
    /// `(x, y)` is outside the grid.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        match self.get_mut(x, y) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// All cells, row-major.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// All cells, row-major, mutably.
    #[inline]
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// One row as a slice, or `None` if `y` is out of bounds.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y < self.height {
            let start = self.index(0, y);
            Some(&self.cells[start..start + usize::from(self.width)])
        } else {
            None
        }
    }

    // ─── Clear & Resize ──────────────────────────────────────────────────

    /// Fill every cell with `blank`.
    pub fn clear(&mut self, blank: Cell) {
        self.cells.fill(blank);
    }

    /// Change dimensions, keeping the overlapping top-left content.
    ///
    /// No-op when the size is unchanged. Otherwise the grid is reallocated,
    /// filled with `blank`, and the `min(old, new)` rectangle is copied back
    /// row by row.
    pub fn resize(&mut self, width: u16, height: u16, blank: Cell) {
        if self.width == width && self.height == height {
            return;
        }

        let old_width = usize::from(self.width);
        let old = std::mem::replace(&mut self.cells, vec![blank; area(width, height)]);
        let keep_w = usize::from(self.width.min(width));
        let keep_h = usize::from(self.height.min(height));
        self.width = width;
        self.height = height;

        let new_width = usize::from(width);
        for row in 0..keep_h {
            let src = row * old_width;
            let dst = row * new_width;
            self.cells[dst..dst + keep_w].copy_from_slice(&old[src..src + keep_w]);
        }
    }
}

impl std::fmt::Debug for CellBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CellBuffer({}x{})", self.width, self.height)
    }
}

#[inline]
fn area(width: u16, height: u16) -> usize {
    usize::from(width) * usize::from(height)
}

// ─── Glyph Width ─────────────────────────────────────────────────────────────

/// Columns a glyph occupies when flushed: 2 for wide glyphs, 1 otherwise.
///
/// Zero-width and control characters count as 1 because the flush engine
/// always writes *something* into the cell. East Asian ambiguous-width
/// characters are treated as narrow.
///
/// ```
/// use cellbox_term::buffer::display_width;
///
/// assert_eq!(display_width('a'), 1);
/// assert_eq!(display_width('中'), 2);
/// assert_eq!(display_width('\u{301}'), 1);
/// ```
#[inline]
#[must_use]
pub fn display_width(ch: char) -> u16 {
    match ch.width() {
        Some(2) => 2,
        _ => 1,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
