// SPDX-License-Identifier: MIT
//
// Cell — the atomic unit of terminal rendering.
//
// Every character position on screen is a Cell: one glyph, a foreground
// attribute and a background attribute. The back buffer holds the cells the
// application asked for, the front buffer holds the cells last written to
// the terminal, and the flush engine exists to reconcile the two.
//
// Attributes are mode-agnostic. An `Attribute` is a color index
// plus style bits, and what the index *means* (8 colors, 256, the 216-color
// cube, 26 grays) is only decided at render time by the active output mode.
// Nothing mode-specific is stored per cell.
//
// Wide characters (CJK, some emoji) occupy two columns. In the front buffer
// the column after a wide glyph holds a continuation cell (ch = '\0') so the
// next flush does not redundantly repaint it.

use std::ops::{BitOr, BitOrAssign};

// ─── Attribute ───────────────────────────────────────────────────────────────

/// Color index plus style bits for one side (foreground or background) of a cell.
///
/// The low 9 bits carry the color index, `0` being the terminal's default
/// color. Bits 9–11 carry bold, underline and reverse. Combine with `|`:
///
/// ```
/// use cellbox_term::cell::Attribute;
///
/// let fg = Attribute::RED | Attribute::BOLD;
/// assert_eq!(fg.color(), Attribute::RED.color());
/// assert!(fg.contains(Attribute::BOLD));
/// assert!(!fg.contains(Attribute::UNDERLINE));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Attribute(u16);

/// Bits of an [`Attribute`] that select a color.
const COLOR_MASK: u16 = 0x01FF;

impl Attribute {
    /// The terminal's default color, no styles.
    pub const DEFAULT: Self = Self(0);
    pub const BLACK: Self = Self(1);
    pub const RED: Self = Self(2);
    pub const GREEN: Self = Self(3);
    pub const YELLOW: Self = Self(4);
    pub const BLUE: Self = Self(5);
    pub const MAGENTA: Self = Self(6);
    pub const CYAN: Self = Self(7);
    pub const WHITE: Self = Self(8);

    /// Bold on a foreground; blink on a background.
    pub const BOLD: Self = Self(1 << 9);
    /// Underline (foreground only).
    pub const UNDERLINE: Self = Self(1 << 10);
    /// Swap foreground and background.
    pub const REVERSE: Self = Self(1 << 11);

    /// An attribute selecting palette entry `index` with no styles.
    ///
    /// Indices wider than 9 bits are truncated.
    #[inline]
    #[must_use]
    pub const fn color_index(index: u16) -> Self {
        Self(index & COLOR_MASK)
    }

    /// The raw 16-bit encoding.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// The color index, with style bits stripped. `0` is the default color.
    #[inline]
    #[must_use]
    pub const fn color(self) -> u16 {
        self.0 & COLOR_MASK
    }

    /// Whether every bit of `other` is set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether this attribute and `other` share any bit.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Attribute {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Attribute {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single terminal cell.
///
/// Equality is structural and is exactly what the flush engine uses to
/// decide whether a position changed since the last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Glyph to display. `'\0'` marks a wide-glyph continuation.
    pub ch: char,
    /// Foreground color and styles.
    pub fg: Attribute,
    /// Background color and styles.
    pub bg: Attribute,
}

/// Continuation marker for the second column of a wide glyph.
const CONTINUATION: char = '\0';

impl Cell {
    /// Space on default colors.
    pub const EMPTY: Self = Self::blank(Attribute::DEFAULT, Attribute::DEFAULT);

    /// Create a cell.
    #[inline]
    #[must_use]
    pub const fn new(ch: char, fg: Attribute, bg: Attribute) -> Self {
        Self { ch, fg, bg }
    }

    /// A space painted with the given colors.
    #[inline]
    #[must_use]
    pub const fn blank(fg: Attribute, bg: Attribute) -> Self {
        Self { ch: ' ', fg, bg }
    }

    /// The second half of a wide glyph, inheriting its colors.
    #[inline]
    #[must_use]
    pub const fn continuation(fg: Attribute, bg: Attribute) -> Self {
        Self {
            ch: CONTINUATION,
            fg,
            bg,
        }
    }

    /// Whether this is a continuation cell.
    #[inline]
    #[must_use]
    pub const fn is_continuation(self) -> bool {
        self.ch == CONTINUATION
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_attribute_is_zero() {
        assert_eq!(Attribute::DEFAULT.bits(), 0);
        assert_eq!(Attribute::default(), Attribute::DEFAULT);
    }

    #[test]
    fn named_colors_are_one_based() {
        assert_eq!(Attribute::BLACK.color(), 1);
        assert_eq!(Attribute::WHITE.color(), 8);
    }

    #[test]
    fn styles_do_not_touch_color() {
        let a = Attribute::BLUE | Attribute::BOLD | Attribute::UNDERLINE | Attribute::REVERSE;
        assert_eq!(a.color(), Attribute::BLUE.color());
        assert!(a.contains(Attribute::BOLD));
        assert!(a.contains(Attribute::UNDERLINE));
        assert!(a.contains(Attribute::REVERSE));
    }

    #[test]
    fn color_index_truncates_to_nine_bits() {
        assert_eq!(Attribute::color_index(256).color(), 256);
        assert_eq!(Attribute::color_index(0x0400).color(), 0);
        assert!(!Attribute::color_index(0x0400).contains(Attribute::UNDERLINE));
    }

    #[test]
    fn bitor_assign_accumulates() {
        let mut a = Attribute::GREEN;
        a |= Attribute::REVERSE;
        assert!(a.intersects(Attribute::REVERSE));
        assert!(!a.intersects(Attribute::BOLD));
    }

    #[test]
    fn cell_equality_is_structural() {
        let a = Cell::new('x', Attribute::RED, Attribute::BLACK);
        assert_eq!(a, Cell::new('x', Attribute::RED, Attribute::BLACK));
        assert_ne!(a, Cell::new('x', Attribute::RED | Attribute::BOLD, Attribute::BLACK));
        assert_ne!(a, Cell::new('y', Attribute::RED, Attribute::BLACK));
    }

    #[test]
    fn empty_cell_is_default_space() {
        assert_eq!(Cell::EMPTY, Cell::default());
        assert_eq!(Cell::EMPTY.ch, ' ');
    }

    #[test]
    fn continuation_keeps_colors() {
        let c = Cell::continuation(Attribute::CYAN, Attribute::MAGENTA);
        assert!(c.is_continuation());
        assert_eq!(c.fg, Attribute::CYAN);
        assert!(!Cell::blank(Attribute::CYAN, Attribute::MAGENTA).is_continuation());
    }
}
