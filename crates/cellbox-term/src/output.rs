// SPDX-License-Identifier: MIT
//
// Output buffering and stateful cell emission.
//
// Two components work together to minimize terminal I/O:
//
//   OutputBuffer: accumulates every byte of a flush in memory so the whole
//   frame goes out in a single write.
//
//   CellWriter: remembers the last attribute pair and the last cursor
//   position it emitted. Runs of cells with the same colors get one SGR
//   sequence; runs of horizontally adjacent cells get one cursor move.
//
// Attribute changes always start with the terminal's sgr0 so styles from the
// previous pair (bold, underline, reverse) never leak into the next one.

use std::io::{self, Write};

use crate::ansi;
use crate::cell::Attribute;
use crate::color::{OutputMode, quantize};
use crate::terminfo::{Func, Terminfo};

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that accumulates one flush worth of output.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    /// Create an empty buffer with default capacity (16 KB).
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append raw bytes.
    #[inline]
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a glyph as UTF-8.
    #[inline]
    pub fn push_char(&mut self, ch: char) {
        let mut enc = [0u8; 4];
        self.buf.extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
    }

    /// Drop everything accumulated (keeps capacity).
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write accumulated output to `w` in one call and clear the buffer.
    ///
    /// The buffer is cleared even when the write fails, so a broken sink does
    /// not make later flushes grow without bound.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = w.write_all(&self.buf).and_then(|()| w.flush());
        self.buf.clear();
        result
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// Cursor coordinate meaning "position unknown".
const COORD_INVALID: i32 = -2;

/// Stateful emitter that skips redundant SGR and cursor sequences.
///
/// - **Attributes**: emitted only when the `(fg, bg)` pair differs from the
///   last one written. Each change is `sgr0`, then colors, then styles.
/// - **Cursor**: skipped when the next glyph lands right after the last one
///   on the same row, since the terminal advanced there by itself.
#[allow(clippy::struct_field_names)]
pub struct CellWriter {
    last_attr: Option<(Attribute, Attribute)>,
    last_x: i32,
    last_y: i32,
    mode: OutputMode,
}

impl CellWriter {
    /// A writer with no tracked state emitting in `mode`.
    #[must_use]
    pub const fn new(mode: OutputMode) -> Self {
        Self {
            last_attr: None,
            last_x: COORD_INVALID,
            last_y: COORD_INVALID,
            mode,
        }
    }

    /// Switch output mode. The remembered attribute pair is dropped because
    /// the same pair renders differently under another mode.
    pub fn set_mode(&mut self, mode: OutputMode) {
        if mode != self.mode {
            self.mode = mode;
            self.last_attr = None;
        }
    }

    /// Forget the cursor position so the next glyph is explicitly placed.
    #[inline]
    pub fn invalidate_cursor(&mut self) {
        self.last_x = COORD_INVALID;
        self.last_y = COORD_INVALID;
    }

    /// Forget everything except the output mode.
    pub fn reset_state(&mut self) {
        *self = Self::new(self.mode);
    }

    /// Emit the SGR state for `(fg, bg)` unless it is already active.
    pub fn send_attr(&mut self, out: &mut OutputBuffer, info: &Terminfo, fg: Attribute, bg: Attribute) {
        if self.last_attr == Some((fg, bg)) {
            return;
        }

        out.push_bytes(info.func(Func::Sgr0));

        let extended = self.mode.is_extended();
        ansi::colors(out, quantize(fg, self.mode), quantize(bg, self.mode), extended).ok();

        if fg.contains(Attribute::BOLD) {
            out.push_bytes(info.func(Func::Bold));
        }
        if bg.contains(Attribute::BOLD) {
            out.push_bytes(info.func(Func::Blink));
        }
        if fg.contains(Attribute::UNDERLINE) {
            out.push_bytes(info.func(Func::Underline));
        }
        if fg.intersects(Attribute::REVERSE) || bg.intersects(Attribute::REVERSE) {
            out.push_bytes(info.func(Func::Reverse));
        }

        self.last_attr = Some((fg, bg));
    }

    /// Emit `ch` at `(x, y)`, moving the cursor only when needed.
    pub fn send_char(&mut self, out: &mut OutputBuffer, x: u16, y: u16, ch: char) {
        let xi = i32::from(x);
        let yi = i32::from(y);
        if xi - 1 != self.last_x || yi != self.last_y {
            ansi::cursor_to(out, x, y).ok();
        }
        self.last_x = xi;
        self.last_y = yi;
        out.push_char(ch);
    }
}

impl Default for CellWriter {
    fn default() -> Self {
        Self::new(OutputMode::Normal)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
