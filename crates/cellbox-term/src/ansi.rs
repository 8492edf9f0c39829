// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. Deciding
// *when* to emit belongs to `CellWriter`; this module only knows the bytes.
//
// Terminal-specific sequences (alternate screen, styles, mouse modes) come
// from the terminfo tables. What lives here is the part every supported
// terminal agrees on: cursor addressing and SGR color selection.
//
// Coordinates are 0-indexed in our API and 1-indexed on the wire.

use std::io::{self, Write};

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` (CUP).
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

// ─── Colors ──────────────────────────────────────────────────────────────────
//
// Inputs are quantized one-based palette values (see `color::quantize`):
// 0 means "terminal default" and emits nothing, N emits palette entry N-1.

/// Select a foreground color.
///
/// Eight-color form is `ESC [ 3 n m`; extended form is `ESC [ 38;5;n m`.
pub fn fg(w: &mut impl Write, value: u16, extended: bool) -> io::Result<()> {
    let n = value.saturating_sub(1);
    if extended {
        write!(w, "\x1b[38;5;{n}m")
    } else {
        write!(w, "\x1b[3{n}m")
    }
}

/// Select a background color.
pub fn bg(w: &mut impl Write, value: u16, extended: bool) -> io::Result<()> {
    let n = value.saturating_sub(1);
    if extended {
        write!(w, "\x1b[48;5;{n}m")
    } else {
        write!(w, "\x1b[4{n}m")
    }
}

/// Select both colors, skipping whichever side is the default.
///
/// In eight-color form both land in one sequence (`ESC [ 3f;4b m`); the
/// extended form has no combined shorthand and emits two.
pub fn colors(w: &mut impl Write, fg_value: u16, bg_value: u16, extended: bool) -> io::Result<()> {
    match (fg_value, bg_value) {
        (0, 0) => Ok(()),
        (f, 0) => fg(w, f, extended),
        (0, b) => bg(w, b, extended),
        (f, b) if extended => {
            fg(w, f, true)?;
            bg(w, b, true)
        }
        (f, b) => write!(w, "\x1b[3{};4{}m", f - 1, b - 1),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
