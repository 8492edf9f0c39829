// SPDX-License-Identifier: MIT
//
// Flush engine — reconcile the back buffer with what the terminal shows.
//
// The renderer owns the front buffer: a copy of every cell as it was last
// physically written. A flush walks the back buffer row by row, skips every
// cell equal to its front counterpart, and for the rest copies back → front
// and hands the cell to the CellWriter, which emits only the SGR and cursor
// sequences that actually change something. All bytes of one flush land in
// one OutputBuffer and go out in a single write.
//
// Wide glyphs advance the walk by two columns. The front cell after a wide
// glyph becomes a continuation so the column the terminal already painted
// is not repainted by a later flush. A wide glyph in the last column has
// nowhere to go and is written as a space.
//
// Control characters in the back buffer are replaced by spaces before
// comparison; they would otherwise move the terminal's cursor.

use std::io::{self, Write};

use crate::ansi;
use crate::buffer::{CellBuffer, display_width};
use crate::cell::{Attribute, Cell};
use crate::color::OutputMode;
use crate::output::{CellWriter, OutputBuffer};
use crate::terminfo::{Func, Terminfo};

// ─── RenderStats ─────────────────────────────────────────────────────────────

/// What one flush pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Cells written to the terminal.
    pub cells_rendered: usize,
    /// Cells equal to the front buffer and skipped.
    pub cells_skipped: usize,
    /// Bytes queued by the pass, cursor placement included.
    pub bytes_written: usize,
}

// ─── DiffRenderer ────────────────────────────────────────────────────────────

/// Front buffer plus the output state needed to update it incrementally.
///
/// ```
/// use cellbox_term::buffer::CellBuffer;
/// use cellbox_term::cell::{Attribute, Cell};
/// use cellbox_term::diff::DiffRenderer;
/// use cellbox_term::terminfo::XTERM;
///
/// let mut renderer = DiffRenderer::new(&XTERM, 10, 2);
/// let mut back = CellBuffer::new(10, 2);
/// back.set(0, 0, Cell::new('x', Attribute::RED, Attribute::DEFAULT));
///
/// let stats = renderer.render(&mut back, None);
/// assert_eq!(stats.cells_rendered, 1);
///
/// let mut sink = Vec::new();
/// renderer.flush_to(&mut sink)?;
/// assert!(sink.ends_with(b"\x1b[1;1Hx"));
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct DiffRenderer {
    front: CellBuffer,
    output: OutputBuffer,
    writer: CellWriter,
    info: &'static Terminfo,
}

impl DiffRenderer {
    /// A renderer whose front buffer is `width × height` default blanks.
    #[must_use]
    pub fn new(info: &'static Terminfo, width: u16, height: u16) -> Self {
        Self {
            front: CellBuffer::new(width, height),
            output: OutputBuffer::new(),
            writer: CellWriter::default(),
            info,
        }
    }

    /// What the renderer believes is on screen.
    #[inline]
    #[must_use]
    pub fn front(&self) -> &CellBuffer {
        &self.front
    }

    /// Resize the front buffer, keeping the overlapping content.
    pub fn resize(&mut self, width: u16, height: u16, blank: Cell) {
        self.front.resize(width, height, blank);
    }

    /// Fill the front buffer with `blank` so the next render repaints every
    /// cell that differs from it.
    pub fn clear_front(&mut self, blank: Cell) {
        self.front.clear(blank);
    }

    /// Change how colors are emitted from now on.
    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.writer.set_mode(mode);
    }

    /// Forget emitted attribute and cursor state.
    pub fn reset_state(&mut self) {
        self.writer.reset_state();
    }

    // ─── Emission ────────────────────────────────────────────────────────

    /// Queue a terminal capability.
    #[inline]
    pub fn write_func(&mut self, func: Func) {
        self.output.push_bytes(self.info.func(func));
    }

    /// Queue a cursor move.
    #[inline]
    pub fn write_cursor(&mut self, x: u16, y: u16) {
        ansi::cursor_to(&mut self.output, x, y).ok();
    }

    /// Queue a full-screen clear painted with `(fg, bg)`.
    ///
    /// The cursor is re-placed afterwards when visible, and the remembered
    /// cursor position is dropped since the clear moved it.
    pub fn send_clear(&mut self, fg: Attribute, bg: Attribute, cursor: Option<(u16, u16)>) {
        self.writer.send_attr(&mut self.output, self.info, fg, bg);
        self.write_func(Func::ClearScreen);
        if let Some((x, y)) = cursor {
            self.write_cursor(x, y);
        }
        self.writer.invalidate_cursor();
    }

    /// Diff `back` against the front buffer and queue the changes.
    ///
    /// `back` must have the front buffer's dimensions. Control characters in
    /// it (C0, DEL and C1) are rewritten to spaces in place.
    pub fn render(&mut self, back: &mut CellBuffer, cursor: Option<(u16, u16)>) -> RenderStats {
        debug_assert_eq!(
            (back.width(), back.height()),
            (self.front.width(), self.front.height())
        );

        let start = self.output.len();
        let mut stats = RenderStats::default();
        self.writer.invalidate_cursor();

        let width = self.front.width().min(back.width());
        let height = self.front.height().min(back.height());
        let stride = usize::from(self.front.width());
        let back_stride = usize::from(back.width());

        for y in 0..height {
            let row = usize::from(y) * stride;
            let back_row = usize::from(y) * back_stride;
            let mut x: u16 = 0;
            while x < width {
                let bi = back_row + usize::from(x);
                let fi = row + usize::from(x);

                let cell = &mut back.cells_mut()[bi];
                if cell.ch.is_control() {
                    cell.ch = ' ';
                }
                let cell = *cell;
                let w = display_width(cell.ch);

                if cell == self.front.cells()[fi] {
                    stats.cells_skipped += 1;
                    x = x.saturating_add(w);
                    continue;
                }

                self.front.cells_mut()[fi] = cell;
                self.writer.send_attr(&mut self.output, self.info, cell.fg, cell.bg);

                if w == 2 && x == width - 1 {
                    self.writer.send_char(&mut self.output, x, y, ' ');
                } else {
                    self.writer.send_char(&mut self.output, x, y, cell.ch);
                    if w == 2 {
                        self.front.cells_mut()[fi + 1] = Cell::continuation(cell.fg, cell.bg);
                    }
                }
                stats.cells_rendered += 1;
                x = x.saturating_add(w);
            }
        }

        if let Some((x, y)) = cursor {
            self.write_cursor(x, y);
        }

        stats.bytes_written = self.output.len() - start;
        stats
    }

    // ─── Output ──────────────────────────────────────────────────────────

    /// Bytes queued and not yet flushed.
    #[must_use]
    pub fn output_bytes(&self) -> &[u8] {
        self.output.as_bytes()
    }

    /// Write all queued bytes to `w` in one call.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        self.output.flush_to(w)
    }

    /// Drop queued bytes without writing them.
    pub fn discard_output(&mut self) {
        self.output.clear();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminfo::XTERM;
    use pretty_assertions::assert_eq;

    const SGR0: &str = "\x1b(B\x1b[m";

    fn setup(width: u16, height: u16) -> (DiffRenderer, CellBuffer) {
        (DiffRenderer::new(&XTERM, width, height), CellBuffer::new(width, height))
    }

    fn flush(r: &mut DiffRenderer, back: &mut CellBuffer, cursor: Option<(u16, u16)>) -> String {
        r.render(back, cursor);
        let mut sink = Vec::new();
        r.flush_to(&mut sink).unwrap();
        String::from_utf8(sink).unwrap()
    }

    // ── Basics ──────────────────────────────────────────────────────────

    #[test]
    fn unchanged_buffer_emits_nothing() {
        let (mut r, mut back) = setup(4, 2);
        assert_eq!(flush(&mut r, &mut back, None), "");
    }

    #[test]
    fn single_cell_change() {
        let (mut r, mut back) = setup(4, 2);
        back.set(2, 1, Cell::new('z', Attribute::GREEN, Attribute::BLACK));
        assert_eq!(flush(&mut r, &mut back, None), format!("{SGR0}\x1b[32;40m\x1b[2;3Hz"));
    }

    #[test]
    fn second_flush_is_empty() {
        let (mut r, mut back) = setup(6, 3);
        for x in 0..6 {
            back.set(x, 1, Cell::new('#', Attribute::YELLOW, Attribute::DEFAULT));
        }
        assert!(!flush(&mut r, &mut back, None).is_empty());
        assert_eq!(flush(&mut r, &mut back, None), "");
        assert_eq!(r.front(), &back);
    }

    #[test]
    fn adjacent_changes_share_attr_and_cursor() {
        let (mut r, mut back) = setup(5, 1);
        for (x, ch) in "abc".chars().enumerate() {
            back.set(x as u16 + 1, 0, Cell::new(ch, Attribute::RED, Attribute::DEFAULT));
        }
        assert_eq!(flush(&mut r, &mut back, None), format!("{SGR0}\x1b[31m\x1b[1;2Habc"));
    }

    #[test]
    fn attribute_change_mid_run() {
        let (mut r, mut back) = setup(3, 1);
        back.set(0, 0, Cell::new('a', Attribute::RED, Attribute::DEFAULT));
        back.set(1, 0, Cell::new('b', Attribute::BLUE, Attribute::DEFAULT));
        assert_eq!(
            flush(&mut r, &mut back, None),
            format!("{SGR0}\x1b[31m\x1b[1;1Ha{SGR0}\x1b[34mb")
        );
    }

    #[test]
    fn stats_count_rendered_and_skipped() {
        let (mut r, mut back) = setup(3, 2);
        back.set(1, 1, Cell::new('q', Attribute::DEFAULT, Attribute::DEFAULT));
        let stats = r.render(&mut back, None);
        assert_eq!(stats.cells_rendered, 1);
        assert_eq!(stats.cells_skipped, 5);
        assert_eq!(stats.bytes_written, r.output_bytes().len());
    }

    // ── Glyph handling ──────────────────────────────────────────────────

    #[test]
    fn control_chars_become_spaces() {
        let (mut r, mut back) = setup(2, 1);
        back.set(0, 0, Cell::new('\n', Attribute::RED, Attribute::DEFAULT));
        let out = flush(&mut r, &mut back, None);
        assert_eq!(out, format!("{SGR0}\x1b[31m\x1b[1;1H "));
        assert_eq!(back.get(0, 0).unwrap().ch, ' ');
    }

    #[test]
    fn del_and_c1_controls_become_spaces() {
        let (mut r, mut back) = setup(4, 1);
        back.set(0, 0, Cell::new('\u{7f}', Attribute::RED, Attribute::DEFAULT));
        back.set(1, 0, Cell::new('b', Attribute::RED, Attribute::DEFAULT));
        back.set(2, 0, Cell::new('\u{9b}', Attribute::RED, Attribute::DEFAULT));
        let out = flush(&mut r, &mut back, None);
        assert_eq!(out, format!("{SGR0}\x1b[31m\x1b[1;1H b "));
        assert!(!out.contains('\u{7f}'));
        assert!(!out.contains('\u{9b}'));
    }

    #[test]
    fn wide_glyph_marks_continuation() {
        let (mut r, mut back) = setup(4, 1);
        back.set(1, 0, Cell::new('中', Attribute::CYAN, Attribute::DEFAULT));
        let out = flush(&mut r, &mut back, None);
        assert_eq!(out, format!("{SGR0}\x1b[36m\x1b[1;2H中"));
        let cont = r.front().get(2, 0).unwrap();
        assert!(cont.is_continuation());
        assert_eq!(cont.fg, Attribute::CYAN);
    }

    #[test]
    fn wide_glyph_skips_its_second_column() {
        let (mut r, mut back) = setup(4, 1);
        back.set(0, 0, Cell::new('中', Attribute::DEFAULT, Attribute::DEFAULT));
        // Hidden under the wide glyph, never compared.
        back.set(1, 0, Cell::new('x', Attribute::DEFAULT, Attribute::DEFAULT));
        let stats = r.render(&mut back, None);
        assert_eq!(stats.cells_rendered, 1);
        assert!(!String::from_utf8_lossy(r.output_bytes()).contains('x'));
    }

    #[test]
    fn wide_glyph_in_last_column_becomes_space() {
        let (mut r, mut back) = setup(3, 1);
        back.set(2, 0, Cell::new('中', Attribute::DEFAULT, Attribute::RED));
        let out = flush(&mut r, &mut back, None);
        assert_eq!(out, format!("{SGR0}\x1b[41m\x1b[1;3H "));
        // Front remembers the requested glyph so the next flush is quiet.
        assert_eq!(r.front().get(2, 0).unwrap().ch, '中');
        assert_eq!(flush(&mut r, &mut back, None), "");
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    #[test]
    fn visible_cursor_placed_after_cells() {
        let (mut r, mut back) = setup(4, 4);
        back.set(0, 0, Cell::new('a', Attribute::DEFAULT, Attribute::DEFAULT));
        let out = flush(&mut r, &mut back, Some((3, 2)));
        assert!(out.ends_with("a\x1b[3;4H"));
    }

    #[test]
    fn visible_cursor_rewritten_on_quiet_flush() {
        let (mut r, mut back) = setup(4, 4);
        assert_eq!(flush(&mut r, &mut back, Some((1, 1))), "\x1b[2;2H");
    }

    #[test]
    fn each_render_replaces_first_glyph() {
        let (mut r, mut back) = setup(3, 1);
        back.set(0, 0, Cell::new('a', Attribute::DEFAULT, Attribute::DEFAULT));
        flush(&mut r, &mut back, None);
        back.set(1, 0, Cell::new('b', Attribute::DEFAULT, Attribute::DEFAULT));
        // The terminal cursor is after 'a', but a new flush never trusts it.
        assert_eq!(flush(&mut r, &mut back, None), "\x1b[1;2Hb");
    }

    // ── Clear & resize ──────────────────────────────────────────────────

    #[test]
    fn send_clear_paints_colors_then_clears() {
        let mut r = DiffRenderer::new(&XTERM, 2, 2);
        r.send_clear(Attribute::WHITE, Attribute::BLUE, None);
        assert_eq!(
            String::from_utf8(r.output_bytes().to_vec()).unwrap(),
            format!("{SGR0}\x1b[37;44m\x1b[H\x1b[2J")
        );
    }

    #[test]
    fn send_clear_restores_visible_cursor() {
        let mut r = DiffRenderer::new(&XTERM, 2, 2);
        r.send_clear(Attribute::DEFAULT, Attribute::DEFAULT, Some((1, 0)));
        assert!(r.output_bytes().ends_with(b"\x1b[H\x1b[2J\x1b[1;2H"));
    }

    #[test]
    fn cleared_front_repaints_everything_that_differs() {
        let (mut r, mut back) = setup(3, 1);
        back.clear(Cell::new('.', Attribute::DEFAULT, Attribute::DEFAULT));
        flush(&mut r, &mut back, None);
        r.clear_front(Cell::EMPTY);
        let stats = r.render(&mut back, None);
        assert_eq!(stats.cells_rendered, 3);
    }

    #[test]
    fn resize_keeps_front_overlap() {
        let (mut r, mut back) = setup(3, 1);
        back.set(0, 0, Cell::new('k', Attribute::DEFAULT, Attribute::DEFAULT));
        flush(&mut r, &mut back, None);
        r.resize(5, 2, Cell::EMPTY);
        assert_eq!(r.front().get(0, 0).unwrap().ch, 'k');
        assert_eq!(r.front().width(), 5);
    }

    #[test]
    fn extended_mode_flush() {
        let (mut r, mut back) = setup(1, 1);
        r.set_output_mode(OutputMode::Color216);
        back.set(0, 0, Cell::new('c', Attribute::color_index(1), Attribute::DEFAULT));
        assert_eq!(flush(&mut r, &mut back, None), format!("{SGR0}\x1b[38;5;16m\x1b[1;1Hc"));
    }
}
