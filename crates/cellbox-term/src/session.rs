// SPDX-License-Identifier: MIT
//
// Session — the client-facing terminal object.
//
// A session is constructed inert. `init` acquires the controlling tty,
// switches it to raw mode and starts the background reader; `close` undoes
// all of it and leaves the session inert again, ready for another `init`.
// `headless` builds a live session with no tty at all: output goes to any
// writer and input comes from a `Feeder`.
//
// Rendering is double-buffered. Callers draw into the back buffer with
// `set_cell` / `clear`; `flush` diffs it against the front buffer and
// writes the changes in one write. Window resizes reach the render side
// as a coalesced notification that `clear` and `flush` apply before doing
// their own work, so both buffers always share one size.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, bounded};
use tracing::{debug, info, trace, warn};

use crate::buffer::CellBuffer;
use crate::cell::{Attribute, Cell};
use crate::color::OutputMode;
use crate::config::Config;
use crate::diff::DiffRenderer;
use crate::error::{Error, Result};
use crate::input::{Decoded, Decoder, Event, InputMode};
use crate::pipeline::{Feeder, InputPipeline, Interrupter, Link};
use crate::reader::{ReaderChannels, TtyReader};
use crate::signal::SignalGuard;
use crate::terminal::{Size, Terminal};
use crate::terminfo::{Func, Terminfo, XTERM};

// ─── Backend ────────────────────────────────────────────────────────────────

/// Where a live session's bytes go and where its size comes from.
enum Backend {
    Tty {
        // Field order is drop order: reader and signals go before the
        // terminal restores termios.
        reader: TtyReader,
        signals: SignalGuard,
        terminal: Terminal,
        resize_rx: Receiver<()>,
    },
    Headless {
        sink: Box<dyn Write + Send>,
        size: Arc<Mutex<Size>>,
        resize_rx: Receiver<()>,
    },
}

impl Backend {
    fn query_size(&self) -> Size {
        match self {
            Self::Tty { terminal, .. } => terminal.size(),
            Self::Headless { size, .. } => *size.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Take at most one pending resize notification.
    fn resize_pending(&self) -> bool {
        match self {
            Self::Tty { resize_rx, .. } | Self::Headless { resize_rx, .. } => resize_rx.try_recv().is_ok(),
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Tty { terminal, .. } => terminal.writer(),
            Self::Headless { sink, .. } => &mut **sink,
        }
    }
}

// ─── Session ────────────────────────────────────────────────────────────────

/// A terminal session: two cell buffers, the flush engine and the event
/// pipeline, bound to one terminal while active.
pub struct Session {
    config: Config,
    decoder: Decoder,
    back: CellBuffer,
    renderer: DiffRenderer,
    input_mode: InputMode,
    output_mode: OutputMode,
    foreground: Attribute,
    background: Attribute,
    /// `None` while the cursor is hidden.
    cursor: Option<(u16, u16)>,
    pipeline: InputPipeline,
    size: Size,
    backend: Option<Backend>,
}

impl Session {
    /// An inert session. Nothing touches the terminal until [`init`](Self::init).
    #[must_use]
    pub fn new(config: Config) -> Self {
        let output_mode = match config.output_mode {
            OutputMode::Current => OutputMode::Normal,
            mode => mode,
        };
        Self {
            decoder: Decoder::new(&XTERM),
            back: CellBuffer::new(0, 0),
            renderer: DiffRenderer::new(&XTERM, 0, 0),
            input_mode: config.input_mode(),
            output_mode,
            foreground: Attribute::DEFAULT,
            background: Attribute::DEFAULT,
            cursor: None,
            pipeline: InputPipeline::new(config.escape_timeout()),
            size: Size::default(),
            backend: None,
            config,
        }
    }

    /// A live session that renders into `sink` and reads from the returned
    /// [`Feeder`].
    ///
    /// The terminal vocabulary is `config.term` if set, else xterm; the
    /// environment is not consulted.
    ///
    /// # Errors
    ///
    /// Returns an error if the start-up sequence cannot be written to `sink`.
    pub fn headless(config: Config, size: Size, sink: impl Write + Send + 'static) -> Result<(Self, Feeder)> {
        let info = match config.term.as_deref().filter(|t| !t.is_empty()) {
            Some(term) => Terminfo::detect(term)?,
            None => &XTERM,
        };
        let mut session = Self::new(config);

        let shared = Arc::new(Mutex::new(size));
        let (render_tx, render_rx) = bounded(1);
        let (feeder, link) = Feeder::pair(Arc::clone(&shared), vec![render_tx]);

        let mut sink: Box<dyn Write + Send> = Box::new(sink);
        session.enter(info, size, &mut sink)?;

        session.pipeline.connect(link);
        session.backend = Some(Backend::Headless {
            sink,
            size: shared,
            resize_rx: render_rx,
        });
        debug!(terminfo = info.name, cols = size.cols, rows = size.rows, "headless session started");
        Ok((session, feeder))
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────

    /// Acquire the terminal: open the device, enter raw mode and the
    /// alternate screen, and start reading input.
    ///
    /// Everything acquired is released again if a step fails, and a
    /// failed start-up sequence is followed by a best-effort exit sequence.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyInitialized`] on a live session, [`Error::TermNotSet`]
    /// without a terminal type, or the error of the step that failed.
    pub fn init(&mut self) -> Result<()> {
        if self.backend.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        let term = self.config.term_name().ok_or(Error::TermNotSet)?;
        let info = Terminfo::detect(&term)?;
        let mut terminal = Terminal::open(&self.config.tty_path)?;

        let (ready_tx, ready_rx) = bounded(1);
        let (poll_resize_tx, poll_resize_rx) = bounded(1);
        let (render_resize_tx, render_resize_rx) = bounded(1);
        let signals = SignalGuard::install(ready_tx, vec![poll_resize_tx, render_resize_tx])?;

        terminal.enable_async_input()?;
        terminal.enable_raw_mode()?;

        let (input_tx, input_rx) = bounded(0);
        let (return_tx, return_rx) = bounded(0);
        let channels = ReaderChannels {
            ready: ready_rx,
            input: input_tx,
            returned: return_rx,
        };
        let reader = TtyReader::spawn(terminal.input()?, channels, self.config.read_buffer_size)?;

        let size = terminal.size();
        self.enter(info, size, terminal.writer())?;

        self.pipeline.connect(Link {
            input: input_rx,
            returned: return_tx,
            resize: poll_resize_rx,
        });
        self.backend = Some(Backend::Tty {
            reader,
            signals,
            terminal,
            resize_rx: render_resize_rx,
        });

        info!(
            term = %term,
            terminfo = info.name,
            cols = size.cols,
            rows = size.rows,
            "terminal session started"
        );
        Ok(())
    }

    /// Restore the terminal and stop reading. The session becomes inert.
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`] on an inert session, or the first error
    /// from writing the exit sequence or restoring termios. The session is
    /// inert afterwards either way.
    pub fn close(&mut self) -> Result<()> {
        let backend = self.backend.take().ok_or(Error::NotInitialized)?;
        self.pipeline.disconnect();
        self.queue_exit();

        let result = match backend {
            Backend::Tty {
                mut reader,
                signals,
                mut terminal,
                ..
            } => {
                reader.stop();
                drop(signals);
                let written = self.renderer.flush_to(terminal.writer()).map_err(Error::from);
                let restored = terminal.restore();
                written.and(restored)
            }
            Backend::Headless { mut sink, .. } => self.renderer.flush_to(&mut sink).map_err(Error::from),
        };

        self.reset();

        info!("terminal session closed");
        result
    }

    /// Whether the session is bound to a terminal.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.backend.is_some()
    }

    /// Set up drawing state for `size` and write the start-up sequence to
    /// `out`. On failure the exit sequence is attempted and the drawing
    /// state is reset, so nothing reports a live terminal.
    fn enter(&mut self, info: &'static Terminfo, size: Size, out: &mut impl Write) -> Result<()> {
        self.begin(info, size);
        let Err(err) = self.renderer.flush_to(out) else {
            return Ok(());
        };
        warn!(%err, "failed to write the start-up sequence");
        self.renderer.discard_output();
        self.queue_exit();
        if let Err(err) = self.renderer.flush_to(out) {
            debug!(%err, "failed to write the exit sequence");
        }
        self.renderer.discard_output();
        self.reset();
        Err(err.into())
    }

    /// Reset drawing state for a fresh terminal and queue the start-up
    /// sequence.
    fn begin(&mut self, info: &'static Terminfo, size: Size) {
        self.decoder = Decoder::new(info);
        self.size = size;
        self.cursor = None;

        let blank = self.blank();
        self.back = CellBuffer::new(size.cols, size.rows);
        self.back.clear(blank);
        self.renderer = DiffRenderer::new(info, size.cols, size.rows);
        self.renderer.set_output_mode(self.output_mode);
        self.renderer.clear_front(blank);

        for func in [Func::EnterCa, Func::EnterKeypad, Func::HideCursor, Func::ClearScreen] {
            self.renderer.write_func(func);
        }
        if self.input_mode.contains(InputMode::MOUSE) {
            self.renderer.write_func(Func::EnterMouse);
        }
    }

    fn queue_exit(&mut self) {
        for func in [
            Func::ShowCursor,
            Func::Sgr0,
            Func::ClearScreen,
            Func::ExitCa,
            Func::ExitKeypad,
            Func::ExitMouse,
        ] {
            self.renderer.write_func(func);
        }
    }

    /// Back to the state of a fresh inert session.
    fn reset(&mut self) {
        self.input_mode = self.config.input_mode();
        self.foreground = Attribute::DEFAULT;
        self.background = Attribute::DEFAULT;
        self.cursor = None;
        self.size = Size::default();
        self.back = CellBuffer::new(0, 0);
        self.renderer.resize(0, 0, Cell::EMPTY);
        self.renderer.reset_state();
    }

    // ─── Drawing ────────────────────────────────────────────────────────

    /// Put one cell in the back buffer. Coordinates outside the buffer are
    /// ignored.
    pub fn set_cell(&mut self, x: i32, y: i32, ch: char, fg: Attribute, bg: Attribute) {
        let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) else {
            return;
        };
        self.back.set(x, y, Cell::new(ch, fg, bg));
    }

    /// The back buffer.
    #[inline]
    #[must_use]
    pub fn cell_buffer(&self) -> &CellBuffer {
        &self.back
    }

    /// The back buffer's cells, row-major, for bulk drawing. The grid
    /// itself cannot be resized from here.
    #[inline]
    pub fn cell_buffer_mut(&mut self) -> &mut [Cell] {
        self.back.cells_mut()
    }

    /// Set the default colors and blank the back buffer with them.
    ///
    /// # Errors
    ///
    /// Returns an error if a pending resize repaint cannot be written.
    pub fn clear(&mut self, fg: Attribute, bg: Attribute) -> Result<()> {
        self.foreground = fg;
        self.background = bg;
        self.update_size_maybe();
        self.back.clear(self.blank());
        self.write_output()
    }

    /// Write every back-buffer cell that differs from the screen.
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`] on an inert session, or the write error.
    pub fn flush(&mut self) -> Result<()> {
        if self.backend.is_none() {
            return Err(Error::NotInitialized);
        }
        self.update_size_maybe();
        let stats = self.renderer.render(&mut self.back, self.cursor);
        trace!(
            rendered = stats.cells_rendered,
            skipped = stats.cells_skipped,
            bytes = stats.bytes_written,
            "flush"
        );
        self.write_output()
    }

    /// Forget what is on screen and repaint everything.
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`] on an inert session, or the write error.
    pub fn sync(&mut self) -> Result<()> {
        if self.backend.is_none() {
            return Err(Error::NotInitialized);
        }
        self.renderer.clear_front(self.blank());
        self.renderer.send_clear(self.foreground, self.background, self.cursor);
        self.flush()
    }

    /// Show the cursor at `(x, y)` from the next flush on.
    pub fn set_cursor(&mut self, x: u16, y: u16) {
        if self.backend.is_some() {
            if self.cursor.is_none() {
                self.renderer.write_func(Func::ShowCursor);
            }
            self.renderer.write_cursor(x, y);
        }
        self.cursor = Some((x, y));
    }

    /// Hide the cursor from the next flush on.
    pub fn hide_cursor(&mut self) {
        if self.backend.is_some() && self.cursor.is_some() {
            self.renderer.write_func(Func::HideCursor);
        }
        self.cursor = None;
    }

    fn blank(&self) -> Cell {
        Cell::blank(self.foreground, self.background)
    }

    /// Apply at most one pending resize: both buffers take the new size,
    /// the front buffer is blanked and a full clear is queued.
    fn update_size_maybe(&mut self) {
        let Some(backend) = &self.backend else {
            return;
        };
        if !backend.resize_pending() {
            return;
        }
        let size = backend.query_size();
        if size == self.size {
            return;
        }

        debug!(
            from_cols = self.size.cols,
            from_rows = self.size.rows,
            cols = size.cols,
            rows = size.rows,
            "applying resize"
        );
        self.size = size;
        let blank = self.blank();
        self.back.resize(size.cols, size.rows, blank);
        self.renderer.resize(size.cols, size.rows, blank);
        self.renderer.clear_front(blank);
        self.renderer.send_clear(self.foreground, self.background, self.cursor);
    }

    /// Write queued bytes, if any, to the backend.
    fn write_output(&mut self) -> Result<()> {
        if self.renderer.output_bytes().is_empty() {
            return Ok(());
        }
        let Some(backend) = self.backend.as_mut() else {
            self.renderer.discard_output();
            return Err(Error::NotInitialized);
        };
        self.renderer.flush_to(&mut backend.writer())?;
        Ok(())
    }

    // ─── Events ─────────────────────────────────────────────────────────

    /// Block until the next event.
    ///
    /// Failures are reported as [`Event::Error`], never as a panic.
    pub fn poll_event(&mut self) -> Event {
        let Some(backend) = &self.backend else {
            return Event::Error(Arc::new(Error::NotInitialized));
        };
        self.pipeline
            .poll(&self.decoder, self.input_mode, &mut || backend.query_size())
    }

    /// Block until input arrives and copy it undecoded into `data`.
    pub fn poll_raw_event(&mut self, data: &mut [u8]) -> Event {
        let Some(backend) = &self.backend else {
            return Event::Error(Arc::new(Error::NotInitialized));
        };
        self.pipeline.poll_raw(data, &mut || backend.query_size())
    }

    /// Decode one event from `data` without waiting for more bytes.
    ///
    /// Returns the event and the bytes it used. When nothing decodes the
    /// event is [`Event::None`] and the count is the number of bytes that
    /// can be skipped (possibly zero).
    #[must_use]
    pub fn parse_event(&self, data: &[u8]) -> (Event, usize) {
        match self.decoder.decode_settled(data, self.input_mode) {
            Decoded::Event(event, n) => (event, n),
            Decoded::Incomplete => (Event::None, 0),
            Decoded::Malformed(n) => (Event::None, n),
        }
    }

    /// A handle that wakes a blocked [`poll_event`](Self::poll_event) from
    /// another thread.
    #[must_use]
    pub fn interrupter(&self) -> Interrupter {
        self.pipeline.interrupter()
    }

    // ─── Modes ──────────────────────────────────────────────────────────

    /// Change how input is decoded; [`InputMode::CURRENT`] only queries.
    ///
    /// Returns the mode now in effect. Mouse reporting is switched on the
    /// terminal right away.
    pub fn set_input_mode(&mut self, mode: InputMode) -> InputMode {
        if mode == InputMode::CURRENT {
            return self.input_mode;
        }
        let mode = mode.normalized();
        if self.backend.is_some() {
            self.renderer.write_func(if mode.contains(InputMode::MOUSE) {
                Func::EnterMouse
            } else {
                Func::ExitMouse
            });
            if let Err(err) = self.write_output() {
                warn!(%err, "failed to switch mouse reporting");
            }
        }
        self.input_mode = mode;
        mode
    }

    /// Change how colors are emitted; [`OutputMode::Current`] only queries.
    pub fn set_output_mode(&mut self, mode: OutputMode) -> OutputMode {
        if mode == OutputMode::Current {
            return self.output_mode;
        }
        self.output_mode = mode;
        self.renderer.set_output_mode(mode);
        mode
    }

    /// Size of the cell buffers, as of the last applied resize.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.is_active() {
            if let Err(err) = self.close() {
                warn!(%err, "failed to close terminal session");
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
