// SPDX-License-Identifier: MIT
//
// cellbox — a live event viewer built on cellbox-term.
//
// Opens the controlling terminal, then logs every event the session
// delivers: keys with their modifiers, mouse reports, resizes, and the
// interrupts a ticker thread sends twice a second to keep the uptime and
// the blinking indicator fresh. Ctrl-Q quits.
//
// Environment:
//
//   CELLBOX_CONFIG   TOML file with session settings (see Config)
//   CELLBOX_LOG      tracing filter, default "info"
//   CELLBOX_LOG_FILE log destination, default $TMPDIR/cellbox.log
//
// Layout:
//
//   ┌──────────────────────────────┐
//   │ header (size, count, uptime) │  ← row 0
//   ├──────────────────────────────┤
//   │ event log                    │  ← h - 3 rows
//   ├──────────────────────────────┤
//   │ status bar                   │  ← last row
//   └──────────────────────────────┘

use std::collections::VecDeque;
use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cellbox_term::{
    Attribute, Config, Error, Event, InputMode, Interrupter, KeyCode, KeyEvent, Modifiers, MouseButton,
    Session, Size,
};

/// Maximum number of events kept in the scrolling log.
const MAX_LOG_ENTRIES: usize = 100;

/// Interval between ticker interrupts.
const TICK: Duration = Duration::from_millis(500);

// ─── Viewer ─────────────────────────────────────────────────────────────────

struct Viewer {
    size: Size,
    log: VecDeque<String>,
    event_count: u64,
    start: Instant,
    blink: bool,
}

impl Viewer {
    fn new(size: Size) -> Self {
        Self {
            size,
            log: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            event_count: 0,
            start: Instant::now(),
            blink: true,
        }
    }

    fn push_log(&mut self, msg: String) {
        if self.log.len() >= MAX_LOG_ENTRIES {
            self.log.pop_front();
        }
        self.log.push_back(msg);
    }

    /// Record one event. Returns `false` when the viewer should exit.
    fn on_event(&mut self, event: &Event) -> bool {
        match event {
            Event::Key(KeyEvent {
                code: KeyCode::Char('q'),
                modifiers,
            }) if modifiers.contains(Modifiers::CTRL) => return false,
            Event::Interrupt => {
                self.blink = !self.blink;
                return true;
            }
            Event::Resize(size) => self.size = *size,
            Event::Error(err) if matches!(**err, Error::Disconnected) => return false,
            _ => {}
        }
        self.event_count += 1;
        self.push_log(format_event(event));
        true
    }

    fn paint(&self, session: &mut Session) -> Result<()> {
        session.clear(Attribute::DEFAULT, Attribute::DEFAULT)?;
        let buf = session.cell_buffer();
        let (w, h) = (i32::from(buf.width()), i32::from(buf.height()));
        if w < 20 || h < 4 {
            return Ok(());
        }

        // ── Header ───────────────────────────────────────────────
        let (header_fg, header_bg) = (Attribute::BLACK, Attribute::CYAN);
        fill_row(session, 0, w, header_fg, header_bg);
        let title = format!(
            " cellbox | {}x{} | {} events | {:.1}s ",
            self.size.cols,
            self.size.rows,
            self.event_count,
            self.start.elapsed().as_secs_f64()
        );
        paint_str(session, 0, 0, &title, header_fg | Attribute::BOLD, header_bg);
        let hint = "Ctrl-Q to quit ";
        paint_str(session, w - text_width(hint), 0, hint, header_fg, header_bg);

        // ── Separator ────────────────────────────────────────────
        for x in 0..w {
            session.set_cell(x, 1, '\u{2500}', Attribute::BLACK | Attribute::BOLD, Attribute::DEFAULT);
        }

        // ── Event log ────────────────────────────────────────────
        let rows = usize::try_from(h - 3).unwrap_or(0);
        let skip = self.log.len().saturating_sub(rows);
        for (y, entry) in (2..).zip(self.log.iter().skip(skip)) {
            paint_str(session, 1, y, entry, event_color(entry), Attribute::DEFAULT);
        }

        // ── Status bar ───────────────────────────────────────────
        let status_y = h - 1;
        fill_row(session, status_y, w, Attribute::BLACK, Attribute::WHITE);
        let indicator = if self.blink { '\u{2588}' } else { ' ' };
        session.set_cell(1, status_y, indicator, Attribute::GREEN, Attribute::WHITE);
        let status = format!(" {} events | type, click, scroll, resize", self.event_count);
        paint_str(session, 3, status_y, &status, Attribute::BLACK, Attribute::WHITE);

        session.flush()?;
        Ok(())
    }
}

// ─── Formatting ─────────────────────────────────────────────────────────────

fn format_event(event: &Event) -> String {
    match event {
        Event::Key(ke) => {
            let mods = format_modifiers(ke.modifiers);
            let key = format_keycode(ke.code);
            if mods.is_empty() {
                format!("Key: {key}")
            } else {
                format!("Key: {mods}+{key}")
            }
        }
        Event::Mouse(me) => {
            let drag = if me.modifiers.contains(Modifiers::MOTION) { " (motion)" } else { "" };
            let alt = if me.modifiers.contains(Modifiers::ALT) { "Alt+" } else { "" };
            format!("Mouse: {alt}{} at ({}, {}){drag}", format_button(me.button), me.x, me.y)
        }
        Event::Resize(size) => format!("Resize: {}x{} ({} cells)", size.cols, size.rows, size.area()),
        Event::Error(err) => format!("Error: {err}"),
        Event::Raw(n) => format!("Raw: {n} bytes"),
        Event::Interrupt => "Interrupt".into(),
        Event::None => "None".into(),
    }
}

fn format_modifiers(mods: Modifiers) -> String {
    let mut parts = Vec::new();
    if mods.contains(Modifiers::CTRL) {
        parts.push("Ctrl");
    }
    if mods.contains(Modifiers::ALT) {
        parts.push("Alt");
    }
    parts.join("+")
}

fn format_keycode(code: KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "Space".into(),
        KeyCode::Char(c) => format!("'{c}'"),
        KeyCode::F(n) => format!("F{n}"),
        other => format!("{other:?}"),
    }
}

const fn format_button(button: MouseButton) -> &'static str {
    match button {
        MouseButton::Left => "Left",
        MouseButton::Middle => "Middle",
        MouseButton::Right => "Right",
        MouseButton::Release => "Release",
        MouseButton::WheelUp => "WheelUp",
        MouseButton::WheelDown => "WheelDown",
    }
}

fn event_color(entry: &str) -> Attribute {
    if entry.starts_with("Key:") {
        Attribute::GREEN
    } else if entry.starts_with("Mouse:") {
        Attribute::BLUE | Attribute::BOLD
    } else if entry.starts_with("Resize:") {
        Attribute::YELLOW
    } else if entry.starts_with("Error:") {
        Attribute::RED | Attribute::BOLD
    } else {
        Attribute::WHITE
    }
}

// ─── Painting helpers ───────────────────────────────────────────────────────

fn text_width(text: &str) -> i32 {
    i32::try_from(text.chars().count()).unwrap_or(i32::MAX)
}

fn fill_row(session: &mut Session, y: i32, w: i32, fg: Attribute, bg: Attribute) {
    for x in 0..w {
        session.set_cell(x, y, ' ', fg, bg);
    }
}

/// Paint `text` from `(x, y)`; `set_cell` drops whatever runs off the edge.
fn paint_str(session: &mut Session, x: i32, y: i32, text: &str, fg: Attribute, bg: Attribute) {
    for (col, ch) in (x..).zip(text.chars()) {
        session.set_cell(col, y, ch, fg, bg);
    }
}

// ─── Setup ──────────────────────────────────────────────────────────────────

fn init_logging() -> Result<()> {
    let path = env::var_os("CELLBOX_LOG_FILE")
        .map_or_else(|| env::temp_dir().join("cellbox.log"), PathBuf::from);
    let file = File::create(&path).with_context(|| format!("cannot create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_env("CELLBOX_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn load_config() -> Result<Config> {
    match env::var_os("CELLBOX_CONFIG") {
        Some(path) => {
            let path = PathBuf::from(path);
            Config::load(&path).with_context(|| format!("cannot load config {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

/// Wake the poll loop every [`TICK`] until the session goes away.
fn spawn_ticker(interrupter: Interrupter) -> Result<()> {
    thread::Builder::new()
        .name("ticker".into())
        .spawn(move || {
            loop {
                thread::sleep(TICK);
                if interrupter.interrupt().is_err() {
                    break;
                }
            }
        })
        .context("cannot spawn ticker thread")?;
    Ok(())
}

fn run(session: &mut Session) -> Result<()> {
    let mut viewer = Viewer::new(session.size());
    let mode = session.set_input_mode(InputMode::CURRENT);
    viewer.push_log(format!("Terminal: {}x{}", viewer.size.cols, viewer.size.rows));
    viewer.push_log(format!("Input mode: {mode:?}"));
    viewer.push_log(String::new());

    spawn_ticker(session.interrupter())?;

    loop {
        viewer.paint(session)?;
        let event = session.poll_event();
        if !viewer.on_event(&event) {
            return Ok(());
        }
    }
}

fn main() -> Result<()> {
    init_logging()?;
    let config = load_config()?;
    info!(?config, "starting");

    let mut session = Session::new(config);
    session.init().context("failed to initialize terminal")?;

    let result = run(&mut session);
    if let Err(err) = session.close() {
        warn!(%err, "failed to restore terminal");
    }
    result
}

// ─── Tests ──────────────────────────────────────────────────────────────────
