// SPDX-License-Identifier: MIT
//
// Terminfo — the escape vocabulary of each supported terminal type.
//
// A terminal type is described by two fixed tables: the byte sequences its
// special keys send (F1..F12, the editing keys, the arrows) and the byte
// sequences that drive it (alternate screen, cursor visibility, clear,
// attribute reset, styles, keypad and mouse modes). Both are compiled in;
// there is no terminfo database lookup at runtime.
//
// `detect` maps a `$TERM` value to a table: exact name first, then a prefix
// compatibility list (`tmux-256color` talks like screen, `st` like xterm),
// and finally xterm with a warning, since nearly everything in use today
// understands xterm sequences.

use tracing::warn;

use crate::error::{Error, Result};
use crate::input::KeyCode;

// ─── Func ────────────────────────────────────────────────────────────────────

/// A control sequence a terminal understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func {
    EnterCa,
    ExitCa,
    ShowCursor,
    HideCursor,
    ClearScreen,
    Sgr0,
    Underline,
    Bold,
    Blink,
    Reverse,
    EnterKeypad,
    ExitKeypad,
    EnterMouse,
    ExitMouse,
}

const FUNC_COUNT: usize = 14;
const KEY_COUNT: usize = 22;

/// Key each entry of [`Terminfo::keys`] decodes to, in table order.
pub const KEY_ORDER: [KeyCode; KEY_COUNT] = [
    KeyCode::F(1),
    KeyCode::F(2),
    KeyCode::F(3),
    KeyCode::F(4),
    KeyCode::F(5),
    KeyCode::F(6),
    KeyCode::F(7),
    KeyCode::F(8),
    KeyCode::F(9),
    KeyCode::F(10),
    KeyCode::F(11),
    KeyCode::F(12),
    KeyCode::Insert,
    KeyCode::Delete,
    KeyCode::Home,
    KeyCode::End,
    KeyCode::PageUp,
    KeyCode::PageDown,
    KeyCode::Up,
    KeyCode::Down,
    KeyCode::Left,
    KeyCode::Right,
];

// ─── Terminfo ────────────────────────────────────────────────────────────────

/// Escape vocabulary for one terminal type.
#[derive(Debug, PartialEq, Eq)]
pub struct Terminfo {
    /// Canonical terminal name.
    pub name: &'static str,
    keys: [&'static [u8]; KEY_COUNT],
    funcs: [&'static [u8]; FUNC_COUNT],
}

impl Terminfo {
    /// Bytes for `func`. Empty when the terminal has no such capability.
    #[inline]
    #[must_use]
    pub fn func(&self, func: Func) -> &'static [u8] {
        self.funcs[func as usize]
    }

    /// Every key sequence paired with the key it decodes to.
    pub fn keys(&self) -> impl Iterator<Item = (&'static [u8], KeyCode)> + '_ {
        self.keys.iter().copied().zip(KEY_ORDER)
    }

    /// The table registered under exactly `name`.
    #[must_use]
    pub fn lookup(name: &str) -> Option<&'static Self> {
        TERMS.iter().copied().find(|t| t.name == name)
    }

    /// Resolve a `$TERM` value to a table.
    ///
    /// # Errors
    ///
    /// [`Error::TermNotSet`] when `term` is empty.
    pub fn detect(term: &str) -> Result<&'static Self> {
        if term.is_empty() {
            return Err(Error::TermNotSet);
        }
        if let Some(info) = Self::lookup(term) {
            return Ok(info);
        }
        for &(prefix, info) in COMPAT {
            if term.starts_with(prefix) {
                return Ok(info);
            }
        }
        warn!(term = %term, "unsupported terminal, falling back to xterm");
        Ok(&XTERM)
    }
}

// ─── Vocabularies ────────────────────────────────────────────────────────────

const MOUSE_ENTER: &[u8] = b"\x1b[?1000h\x1b[?1002h\x1b[?1015h\x1b[?1006h";
const MOUSE_EXIT: &[u8] = b"\x1b[?1006l\x1b[?1015l\x1b[?1002l\x1b[?1000l";

#[rustfmt::skip]
const XTERM_KEYS: [&[u8]; KEY_COUNT] = [
    b"\x1bOP", b"\x1bOQ", b"\x1bOR", b"\x1bOS",
    b"\x1b[15~", b"\x1b[17~", b"\x1b[18~", b"\x1b[19~",
    b"\x1b[20~", b"\x1b[21~", b"\x1b[23~", b"\x1b[24~",
    b"\x1b[2~", b"\x1b[3~", b"\x1bOH", b"\x1bOF", b"\x1b[5~", b"\x1b[6~",
    b"\x1bOA", b"\x1bOB", b"\x1bOD", b"\x1bOC",
];

#[rustfmt::skip]
const RXVT_KEYS: [&[u8]; KEY_COUNT] = [
    b"\x1b[11~", b"\x1b[12~", b"\x1b[13~", b"\x1b[14~",
    b"\x1b[15~", b"\x1b[17~", b"\x1b[18~", b"\x1b[19~",
    b"\x1b[20~", b"\x1b[21~", b"\x1b[23~", b"\x1b[24~",
    b"\x1b[2~", b"\x1b[3~", b"\x1b[7~", b"\x1b[8~", b"\x1b[5~", b"\x1b[6~",
    b"\x1b[A", b"\x1b[B", b"\x1b[D", b"\x1b[C",
];

#[rustfmt::skip]
const LINUX_KEYS: [&[u8]; KEY_COUNT] = [
    b"\x1b[[A", b"\x1b[[B", b"\x1b[[C", b"\x1b[[D", b"\x1b[[E",
    b"\x1b[17~", b"\x1b[18~", b"\x1b[19~",
    b"\x1b[20~", b"\x1b[21~", b"\x1b[23~", b"\x1b[24~",
    b"\x1b[2~", b"\x1b[3~", b"\x1b[1~", b"\x1b[4~", b"\x1b[5~", b"\x1b[6~",
    b"\x1b[A", b"\x1b[B", b"\x1b[D", b"\x1b[C",
];

#[rustfmt::skip]
const SCREEN_KEYS: [&[u8]; KEY_COUNT] = [
    b"\x1bOP", b"\x1bOQ", b"\x1bOR", b"\x1bOS",
    b"\x1b[15~", b"\x1b[17~", b"\x1b[18~", b"\x1b[19~",
    b"\x1b[20~", b"\x1b[21~", b"\x1b[23~", b"\x1b[24~",
    b"\x1b[2~", b"\x1b[3~", b"\x1b[1~", b"\x1b[4~", b"\x1b[5~", b"\x1b[6~",
    b"\x1bOA", b"\x1bOB", b"\x1bOD", b"\x1bOC",
];

/// xterm and everything that claims to be it.
#[rustfmt::skip]
pub static XTERM: Terminfo = Terminfo {
    name: "xterm",
    keys: XTERM_KEYS,
    funcs: [
        b"\x1b[?1049h", b"\x1b[?1049l",
        b"\x1b[?12l\x1b[?25h", b"\x1b[?25l",
        b"\x1b[H\x1b[2J", b"\x1b(B\x1b[m",
        b"\x1b[4m", b"\x1b[1m", b"\x1b[5m", b"\x1b[7m",
        b"\x1b[?1h\x1b=", b"\x1b[?1l\x1b>",
        MOUSE_ENTER, MOUSE_EXIT,
    ],
};

#[rustfmt::skip]
pub static RXVT_UNICODE: Terminfo = Terminfo {
    name: "rxvt-unicode",
    keys: RXVT_KEYS,
    funcs: [
        b"\x1b[?1049h", b"\x1b[r\x1b[?1049l",
        b"\x1b[?25h", b"\x1b[?25l",
        b"\x1b[H\x1b[2J", b"\x1b[m\x1b(B",
        b"\x1b[4m", b"\x1b[1m", b"\x1b[5m", b"\x1b[7m",
        b"\x1b=", b"\x1b>",
        MOUSE_ENTER, MOUSE_EXIT,
    ],
};

#[rustfmt::skip]
pub static RXVT_256COLOR: Terminfo = Terminfo {
    name: "rxvt-256color",
    keys: RXVT_KEYS,
    funcs: [
        b"\x1b7\x1b[?47h", b"\x1b[2J\x1b[?47l\x1b8",
        b"\x1b[?25h", b"\x1b[?25l",
        b"\x1b[H\x1b[2J", b"\x1b[m",
        b"\x1b[4m", b"\x1b[1m", b"\x1b[5m", b"\x1b[7m",
        b"\x1b=", b"\x1b>",
        MOUSE_ENTER, MOUSE_EXIT,
    ],
};

/// The Linux virtual console. No alternate screen, keypad or mouse.
#[rustfmt::skip]
pub static LINUX: Terminfo = Terminfo {
    name: "linux",
    keys: LINUX_KEYS,
    funcs: [
        b"", b"",
        b"\x1b[?25h\x1b[?0c", b"\x1b[?25l\x1b[?1c",
        b"\x1b[H\x1b[J", b"\x1b[0;10m",
        b"\x1b[4m", b"\x1b[1m", b"\x1b[5m", b"\x1b[7m",
        b"", b"",
        b"", b"",
    ],
};

#[rustfmt::skip]
pub static SCREEN: Terminfo = Terminfo {
    name: "screen",
    keys: SCREEN_KEYS,
    funcs: [
        b"\x1b[?1049h", b"\x1b[?1049l",
        b"\x1b[34h\x1b[?25h", b"\x1b[?25l",
        b"\x1b[H\x1b[J", b"\x1b[m",
        b"\x1b[4m", b"\x1b[1m", b"\x1b[5m", b"\x1b[7m",
        b"\x1b[?1h\x1b=", b"\x1b[?1l\x1b>",
        MOUSE_ENTER, MOUSE_EXIT,
    ],
};

#[rustfmt::skip]
pub static ETERM: Terminfo = Terminfo {
    name: "Eterm",
    keys: RXVT_KEYS,
    funcs: [
        b"\x1b7\x1b[?47h", b"\x1b[2J\x1b[?47l\x1b8",
        b"\x1b[?25h", b"\x1b[?25l",
        b"\x1b[H\x1b[2J", b"\x1b[m\x1b(B",
        b"\x1b[4m", b"\x1b[1m", b"\x1b[5m", b"\x1b[7m",
        b"", b"",
        b"", b"",
    ],
};

static TERMS: &[&Terminfo] = &[&XTERM, &RXVT_UNICODE, &RXVT_256COLOR, &LINUX, &SCREEN, &ETERM];

static COMPAT: &[(&str, &Terminfo)] = &[
    ("xterm", &XTERM),
    ("rxvt", &RXVT_UNICODE),
    ("linux", &LINUX),
    ("Eterm", &ETERM),
    ("screen", &SCREEN),
    ("tmux", &SCREEN),
    ("st", &XTERM),
    ("cygwin", &XTERM),
];

// ─── Tests ───────────────────────────────────────────────────────────────────
