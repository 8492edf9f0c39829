// SPDX-License-Identifier: MIT
//
// Terminal input decoder.
//
// Turns raw tty bytes into structured events: keys, control chords and
// mouse reports. The key vocabulary comes from the active terminfo table;
// mouse reports are recognized in all three dialects terminals speak once
// mouse mode is on:
//
// - X10:          ESC [ M Cb Cx Cy            (bytes offset by 32)
// - xterm 1006:   ESC [ < Cb ; Cx ; Cy M|m    (decimal; `m` is release)
// - urxvt 1015:   ESC [ Cb ; Cx ; Cy M        (decimal; Cb offset by 32)
//
// # Design
//
// The decoder is stateless: give it a byte slice, get back one event and
// how many bytes it used, or `Incomplete` when the slice might still grow
// into something longer. Buffering lives in the event pipeline.
//
// A lone ESC is the classic ambiguity: it is either the Escape key or the
// first byte of a sequence still in flight. `decode` reports `Incomplete`
// for it and for every strict prefix of a known sequence; once the caller
// has waited long enough it calls `decode_settled`, which resolves ESC
// according to the input mode (Escape key, or Alt on the following key).

use std::sync::Arc;

use bitflags::bitflags;

use crate::error::Error;
use crate::terminal::Size;
use crate::terminfo::Terminfo;

// ─── Event Types ────────────────────────────────────────────────────────────

/// An event delivered by `poll_event`.
#[derive(Debug, Clone)]
pub enum Event {
    /// A key press.
    Key(KeyEvent),
    /// A mouse report.
    Mouse(MouseEvent),
    /// The window changed size.
    Resize(Size),
    /// Another thread called [`Interrupter::interrupt`](crate::pipeline::Interrupter::interrupt).
    Interrupt,
    /// Reading the terminal failed.
    Error(Arc<Error>),
    /// `n` undecoded bytes were copied into the caller's buffer.
    Raw(usize),
    /// Nothing could be decoded.
    None,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Key(a), Self::Key(b)) => a == b,
            (Self::Mouse(a), Self::Mouse(b)) => a == b,
            (Self::Resize(a), Self::Resize(b)) => a == b,
            (Self::Raw(a), Self::Raw(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => Arc::ptr_eq(a, b),
            (Self::Interrupt, Self::Interrupt) | (Self::None, Self::None) => true,
            _ => false,
        }
    }
}

impl Event {
    /// A key event without modifiers.
    #[must_use]
    pub const fn key(code: KeyCode) -> Self {
        Self::Key(KeyEvent::plain(code))
    }

    /// A key event with modifiers.
    #[must_use]
    pub const fn key_with(code: KeyCode, modifiers: Modifiers) -> Self {
        Self::Key(KeyEvent::new(code, modifiers))
    }

    /// Add `modifiers` to a key or mouse event; other events pass through.
    #[must_use]
    fn with_modifiers(self, modifiers: Modifiers) -> Self {
        match self {
            Self::Key(mut k) => {
                k.modifiers |= modifiers;
                Self::Key(k)
            }
            Self::Mouse(mut m) => {
                m.modifiers |= modifiers;
                Self::Mouse(m)
            }
            other => other,
        }
    }
}

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[inline]
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    #[inline]
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, Modifiers::empty())
    }
}

/// Identity of a key.
///
/// Control chords arrive as the letter plus [`Modifiers::CTRL`]: byte 0x01
/// is `Char('a')` with CTRL, 0x00 is `Char('@')`, 0x1C..=0x1F are
/// `\` `]` `^` `_`. Tab, Enter and Backspace keep their own variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A character, printable or the letter of a control chord.
    Char(char),
    // ── Named keys ──────────────────────────────────────────────
    Enter,
    Tab,
    Backspace,
    Escape,
    Insert,
    Delete,
    // ── Navigation ──────────────────────────────────────────────
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    // ── Function keys ───────────────────────────────────────────
    /// F1 through F12.
    F(u8),
}

bitflags! {
    /// Modifiers attached to key and mouse events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        /// ESC prefix in Alt input mode.
        const ALT    = 0b0000_0001;
        /// Control chord (bytes below 0x20).
        const CTRL   = 0b0000_0010;
        /// Mouse moved with the button held (drag).
        const MOTION = 0b0000_0100;
    }
}

/// A mouse report with 0-indexed coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub button: MouseButton,
    /// Column; reports left of the origin clamp to 0.
    pub x: u16,
    /// Row; reports above the origin clamp to 0.
    pub y: u16,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Release,
    WheelUp,
    WheelDown,
}

bitflags! {
    /// How ESC is interpreted, and whether mouse reporting is on.
    ///
    /// The empty set is the query sentinel for `set_input_mode`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InputMode: u8 {
        /// An unmatched ESC is the Escape key.
        const ESC   = 0b001;
        /// An unmatched ESC adds Alt to the following key.
        const ALT   = 0b010;
        /// Report mouse buttons, wheel and drags.
        const MOUSE = 0b100;
    }
}

impl InputMode {
    /// Query sentinel: returns the active mode without changing it.
    pub const CURRENT: Self = Self::empty();

    /// Make the ESC/ALT choice unambiguous: neither means ESC, both means
    /// ESC. The mouse bit is kept as given.
    #[must_use]
    pub fn normalized(self) -> Self {
        let mut mode = self;
        if !mode.intersects(Self::ESC | Self::ALT) {
            mode |= Self::ESC;
        }
        if mode.contains(Self::ESC | Self::ALT) {
            mode.remove(Self::ALT);
        }
        mode
    }

    /// Whether an unmatched ESC prefixes the next key with Alt.
    #[inline]
    #[must_use]
    pub fn alt_prefix(self) -> bool {
        self.contains(Self::ALT) && !self.contains(Self::ESC)
    }
}

impl Default for InputMode {
    fn default() -> Self {
        Self::ESC
    }
}

// ─── Decoder ────────────────────────────────────────────────────────────────

/// Result of decoding the front of a byte buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// One event, consuming `usize` bytes.
    Event(Event, usize),
    /// The bytes may be the start of a longer sequence; wait for more.
    Incomplete,
    /// The first `usize` bytes can never decode; drop them.
    Malformed(usize),
}

/// Stateless byte-to-event decoder bound to one terminal vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    info: &'static Terminfo,
}

impl Decoder {
    #[must_use]
    pub const fn new(info: &'static Terminfo) -> Self {
        Self { info }
    }

    /// Decode one event, reporting `Incomplete` for anything that could
    /// still grow into a longer sequence.
    #[must_use]
    pub fn decode(&self, buf: &[u8], mode: InputMode) -> Decoded {
        self.decode_with(buf, mode, false)
    }

    /// Decode one event, assuming no more bytes are coming.
    ///
    /// A pending ESC resolves per `mode`, and a truncated UTF-8 sequence is
    /// malformed. Returns `Incomplete` only for an empty buffer.
    #[must_use]
    pub fn decode_settled(&self, buf: &[u8], mode: InputMode) -> Decoded {
        self.decode_with(buf, mode, true)
    }

    fn decode_with(&self, buf: &[u8], mode: InputMode, settle: bool) -> Decoded {
        let alt_prefix = mode.alt_prefix();
        let mut modifiers = Modifiers::empty();
        let mut offset = 0;

        loop {
            let rest = &buf[offset..];
            let Some(&lead) = rest.first() else {
                return Decoded::Incomplete;
            };

            let (event, len) = if lead == 0x1B {
                match self.match_escape(rest) {
                    Escape::Matched(event, len) => (event, len),
                    Escape::Partial if !settle => return Decoded::Incomplete,
                    _ if alt_prefix && rest.len() > 1 => {
                        modifiers |= Modifiers::ALT;
                        offset += 1;
                        continue;
                    }
                    _ => (Event::key(KeyCode::Escape), 1),
                }
            } else {
                match decode_plain(rest, settle) {
                    Decoded::Event(event, len) => (event, len),
                    Decoded::Incomplete => return Decoded::Incomplete,
                    Decoded::Malformed(n) => return Decoded::Malformed(offset + n),
                }
            };

            return Decoded::Event(event.with_modifiers(modifiers), offset + len);
        }
    }

    // ── Escape sequences ────────────────────────────────────────────

    fn match_escape(&self, buf: &[u8]) -> Escape {
        for (seq, code) in self.info.keys() {
            if buf.starts_with(seq) {
                return Escape::Matched(Event::key(code), seq.len());
            }
        }

        match parse_mouse(buf) {
            Mouse::Event(event, len) => return Escape::Matched(Event::Mouse(event), len),
            Mouse::Partial => return Escape::Partial,
            Mouse::None => {}
        }

        let is_prefix = self
            .info
            .keys()
            .any(|(seq, _)| seq.len() > buf.len() && seq.starts_with(buf));
        if buf.len() == 1 || is_prefix {
            Escape::Partial
        } else {
            Escape::Unknown
        }
    }
}

enum Escape {
    Matched(Event, usize),
    Partial,
    Unknown,
}

// ── Plain bytes ─────────────────────────────────────────────────────────

fn decode_plain(buf: &[u8], settle: bool) -> Decoded {
    let ctrl = |ch: char| Decoded::Event(Event::key_with(KeyCode::Char(ch), Modifiers::CTRL), 1);

    match buf[0] {
        0x00 => ctrl('@'),
        0x08 | 0x7F => Decoded::Event(Event::key(KeyCode::Backspace), 1),
        0x09 => Decoded::Event(Event::key(KeyCode::Tab), 1),
        0x0D => Decoded::Event(Event::key(KeyCode::Enter), 1),
        b @ 0x01..=0x1A => ctrl(char::from(b - 1 + b'a')),
        b @ 0x1C..=0x1F => ctrl(char::from(b + 0x40)),
        b @ 0x20..=0x7E => Decoded::Event(Event::key(KeyCode::Char(char::from(b))), 1),
        _ => decode_utf8(buf, settle),
    }
}

fn decode_utf8(buf: &[u8], settle: bool) -> Decoded {
    let expected = utf8_char_len(buf[0]);
    if expected == 0 {
        return Decoded::Malformed(1);
    }

    let present = &buf[1..expected.min(buf.len())];
    if present.iter().any(|&b| b & 0xC0 != 0x80) {
        return Decoded::Malformed(1);
    }
    if buf.len() < expected {
        return if settle {
            Decoded::Malformed(1)
        } else {
            Decoded::Incomplete
        };
    }

    match std::str::from_utf8(&buf[..expected]) {
        Ok(s) => s.chars().next().map_or(Decoded::Malformed(expected), |ch| {
            Decoded::Event(Event::key(KeyCode::Char(ch)), expected)
        }),
        Err(_) => Decoded::Malformed(1),
    }
}

/// Expected byte length of a UTF-8 character from its lead byte.
/// Returns 0 for bytes that cannot start one.
const fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}

// ── Mouse reports ───────────────────────────────────────────────────────

/// Longest decimal mouse report accepted before giving up on it.
const MAX_MOUSE_LEN: usize = 32;

enum Mouse {
    Event(MouseEvent, usize),
    Partial,
    None,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Xterm,
    Urxvt,
}

fn parse_mouse(buf: &[u8]) -> Mouse {
    if !buf.starts_with(b"\x1b[") {
        return Mouse::None;
    }
    match buf.get(2) {
        None => Mouse::Partial,
        Some(b'M') => parse_x10(buf),
        Some(b'<') => parse_decimal(buf, 3, Dialect::Xterm),
        Some(b) if b.is_ascii_digit() => parse_decimal(buf, 2, Dialect::Urxvt),
        Some(_) => Mouse::None,
    }
}

fn parse_x10(buf: &[u8]) -> Mouse {
    if buf.len() < 6 {
        return Mouse::Partial;
    }
    let cb = i64::from(buf[3].wrapping_sub(32));
    let x = i64::from(buf[4]) - 33;
    let y = i64::from(buf[5]) - 33;
    Mouse::Event(mouse_event(cb, x, y), 6)
}

fn parse_decimal(buf: &[u8], start: usize, dialect: Dialect) -> Mouse {
    let mut end = start;
    loop {
        if end >= MAX_MOUSE_LEN {
            return Mouse::None;
        }
        match buf.get(end) {
            None => return Mouse::Partial,
            Some(b'0'..=b'9' | b';') => end += 1,
            Some(b'M') => break,
            Some(b'm') if dialect == Dialect::Xterm => break,
            Some(_) => return Mouse::None,
        }
    }

    let mut fields = buf[start..end].split(|&b| b == b';').map(parse_i64);
    let (Some(Some(mut cb)), Some(Some(cx)), Some(Some(cy)), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Mouse::None;
    };

    if dialect == Dialect::Urxvt {
        cb -= 32;
    }
    let mut event = mouse_event(cb, cx - 1, cy - 1);
    if buf[end] == b'm' {
        event.button = MouseButton::Release;
    }
    Mouse::Event(event, end + 1)
}

/// Decode the button byte shared by all dialects (after offset removal).
fn mouse_event(cb: i64, x: i64, y: i64) -> MouseEvent {
    let wheel = cb & 64 != 0;
    let button = match cb & 3 {
        0 if wheel => MouseButton::WheelUp,
        0 => MouseButton::Left,
        1 if wheel => MouseButton::WheelDown,
        1 => MouseButton::Middle,
        2 => MouseButton::Right,
        _ => MouseButton::Release,
    };
    let modifiers = if cb & 32 != 0 {
        Modifiers::MOTION
    } else {
        Modifiers::empty()
    };
    MouseEvent {
        button,
        x: clamp_coord(x),
        y: clamp_coord(y),
        modifiers,
    }
}

fn clamp_coord(v: i64) -> u16 {
    u16::try_from(v.max(0)).unwrap_or(u16::MAX)
}

fn parse_i64(field: &[u8]) -> Option<i64> {
    if field.is_empty() {
        return None;
    }
    std::str::from_utf8(field).ok()?.parse().ok()
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminfo::{LINUX, RXVT_UNICODE, XTERM};
    use pretty_assertions::assert_eq;

    fn decoder() -> Decoder {
        Decoder::new(&XTERM)
    }

    /// Decode exactly one event that spans the whole input.
    fn one(buf: &[u8]) -> Event {
        one_in(buf, InputMode::ESC)
    }

    fn one_in(buf: &[u8], mode: InputMode) -> Event {
        match decoder().decode(buf, mode) {
            Decoded::Event(event, n) => {
                assert_eq!(n, buf.len(), "partial consume of {buf:?}");
                event
            }
            other => panic!("{buf:?} decoded to {other:?}"),
        }
    }

    fn settled(buf: &[u8], mode: InputMode) -> Decoded {
        decoder().decode_settled(buf, mode)
    }

    fn mouse(buf: &[u8]) -> MouseEvent {
        match one(buf) {
            Event::Mouse(m) => m,
            other => panic!("{buf:?} decoded to {other:?}"),
        }
    }

    fn ctrl(ch: char) -> Event {
        Event::key_with(KeyCode::Char(ch), Modifiers::CTRL)
    }

    // ── Printable & UTF-8 ───────────────────────────────────────────────

    #[test]
    fn ascii_char() {
        assert_eq!(one(b"q"), Event::key(KeyCode::Char('q')));
    }

    #[test]
    fn space_is_a_char() {
        assert_eq!(one(b" "), Event::key(KeyCode::Char(' ')));
    }

    #[test]
    fn utf8_multibyte() {
        assert_eq!(one("é".as_bytes()), Event::key(KeyCode::Char('é')));
        assert_eq!(one("中".as_bytes()), Event::key(KeyCode::Char('中')));
        assert_eq!(one("🦀".as_bytes()), Event::key(KeyCode::Char('🦀')));
    }

    #[test]
    fn only_first_event_is_consumed() {
        assert_eq!(
            decoder().decode(b"ab", InputMode::ESC),
            Decoded::Event(Event::key(KeyCode::Char('a')), 1)
        );
    }

    #[test]
    fn truncated_utf8_waits_then_drops() {
        let partial = &"中".as_bytes()[..2];
        assert_eq!(decoder().decode(partial, InputMode::ESC), Decoded::Incomplete);
        assert_eq!(settled(partial, InputMode::ESC), Decoded::Malformed(1));
    }

    #[test]
    fn stray_continuation_byte_is_malformed() {
        assert_eq!(decoder().decode(b"\x80a", InputMode::ESC), Decoded::Malformed(1));
    }

    #[test]
    fn broken_sequence_is_malformed_without_waiting() {
        assert_eq!(decoder().decode(b"\xE4a", InputMode::ESC), Decoded::Malformed(1));
    }

    // ── Control bytes ───────────────────────────────────────────────────

    #[test]
    fn control_letters() {
        assert_eq!(one(b"\x01"), ctrl('a'));
        assert_eq!(one(b"\x03"), ctrl('c'));
        assert_eq!(one(b"\x0A"), ctrl('j'));
        assert_eq!(one(b"\x11"), ctrl('q'));
        assert_eq!(one(b"\x1A"), ctrl('z'));
    }

    #[test]
    fn control_punctuation() {
        assert_eq!(one(b"\x00"), ctrl('@'));
        assert_eq!(one(b"\x1C"), ctrl('\\'));
        assert_eq!(one(b"\x1D"), ctrl(']'));
        assert_eq!(one(b"\x1E"), ctrl('^'));
        assert_eq!(one(b"\x1F"), ctrl('_'));
    }

    #[test]
    fn named_control_keys() {
        assert_eq!(one(b"\x08"), Event::key(KeyCode::Backspace));
        assert_eq!(one(b"\x7F"), Event::key(KeyCode::Backspace));
        assert_eq!(one(b"\x09"), Event::key(KeyCode::Tab));
        assert_eq!(one(b"\x0D"), Event::key(KeyCode::Enter));
    }

    // ── Key table ───────────────────────────────────────────────────────

    #[test]
    fn every_xterm_key_decodes() {
        for (seq, code) in XTERM.keys() {
            assert_eq!(one(seq), Event::key(code), "{seq:?}");
        }
    }

    #[test]
    fn keys_follow_the_active_terminal() {
        let linux = Decoder::new(&LINUX);
        assert_eq!(
            linux.decode(b"\x1b[[A", InputMode::ESC),
            Decoded::Event(Event::key(KeyCode::F(1)), 4)
        );
        let rxvt = Decoder::new(&RXVT_UNICODE);
        assert_eq!(
            rxvt.decode(b"\x1b[7~", InputMode::ESC),
            Decoded::Event(Event::key(KeyCode::Home), 4)
        );
    }

    #[test]
    fn key_followed_by_more_input() {
        assert_eq!(
            decoder().decode(b"\x1bOAx", InputMode::ESC),
            Decoded::Event(Event::key(KeyCode::Up), 3)
        );
    }

    #[test]
    fn key_prefix_is_incomplete() {
        for partial in [&b"\x1b"[..], b"\x1b[", b"\x1bO", b"\x1b[1", b"\x1b[15"] {
            assert_eq!(decoder().decode(partial, InputMode::ESC), Decoded::Incomplete, "{partial:?}");
        }
    }

    // ── ESC / Alt resolution ────────────────────────────────────────────

    #[test]
    fn lone_esc_settles_to_escape_in_both_modes() {
        for mode in [InputMode::ESC, InputMode::ALT] {
            assert_eq!(
                settled(b"\x1b", mode),
                Decoded::Event(Event::key(KeyCode::Escape), 1),
                "{mode:?}"
            );
        }
    }

    #[test]
    fn unknown_escape_in_esc_mode() {
        assert_eq!(
            decoder().decode(b"\x1bx", InputMode::ESC),
            Decoded::Event(Event::key(KeyCode::Escape), 1)
        );
    }

    #[test]
    fn unknown_escape_in_alt_mode() {
        assert_eq!(
            one_in(b"\x1bx", InputMode::ALT),
            Event::key_with(KeyCode::Char('x'), Modifiers::ALT)
        );
    }

    #[test]
    fn alt_applies_to_control_chords_and_sequences() {
        assert_eq!(
            one_in(b"\x1b\x01", InputMode::ALT),
            Event::key_with(KeyCode::Char('a'), Modifiers::ALT | Modifiers::CTRL)
        );
        assert_eq!(
            one_in(b"\x1b\x1bOA", InputMode::ALT),
            Event::key_with(KeyCode::Up, Modifiers::ALT)
        );
    }

    #[test]
    fn alt_escape_waits_then_settles() {
        assert_eq!(decoder().decode(b"\x1b\x1b", InputMode::ALT), Decoded::Incomplete);
        assert_eq!(
            settled(b"\x1b\x1b", InputMode::ALT),
            Decoded::Event(Event::key_with(KeyCode::Escape, Modifiers::ALT), 2)
        );
    }

    #[test]
    fn settled_partial_sequence_in_alt_mode() {
        assert_eq!(
            settled(b"\x1b[", InputMode::ALT),
            Decoded::Event(Event::key_with(KeyCode::Char('['), Modifiers::ALT), 2)
        );
        assert_eq!(
            settled(b"\x1b[", InputMode::ESC),
            Decoded::Event(Event::key(KeyCode::Escape), 1)
        );
    }

    #[test]
    fn empty_buffer_is_incomplete() {
        assert_eq!(decoder().decode(b"", InputMode::ESC), Decoded::Incomplete);
        assert_eq!(settled(b"", InputMode::ESC), Decoded::Incomplete);
    }

    // ── Mouse: all three dialects ───────────────────────────────────────

    #[test]
    fn mouse_report_table() {
        use MouseButton::*;

        #[rustfmt::skip]
        let table: &[(&[u8], MouseButton, bool, u16, u16)] = &[
            // xterm 1006
            (b"\x1b[<0;49;13M", Left, false, 48, 12),
            (b"\x1b[<32;49;13M", Left, true, 48, 12),
            (b"\x1b[<80;49;13M", WheelUp, false, 48, 12),
            (b"\x1b[<112;49;13M", WheelUp, true, 48, 12),
            (b"\x1b[<21;49;13M", Middle, false, 48, 12),
            (b"\x1b[<53;49;13M", Middle, true, 48, 12),
            (b"\x1b[<81;49;13M", WheelDown, false, 48, 12),
            (b"\x1b[<113;49;13M", WheelDown, true, 48, 12),
            (b"\x1b[<02;1;1M", Right, false, 0, 0),
            (b"\x1b[<34;1;1M", Right, true, 0, 0),
            (b"\x1b[<0;49;13m", Release, false, 48, 12),
            (b"\x1b[<32;49;13m", Release, true, 48, 12),
            (b"\x1b[<23;1;1M", Release, false, 0, 0),
            // X10
            (b"\x1b[M\x20\x2e\x2d", Left, false, 13, 12),
            (b"\x1b[M\x40\x2e\x2d", Left, true, 13, 12),
            (b"\x1b[M\x30\x2e\x2d", Left, false, 13, 12),
            (b"\x1b[M\x50\x2e\x2d", Left, true, 13, 12),
            (b"\x1b[M\x60\x2e\x2d", WheelUp, false, 13, 12),
            (b"\x1b[M\x70\x2e\x2d", WheelUp, false, 13, 12),
            (b"\x1b[M\x80\x2e\x2d", WheelUp, true, 13, 12),
            (b"\x1b[M\x90\x2e\x2d", WheelUp, true, 13, 12),
            (b"\x1b[M\x21\x2e\x2d", Middle, false, 13, 12),
            (b"\x1b[M\x31\x2e\x2d", Middle, false, 13, 12),
            (b"\x1b[M\x41\x2e\x2d", Middle, true, 13, 12),
            (b"\x1b[M\x51\x2e\x2d", Middle, true, 13, 12),
            (b"\x1b[M\x61\x32\x4d", WheelDown, false, 17, 44),
            (b"\x1b[M\x71\x32\x4d", WheelDown, false, 17, 44),
            (b"\x1b[M\x81\x32\x4d", WheelDown, true, 17, 44),
            (b"\x1b[M\x91\x32\x4d", WheelDown, true, 17, 44),
            (b"\x1b[M\x22\x2e\x2d", Right, false, 13, 12),
            (b"\x1b[M\x32\x2e\x2d", Right, false, 13, 12),
            (b"\x1b[M\x42\x2e\x2d", Right, true, 13, 12),
            (b"\x1b[M\x52\x2e\x2d", Right, true, 13, 12),
            (b"\x1b[M\x23\x2e\x2d", Release, false, 13, 12),
            (b"\x1b[M\x33\x2e\x2d", Release, false, 13, 12),
            (b"\x1b[M\x43\x2e\x2d", Release, true, 13, 12),
            (b"\x1b[M\x53\x2e\x2d", Release, true, 13, 12),
            // urxvt 1015
            (b"\x1b[20;49;13M", WheelUp, true, 48, 12),
            (b"\x1b[244;49;13M", WheelUp, false, 48, 12),
            (b"\x1b[21;49;13M", WheelDown, true, 48, 12),
            (b"\x1b[245;49;13M", WheelDown, false, 48, 12),
            (b"\x1b[32;49;13M", Left, false, 48, 12),
            (b"\x1b[64;100;2M", Left, true, 99, 1),
            (b"\x1b[10;49;13M", Right, true, 48, 12),
            (b"\x1b[42;49;13M", Right, false, 48, 12),
            (b"\x1b[11;49;13M", Release, true, 48, 12),
            (b"\x1b[43;49;13M", Release, false, 48, 12),
            (b"\x1b[33;49;13M", Middle, false, 48, 12),
            (b"\x1b[65;49;13M", Middle, true, 48, 12),
        ];

        for &(input, button, motion, x, y) in table {
            let m = mouse(input);
            assert_eq!(m.button, button, "{input:?}");
            assert_eq!((m.x, m.y), (x, y), "{input:?}");
            assert_eq!(m.modifiers.contains(Modifiers::MOTION), motion, "{input:?}");
        }
    }

    #[test]
    fn mouse_coordinates_below_origin_clamp_to_zero() {
        let m = mouse(b"\x1b[<0;0;0M");
        assert_eq!((m.x, m.y), (0, 0));
        let m = mouse(b"\x1b[M\x20\x20\x20");
        assert_eq!((m.x, m.y), (0, 0));
    }

    #[test]
    fn partial_mouse_reports_wait() {
        for partial in [
            &b"\x1b[M"[..],
            b"\x1b[M\x20\x2e",
            b"\x1b[<",
            b"\x1b[<0;49",
            b"\x1b[<0;49;13",
            b"\x1b[64;100",
        ] {
            assert_eq!(decoder().decode(partial, InputMode::ESC), Decoded::Incomplete, "{partial:?}");
        }
    }

    #[test]
    fn urxvt_rejects_lowercase_terminator() {
        // Falls back to a bare Escape; the rest decodes as characters.
        assert_eq!(
            decoder().decode(b"\x1b[32;49;13m", InputMode::ESC),
            Decoded::Event(Event::key(KeyCode::Escape), 1)
        );
    }

    #[test]
    fn decimal_report_needs_three_fields() {
        for bad in [&b"\x1b[<0;49M"[..], b"\x1b[<0;49;13;1M", b"\x1b[<;49;13M"] {
            assert_eq!(
                decoder().decode(bad, InputMode::ESC),
                Decoded::Event(Event::key(KeyCode::Escape), 1),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn runaway_decimal_report_is_abandoned() {
        let mut long = b"\x1b[<".to_vec();
        long.extend(std::iter::repeat_n(b'1', 40));
        assert_eq!(
            decoder().decode(&long, InputMode::ESC),
            Decoded::Event(Event::key(KeyCode::Escape), 1)
        );
    }

    #[test]
    fn mouse_report_followed_by_key() {
        let d = decoder().decode(b"\x1b[<0;49;13Mq", InputMode::ESC);
        assert!(matches!(d, Decoded::Event(Event::Mouse(_), 11)));
    }

    #[test]
    fn alt_prefix_applies_to_mouse() {
        let ev = one_in(b"\x1b\x1b[<0;1;1M", InputMode::ALT);
        let Event::Mouse(m) = ev else { panic!("{ev:?}") };
        assert!(m.modifiers.contains(Modifiers::ALT));
    }

    // ── InputMode ───────────────────────────────────────────────────────

    #[test]
    fn input_mode_normalization() {
        assert_eq!(InputMode::MOUSE.normalized(), InputMode::ESC | InputMode::MOUSE);
        assert_eq!((InputMode::ESC | InputMode::ALT).normalized(), InputMode::ESC);
        assert_eq!(InputMode::ALT.normalized(), InputMode::ALT);
        assert!(InputMode::ALT.alt_prefix());
        assert!(!(InputMode::ESC | InputMode::ALT).alt_prefix());
    }

    // ── Event equality ──────────────────────────────────────────────────

    #[test]
    fn error_events_compare_by_identity() {
        let err = Arc::new(Error::Disconnected);
        assert_eq!(Event::Error(Arc::clone(&err)), Event::Error(Arc::clone(&err)));
        assert_ne!(Event::Error(err), Event::Error(Arc::new(Error::Disconnected)));
    }
}
