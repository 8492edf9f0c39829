// SPDX-License-Identifier: MIT
//
// Session configuration.
//
// Every field has a default, so an empty file (or no file) is a valid
// configuration:
//
// ```toml
// tty_path = "/dev/tty"
// term = "xterm-256color"      # overrides $TERM
// escape_key = "alt"           # "esc" | "alt"
// mouse = true
// output_mode = "color256"     # "normal" | "color256" | "color216" | "grayscale"
// escape_timeout_ms = 25
// read_buffer_size = 128
// ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::OutputMode;
use crate::error::{Error, Result};
use crate::input::InputMode;

/// How a lone or leading ESC byte is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeKey {
    /// ESC is the Escape key.
    #[default]
    Esc,
    /// ESC followed by a key is that key with Alt held.
    Alt,
}

/// Settings applied when a session is created and initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Terminal device to open.
    pub tty_path: PathBuf,
    /// Terminal type; `$TERM` when unset.
    pub term: Option<String>,
    pub escape_key: EscapeKey,
    /// Enable mouse reporting on init.
    pub mouse: bool,
    pub output_mode: OutputMode,
    /// How long to wait for the rest of an escape sequence.
    pub escape_timeout_ms: u64,
    /// Largest chunk the reader hands over at once.
    pub read_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tty_path: PathBuf::from("/dev/tty"),
            term: None,
            escape_key: EscapeKey::Esc,
            mouse: false,
            output_mode: OutputMode::Normal,
            escape_timeout_ms: 25,
            read_buffer_size: 128,
        }
    }
}

impl Config {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the document is not valid.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, [`Error::Config`] if it
    /// is not valid.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_toml_str(&text)
    }

    /// Input mode the session starts in.
    #[must_use]
    pub fn input_mode(&self) -> InputMode {
        let base = match self.escape_key {
            EscapeKey::Esc => InputMode::ESC,
            EscapeKey::Alt => InputMode::ALT,
        };
        if self.mouse {
            base | InputMode::MOUSE
        } else {
            base
        }
    }

    #[must_use]
    pub const fn escape_timeout(&self) -> Duration {
        Duration::from_millis(self.escape_timeout_ms)
    }

    /// The terminal type to use: the override, else `$TERM`. Empty values
    /// count as unset.
    #[must_use]
    pub fn term_name(&self) -> Option<String> {
        self.term
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var("TERM").ok().filter(|t| !t.is_empty()))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
