// SPDX-License-Identifier: MIT
//
// cellbox-term — a cell-grid terminal layer for raw-mode applications.
//
// The application draws characters into a back buffer; `flush` compares it
// with the front buffer (what the terminal already shows) and writes only
// the cells that changed, with cursor moves and SGR changes coalesced, in
// a single write. Input is read on a background thread, decoded into key
// and mouse events (X10, SGR 1006 and urxvt 1015 reports) and delivered
// through one blocking `poll_event`, together with window resizes and
// interrupts from other threads.
//
// There is no terminfo database lookup: the escape vocabulary for each
// supported terminal family is compiled in, with a prefix fallback for
// unknown `$TERM` values.
//
// Layering, leaf first:
//
//   cell, color, buffer        data model and color quantization
//   terminfo, ansi, output     escape vocabulary and emission
//   diff                       the flush engine
//   input                      events and the escape decoder
//   terminal, signal, reader   tty device, signal thread, reader thread
//   pipeline                   the poll side of the event pipeline
//   session                    the client-facing `Session`

#[cfg(not(unix))]
compile_error!("cellbox-term drives a Unix tty and only builds on Unix targets");

pub mod ansi;
pub mod buffer;
pub mod cell;
pub mod color;
pub mod config;
pub mod diff;
pub mod error;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod reader;
pub mod session;
pub mod signal;
pub mod terminal;
pub mod terminfo;

pub use buffer::CellBuffer;
pub use cell::{Attribute, Cell};
pub use color::OutputMode;
pub use config::{Config, EscapeKey};
pub use error::{Error, Result};
pub use input::{Event, InputMode, KeyCode, KeyEvent, Modifiers, MouseButton, MouseEvent};
pub use pipeline::{Feeder, Interrupter};
pub use session::Session;
pub use terminal::Size;
