// SPDX-License-Identifier: MIT
//
// Terminal device — raw mode, window size and panic-safe restore.
//
// Safety: termios (tcgetattr, tcsetattr), ioctl (TIOCGWINSZ), fcntl and
// raw fd writes have no safe std equivalent. Each unsafe block is one call.
#![allow(unsafe_code)]
//
// The session talks to the controlling terminal through two descriptors on
// the same device: a write handle for output and a read handle that is
// non-blocking and signal-driven (O_ASYNC, owner = this process), so every
// arrival of input raises SIGIO and the reader thread drains until EAGAIN.
//
// Raw mode is undone on drop, so any `?` between entering raw mode and the
// end of `init` leaves the user's terminal as it was. The panic hook covers
// the case drop never gets to run: it writes a fixed restore sequence
// straight to the tty descriptor and resets termios from a global backup
// before the original hook prints the message.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::sync::{Mutex, Once};

use tracing::{debug, warn};

use crate::error::{Error, Result};

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Size {
    /// Number of columns.
    pub cols: u16,
    /// Number of rows.
    pub rows: u16,
}

impl Size {
    #[inline]
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Total number of cells (`cols × rows`).
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.cols as u32 * self.rows as u32
    }
}

/// Size used when the window size cannot be queried.
pub const FALLBACK_SIZE: Size = Size::new(80, 24);

/// Query the window size of `fd` via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if `fd` is not a terminal or reports a zero dimension.
#[must_use]
pub fn get_size(fd: RawFd) -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &raw mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size::new(ws.ws_col, ws.ws_row))
    } else {
        None
    }
}

// ─── Panic-Safe Restore ─────────────────────────────────────────────────────

/// Termios to restore per tty descriptor if the process panics while
/// those descriptors are in raw mode.
static TERMIOS_BACKUP: Mutex<Vec<(RawFd, libc::termios)>> = Mutex::new(Vec::new());

/// Restore sequence for emergency use: show cursor, reset attributes,
/// disable every mouse mode, leave keypad mode, exit the alternate screen.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?25h\
    \x1b[0m\
    \x1b[?1006l\x1b[?1015l\x1b[?1002l\x1b[?1000l\
    \x1b[?1l\x1b>\
    \x1b[?1049l";

static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install (once per process) a hook that restores the terminal before the
/// original panic handler runs.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            original(info);
        }));
    });
}

/// Write [`EMERGENCY_RESTORE`] to every tty in raw mode and reset its termios.
///
/// Raw `write(2)` so no lock held by the panicking thread can block it.
fn emergency_restore() {
    let Ok(guard) = TERMIOS_BACKUP.lock() else {
        return;
    };
    for &(fd, ref original) in guard.iter().rev() {
        unsafe {
            let _ = libc::write(
                fd,
                EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
                EMERGENCY_RESTORE.len(),
            );
            let _ = libc::tcsetattr(fd, libc::TCSANOW, original);
        }
    }
}

fn remember_termios(fd: RawFd, original: libc::termios) {
    if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
        guard.retain(|(f, _)| *f != fd);
        guard.push((fd, original));
    }
}

fn forget_termios(fd: RawFd) {
    if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
        guard.retain(|(f, _)| *f != fd);
    }
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// An open terminal device with RAII termios restore.
pub struct Terminal {
    out: File,
    input: File,
    original: libc::termios,
    raw: bool,
}

impl Terminal {
    /// Open `path` for output and for non-blocking input, and save its
    /// current termios.
    ///
    /// # Errors
    ///
    /// [`Error::Open`] if either handle cannot be opened, [`Error::Termios`]
    /// if the device is not a terminal.
    pub fn open(path: &Path) -> Result<Self> {
        let open_err = |source| Error::Open {
            path: path.to_path_buf(),
            source,
        };
        let out = OpenOptions::new().write(true).open(path).map_err(open_err)?;
        let input = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(open_err)?;

        let mut original: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(out.as_raw_fd(), &raw mut original) } != 0 {
            return Err(Error::termios("tcgetattr"));
        }

        Ok(Self {
            out,
            input,
            original,
            raw: false,
        })
    }

    /// Make the input descriptor signal-driven: non-blocking, O_ASYNC, and
    /// owned by this process so SIGIO is delivered here.
    ///
    /// # Errors
    ///
    /// [`Error::Termios`] if `fcntl` fails. `F_SETOWN` failures are ignored
    /// on macOS, where the call is refused for ttys.
    pub fn enable_async_input(&self) -> Result<()> {
        let fd = self.input.as_raw_fd();
        if unsafe { libc::fcntl(fd, libc::F_SETFL, libc::O_ASYNC | libc::O_NONBLOCK) } == -1 {
            return Err(Error::termios("fcntl(F_SETFL)"));
        }
        if unsafe { libc::fcntl(fd, libc::F_SETOWN, libc::getpid()) } == -1 {
            if cfg!(target_os = "macos") {
                debug!("F_SETOWN refused, continuing");
            } else {
                return Err(Error::termios("fcntl(F_SETOWN)"));
            }
        }
        Ok(())
    }

    /// Switch to raw mode. The saved termios is restored on drop.
    ///
    /// # Errors
    ///
    /// [`Error::Termios`] if `tcsetattr` fails.
    pub fn enable_raw_mode(&mut self) -> Result<()> {
        install_panic_hook();

        let fd = self.out.as_raw_fd();
        let mut tios = self.original;

        // cfmakeraw equivalent: no line discipline, no echo, no signals.
        tios.c_iflag &= !(libc::IGNBRK
            | libc::BRKINT
            | libc::PARMRK
            | libc::ISTRIP
            | libc::INLCR
            | libc::IGNCR
            | libc::ICRNL
            | libc::IXON);
        tios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
        tios.c_cflag &= !(libc::CSIZE | libc::PARENB);
        tios.c_cflag |= libc::CS8;
        tios.c_cc[libc::VMIN] = 1;
        tios.c_cc[libc::VTIME] = 0;

        remember_termios(fd, self.original);
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const tios) } != 0 {
            let err = Error::termios("tcsetattr");
            forget_termios(fd);
            return Err(err);
        }
        self.raw = true;
        Ok(())
    }

    /// Put the saved termios back. No-op if raw mode is not active.
    ///
    /// # Errors
    ///
    /// [`Error::Termios`] if `tcsetattr` fails.
    pub fn restore(&mut self) -> Result<()> {
        if !self.raw {
            return Ok(());
        }
        self.raw = false;
        let fd = self.out.as_raw_fd();
        forget_termios(fd);
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const self.original) } != 0 {
            return Err(Error::termios("tcsetattr"));
        }
        Ok(())
    }

    /// Current window size, or [`FALLBACK_SIZE`] if it cannot be queried.
    #[must_use]
    pub fn size(&self) -> Size {
        get_size(self.out.as_raw_fd()).unwrap_or(FALLBACK_SIZE)
    }

    /// A second handle on the input descriptor, for the reader thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor cannot be duplicated.
    pub fn input(&self) -> io::Result<File> {
        self.input.try_clone()
    }

    /// The output handle.
    #[inline]
    pub fn writer(&mut self) -> &mut File {
        &mut self.out
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            warn!(%err, "failed to restore terminal mode");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
