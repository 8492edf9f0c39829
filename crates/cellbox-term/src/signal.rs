// SPDX-License-Identifier: MIT
//
// SIGWINCH and SIGIO delivery.
//
// A dedicated thread iterates signal-hook's pending signals and turns them
// into channel pokes, so nothing in the crate runs inside a signal handler.
// SIGIO wakes the tty reader. SIGWINCH is fanned out to every resize
// listener (the poller and the renderer each get their own channel).
//
// All sends are `try_send` into capacity-1 channels: a storm of signals
// collapses into one pending notification, and the receiver queries the
// authoritative state (bytes available, window size) itself.

use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use signal_hook::iterator::{Handle, Signals};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Owns the signal thread. Unregisters and joins on drop.
#[derive(Debug)]
pub struct SignalGuard {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalGuard {
    /// Start forwarding SIGIO to `ready` and SIGWINCH to each of `resize`.
    ///
    /// # Errors
    ///
    /// [`Error::Signal`] if the handlers cannot be registered or the
    /// thread cannot be spawned.
    pub fn install(ready: Sender<()>, resize: Vec<Sender<()>>) -> Result<Self> {
        let mut signals = Signals::new([libc::SIGWINCH, libc::SIGIO]).map_err(Error::Signal)?;
        let handle = signals.handle();

        let thread = thread::Builder::new()
            .name("tty-signals".into())
            .spawn(move || {
                for signal in signals.forever() {
                    trace!(signal, "signal received");
                    if signal == libc::SIGIO {
                        let _ = ready.try_send(());
                    } else {
                        for tx in &resize {
                            let _ = tx.try_send(());
                        }
                    }
                }
                debug!("signal thread stopped");
            })
            .map_err(|e| {
                handle.close();
                Error::Signal(e)
            })?;

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                debug!("signal thread panicked");
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
