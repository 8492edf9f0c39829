// SPDX-License-Identifier: MIT
//
// Poll side of the event pipeline.
//
// Bytes arrive from the reader thread (or a `Feeder`) over a rendezvous
// channel and are appended to a staging buffer; events are decoded off its
// front. `poll` returns as soon as one event is decodable and otherwise
// blocks on four sources at once:
//
// - input        append, hand the buffer back, retry the decode
// - interrupt    `Event::Interrupt`, staging buffer untouched
// - resize       `Event::Resize` with a freshly queried size
// - timeout      armed only while undecoded bytes wait; on expiry the
//                front of the buffer is decoded as if nothing more will
//                come (lone ESC, truncated sequences)
//
// The reader blocks until its buffer comes back, so at most one chunk is
// ever in flight and input order is preserved end to end.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, after, bounded, never, select};
use tracing::debug;

use crate::error::{Error, Result};
use crate::input::{Decoded, Decoder, Event, InputMode};
use crate::reader::Chunk;
use crate::terminal::Size;

/// Default time to wait for the rest of an escape sequence.
pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(25);

// ─── Link ───────────────────────────────────────────────────────────────────

/// The poller's ends of the channels to a reader.
pub struct Link {
    /// Chunks from the reader (rendezvous).
    pub input: Receiver<Chunk>,
    /// Consumed buffers going back to the reader.
    pub returned: Sender<Vec<u8>>,
    /// Coalesced resize notifications.
    pub resize: Receiver<()>,
}

// ─── Input Pipeline ─────────────────────────────────────────────────────────

/// Staging buffer plus the channels `poll` selects over.
pub struct InputPipeline {
    inbuf: Vec<u8>,
    interrupt_tx: Sender<()>,
    interrupt_rx: Receiver<()>,
    link: Option<Link>,
    escape_timeout: Duration,
}

impl InputPipeline {
    #[must_use]
    pub fn new(escape_timeout: Duration) -> Self {
        let (interrupt_tx, interrupt_rx) = bounded(0);
        Self {
            inbuf: Vec::new(),
            interrupt_tx,
            interrupt_rx,
            link: None,
            escape_timeout,
        }
    }

    /// Attach to a reader. Anything left staged from a previous link is
    /// discarded.
    pub fn connect(&mut self, link: Link) {
        self.inbuf.clear();
        self.link = Some(link);
    }

    /// Detach from the reader.
    pub fn disconnect(&mut self) {
        self.link = None;
    }

    /// Bytes received but not yet decoded.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.inbuf
    }

    /// A handle other threads can use to wake a blocked `poll`.
    #[must_use]
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            tx: self.interrupt_tx.clone(),
        }
    }

    /// Block until one event is available.
    ///
    /// `size` is called to produce the payload of a resize event.
    pub fn poll(
        &mut self,
        decoder: &Decoder,
        mode: InputMode,
        size: &mut dyn FnMut() -> Size,
    ) -> Event {
        let Some(link) = &self.link else {
            return Event::Error(Arc::new(Error::NotInitialized));
        };

        loop {
            if let Some(event) = extract(&mut self.inbuf, decoder, mode, false) {
                return event;
            }

            let timeout = if self.inbuf.is_empty() {
                never()
            } else {
                after(self.escape_timeout)
            };

            select! {
                recv(link.input) -> chunk => match chunk {
                    Ok(Ok(bytes)) => {
                        self.inbuf.extend_from_slice(&bytes);
                        hand_back(link, bytes);
                    }
                    Ok(Err(err)) => return Event::Error(Arc::new(Error::Read(err))),
                    Err(_) => return Event::Error(Arc::new(Error::Disconnected)),
                },
                recv(self.interrupt_rx) -> _ => return Event::Interrupt,
                recv(link.resize) -> msg => return match msg {
                    Ok(()) => Event::Resize(size()),
                    Err(_) => Event::Error(Arc::new(Error::Disconnected)),
                },
                recv(timeout) -> _ => {
                    if let Some(event) = extract(&mut self.inbuf, decoder, mode, true) {
                        return event;
                    }
                }
            }
        }
    }

    /// Block until input is available and copy it, undecoded, into `data`.
    ///
    /// Returns `Event::Raw(n)` with the number of bytes copied. Interrupts
    /// and resizes are reported as in [`poll`](Self::poll).
    pub fn poll_raw(&mut self, data: &mut [u8], size: &mut dyn FnMut() -> Size) -> Event {
        let Some(link) = &self.link else {
            return Event::Error(Arc::new(Error::NotInitialized));
        };
        if data.is_empty() {
            return Event::Raw(0);
        }

        loop {
            if !self.inbuf.is_empty() {
                let n = self.inbuf.len().min(data.len());
                data[..n].copy_from_slice(&self.inbuf[..n]);
                self.inbuf.drain(..n);
                return Event::Raw(n);
            }

            select! {
                recv(link.input) -> chunk => match chunk {
                    Ok(Ok(bytes)) => {
                        self.inbuf.extend_from_slice(&bytes);
                        hand_back(link, bytes);
                    }
                    Ok(Err(err)) => return Event::Error(Arc::new(Error::Read(err))),
                    Err(_) => return Event::Error(Arc::new(Error::Disconnected)),
                },
                recv(self.interrupt_rx) -> _ => return Event::Interrupt,
                recv(link.resize) -> msg => return match msg {
                    Ok(()) => Event::Resize(size()),
                    Err(_) => Event::Error(Arc::new(Error::Disconnected)),
                },
            }
        }
    }
}

/// Return a delivered buffer to the reader, which waits for it before
/// reading again.
fn hand_back(link: &Link, bytes: Vec<u8>) {
    if link.returned.send(bytes).is_err() {
        debug!("reader gone, buffer not returned");
    }
}

/// Decode one event off the front of `inbuf`, dropping undecodable bytes.
fn extract(inbuf: &mut Vec<u8>, decoder: &Decoder, mode: InputMode, settle: bool) -> Option<Event> {
    loop {
        let decoded = if settle {
            decoder.decode_settled(inbuf, mode)
        } else {
            decoder.decode(inbuf, mode)
        };
        match decoded {
            Decoded::Event(event, n) => {
                inbuf.drain(..n);
                return Some(event);
            }
            Decoded::Incomplete => return None,
            Decoded::Malformed(n) => {
                let n = n.clamp(1, inbuf.len());
                debug!(bytes = ?&inbuf[..n], "dropping undecodable input");
                inbuf.drain(..n);
            }
        }
    }
}

// ─── Interrupter ────────────────────────────────────────────────────────────

/// Wakes a blocked `poll` from another thread.
#[derive(Debug, Clone)]
pub struct Interrupter {
    tx: Sender<()>,
}

impl Interrupter {
    /// Deliver an interrupt, blocking until a poll accepts it.
    ///
    /// # Errors
    ///
    /// [`Error::Disconnected`] if the session has been dropped.
    pub fn interrupt(&self) -> Result<()> {
        self.tx.send(()).map_err(|_| Error::Disconnected)
    }
}

// ─── Feeder ─────────────────────────────────────────────────────────────────

/// The reader end of a headless pipeline.
///
/// Stands in for the tty reader thread: `send` hands bytes to the poller
/// with the same rendezvous and buffer-return protocol.
pub struct Feeder {
    input: Sender<Chunk>,
    returned: Receiver<Vec<u8>>,
    resize: Vec<Sender<()>>,
    size: Arc<Mutex<Size>>,
}

impl Feeder {
    /// Create a feeder and the matching poller link.
    ///
    /// `resize` calls update `size` and notify the link plus every sender
    /// in `listeners`.
    #[must_use]
    pub fn pair(size: Arc<Mutex<Size>>, listeners: Vec<Sender<()>>) -> (Self, Link) {
        let (input_tx, input_rx) = bounded(0);
        let (return_tx, return_rx) = bounded(0);
        let (resize_tx, resize_rx) = bounded(1);

        let mut resize = listeners;
        resize.push(resize_tx);

        let feeder = Self {
            input: input_tx,
            returned: return_rx,
            resize,
            size,
        };
        let link = Link {
            input: input_rx,
            returned: return_tx,
            resize: resize_rx,
        };
        (feeder, link)
    }

    /// Hand `bytes` to the poller and wait for the buffer to come back.
    ///
    /// # Errors
    ///
    /// [`Error::Disconnected`] if the poller side is gone.
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        self.input
            .send(Ok(bytes.to_vec()))
            .map_err(|_| Error::Disconnected)?;
        self.returned.recv().map_err(|_| Error::Disconnected)?;
        Ok(())
    }

    /// Deliver a read failure.
    ///
    /// # Errors
    ///
    /// [`Error::Disconnected`] if the poller side is gone.
    pub fn send_error(&self, err: std::io::Error) -> Result<()> {
        self.input.send(Err(err)).map_err(|_| Error::Disconnected)
    }

    /// Change the reported window size and notify resize listeners.
    pub fn resize(&self, size: Size) {
        *self.size.lock().unwrap_or_else(PoisonError::into_inner) = size;
        for tx in &self.resize {
            let _ = tx.try_send(());
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
