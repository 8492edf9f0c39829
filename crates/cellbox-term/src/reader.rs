// SPDX-License-Identifier: MIT
//
// Background tty reader with rendezvous hand-off.
//
// The input descriptor is non-blocking and signal-driven: every arrival of
// bytes raises SIGIO, the signal thread pokes `ready`, and this thread
// drains the descriptor until it would block. Each chunk is handed to the
// poller over a zero-capacity channel, and the reader then waits for the
// poller to send the buffer back before reading again. One buffer, one
// chunk in flight, no unbounded queue between the tty and the decoder.
//
// Shutdown: dropping the quit sender disconnects `quit`, which every
// blocking `select!` in the loop also listens on.

use std::io::{self, Read};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, select};
use tracing::debug;

/// One read from the tty: the bytes, or the error that ended the drain.
pub type Chunk = io::Result<Vec<u8>>;

/// Channel ends the reader thread works with.
pub struct ReaderChannels {
    /// Readiness notifications (one per SIGIO).
    pub ready: Receiver<()>,
    /// Rendezvous channel to the poller.
    pub input: Sender<Chunk>,
    /// Buffers handed back by the poller once consumed.
    pub returned: Receiver<Vec<u8>>,
}

/// Background reader thread. Stops on [`stop`](Self::stop) or drop.
pub struct TtyReader {
    /// Dropping this wakes the thread out of any `select!`.
    quit: Option<Sender<()>>,
    /// `None` after `stop()` joins it.
    handle: Option<JoinHandle<()>>,
}

/// Whether the drain ended normally or the reader must exit.
enum Flow {
    Idle,
    Quit,
}

impl TtyReader {
    /// Spawn the reader over `source`, reading at most `buf_size` bytes
    /// per chunk.
    ///
    /// Anything already pending on `source` is drained before the first
    /// readiness notification is awaited.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS cannot spawn the thread.
    pub fn spawn<R>(source: R, channels: ReaderChannels, buf_size: usize) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (quit_tx, quit_rx) = bounded::<()>(0);
        let buf_size = buf_size.max(1);

        let handle = thread::Builder::new()
            .name("tty-reader".into())
            .spawn(move || reader_loop(source, &channels, &quit_rx, buf_size))?;

        Ok(Self {
            quit: Some(quit_tx),
            handle: Some(handle),
        })
    }

    /// Signal the thread to exit and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.quit.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("tty reader thread panicked");
            }
        }
    }
}

impl Drop for TtyReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reader_loop<R: Read>(
    mut source: R,
    channels: &ReaderChannels,
    quit: &Receiver<()>,
    buf_size: usize,
) {
    debug!(buf_size, "tty reader started");
    let mut buf = Vec::with_capacity(buf_size);

    loop {
        if let Flow::Quit = drain(&mut source, &mut buf, channels, quit, buf_size) {
            break;
        }
        select! {
            recv(channels.ready) -> msg => if msg.is_err() { break },
            recv(quit) -> _ => break,
        }
    }
    debug!("tty reader stopped");
}

/// Read until the source would block, handing each chunk over in turn.
fn drain<R: Read>(
    source: &mut R,
    buf: &mut Vec<u8>,
    channels: &ReaderChannels,
    quit: &Receiver<()>,
    buf_size: usize,
) -> Flow {
    loop {
        buf.resize(buf_size, 0);
        let n = match source.read(buf) {
            Ok(0) => return Flow::Idle,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Flow::Idle,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                // The poller keeps nothing to return for an error.
                return select! {
                    send(channels.input, Err(e)) -> res => {
                        if res.is_err() { Flow::Quit } else { Flow::Idle }
                    },
                    recv(quit) -> _ => Flow::Quit,
                };
            }
        };
        buf.truncate(n);

        let chunk = std::mem::take(buf);
        select! {
            send(channels.input, Ok(chunk)) -> res => if res.is_err() { return Flow::Quit },
            recv(quit) -> _ => return Flow::Quit,
        }
        *buf = select! {
            recv(channels.returned) -> back => match back {
                Ok(back) => back,
                Err(_) => return Flow::Quit,
            },
            recv(quit) -> _ => return Flow::Quit,
        };
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    /// A source that plays back queued reads and would-block when empty.
    #[derive(Clone, Default)]
    struct Script(Arc<Mutex<VecDeque<io::Result<Vec<u8>>>>>);

    impl Script {
        fn push(&self, bytes: &[u8]) {
            self.0.lock().unwrap().push_back(Ok(bytes.to_vec()));
        }

        fn push_err(&self, kind: io::ErrorKind) {
            self.0.lock().unwrap().push_back(Err(io::Error::from(kind)));
        }
    }

    impl Read for Script {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut queue = self.0.lock().unwrap();
            match queue.pop_front() {
                None => Err(io::ErrorKind::WouldBlock.into()),
                Some(Err(e)) => Err(e),
                Some(Ok(mut bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        queue.push_front(Ok(bytes.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    struct Harness {
        reader: TtyReader,
        ready: Sender<()>,
        input: Receiver<Chunk>,
        returned: Sender<Vec<u8>>,
    }

    const WAIT: Duration = Duration::from_secs(5);

    fn spawn(script: &Script, buf_size: usize) -> Harness {
        let (ready_tx, ready_rx) = bounded(1);
        let (input_tx, input_rx) = bounded(0);
        let (return_tx, return_rx) = bounded(0);
        let channels = ReaderChannels {
            ready: ready_rx,
            input: input_tx,
            returned: return_rx,
        };
        let reader = TtyReader::spawn(script.clone(), channels, buf_size).unwrap();
        Harness {
            reader,
            ready: ready_tx,
            input: input_rx,
            returned: return_tx,
        }
    }

    impl Harness {
        /// Receive one chunk and hand its buffer back.
        fn take(&self) -> Vec<u8> {
            let bytes = self.input.recv_timeout(WAIT).unwrap().unwrap();
            let copy = bytes.clone();
            self.returned.send(bytes).unwrap();
            copy
        }
    }

    // ── Hand-off ──────────────────────────────────────────────────────

    #[test]
    fn pending_input_is_drained_at_start() {
        let script = Script::default();
        script.push(b"ab");
        script.push(b"c");
        let h = spawn(&script, 16);

        assert_eq!(h.take(), b"ab");
        assert_eq!(h.take(), b"c");
    }

    #[test]
    fn chunks_are_capped_at_buffer_size() {
        let script = Script::default();
        script.push(b"abcdef");
        let h = spawn(&script, 4);

        assert_eq!(h.take(), b"abcd");
        assert_eq!(h.take(), b"ef");
    }

    #[test]
    fn next_read_waits_for_buffer_return() {
        let script = Script::default();
        script.push(b"1");
        script.push(b"2");
        let h = spawn(&script, 16);

        let first = h.input.recv_timeout(WAIT).unwrap().unwrap();
        assert!(h.input.recv_timeout(Duration::from_millis(50)).is_err());

        h.returned.send(first).unwrap();
        assert_eq!(h.take(), b"2");
    }

    #[test]
    fn readiness_triggers_a_new_drain() {
        let script = Script::default();
        let h = spawn(&script, 16);
        assert!(h.input.recv_timeout(Duration::from_millis(50)).is_err());

        script.push(b"x");
        h.ready.send(()).unwrap();
        assert_eq!(h.take(), b"x");
    }

    // ── Errors ────────────────────────────────────────────────────────

    #[test]
    fn read_error_is_delivered_and_ends_the_drain() {
        let script = Script::default();
        script.push_err(io::ErrorKind::BrokenPipe);
        script.push(b"later");
        let h = spawn(&script, 16);

        let err = h.input.recv_timeout(WAIT).unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(h.input.recv_timeout(Duration::from_millis(50)).is_err());

        h.ready.send(()).unwrap();
        assert_eq!(h.take(), b"later");
    }

    #[test]
    fn interrupted_read_is_retried() {
        let script = Script::default();
        script.push_err(io::ErrorKind::Interrupted);
        script.push(b"ok");
        let h = spawn(&script, 16);

        assert_eq!(h.take(), b"ok");
    }

    // ── Lifecycle ─────────────────────────────────────────────────────

    #[test]
    fn stop_unblocks_a_pending_send() {
        let script = Script::default();
        script.push(b"never received");
        let mut h = spawn(&script, 16);

        h.reader.stop();
        assert!(h.reader.handle.is_none());
    }

    #[test]
    fn stop_is_idempotent() {
        let script = Script::default();
        let mut h = spawn(&script, 16);
        h.reader.stop();
        h.reader.stop();
    }

    #[test]
    fn drop_stops_thread() {
        let script = Script::default();
        let h = spawn(&script, 16);
        drop(h.reader);
        // The reader's side of the rendezvous is gone.
        assert!(h.input.recv_timeout(WAIT).is_err());
    }
}
