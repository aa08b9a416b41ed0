//! Duplex frame pipe backing an AWDL interface.
//!
//! A pipe is two single-slot queues, one per direction. [`channel`] returns
//! both ends: the link end is handed to the mesh link layer, the transport end
//! stays with the interface and is pumped by whatever moves frames over the air.
//!
//! Only the crate closes a pipe: interfaces close theirs on shutdown or when
//! their link handler finishes.
//!
//! Reads never wait. A read with nothing pending reports [`PipeError::Empty`],
//! which is distinct from [`PipeError::Closed`]. Writes wait until the peer has
//! drained the previous frame.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Depth of each direction's queue.
pub const PIPE_QUEUE_DEPTH: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PipeError {
    /// Nothing is pending right now. The pipe is still open.
    #[error("no frame pending")]
    Empty,

    #[error("pipe closed")]
    Closed,
}

struct PipeState {
    closed: AtomicBool,
    cancel: CancellationToken,
}

/// One side of a duplex frame pipe.
///
/// Clones share the same queues. Closing any end closes the whole pipe.
#[derive(Clone)]
pub struct PipeEnd {
    tx: mpsc::Sender<Vec<u8>>,
    rx: Arc<Mutex<mpsc::Receiver<Vec<u8>>>>,
    state: Arc<PipeState>,
}

/// Creates a pipe and returns `(link_end, transport_end)`.
///
/// Frames written on the transport end are read on the link end (inbound) and
/// frames written on the link end are read on the transport end (outbound).
pub fn channel() -> (PipeEnd, PipeEnd) {
    let (inbound_tx, inbound_rx) = mpsc::channel(PIPE_QUEUE_DEPTH);
    let (outbound_tx, outbound_rx) = mpsc::channel(PIPE_QUEUE_DEPTH);

    let state =
        Arc::new(PipeState { closed: AtomicBool::new(false), cancel: CancellationToken::new() });

    let link = PipeEnd {
        tx: outbound_tx,
        rx: Arc::new(Mutex::new(inbound_rx)),
        state: state.clone(),
    };
    let transport = PipeEnd { tx: inbound_tx, rx: Arc::new(Mutex::new(outbound_rx)), state };

    (link, transport)
}

impl PipeEnd {
    /// Copies the pending frame into `buf` without waiting.
    ///
    /// Bytes of the frame beyond `buf.len()` are discarded, so callers size
    /// `buf` to the largest frame they expect.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, PipeError> {
        if self.is_closed() {
            return Err(PipeError::Closed);
        }

        // A concurrent `recv` holds the receiver; nothing is available to us.
        let mut rx = self.rx.try_lock().map_err(|_| PipeError::Empty)?;

        match rx.try_recv() {
            Ok(frame) => {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                Ok(len)
            }
            Err(TryRecvError::Empty) => Err(PipeError::Empty),
            Err(TryRecvError::Disconnected) => Err(PipeError::Closed),
        }
    }

    /// Waits for the next whole frame.
    pub async fn recv(&self) -> Result<Vec<u8>, PipeError> {
        if self.is_closed() {
            return Err(PipeError::Closed);
        }

        let mut rx = tokio::select! {
            biased;
            _ = self.state.cancel.cancelled() => return Err(PipeError::Closed),
            rx = self.rx.lock() => rx,
        };

        tokio::select! {
            biased;
            _ = self.state.cancel.cancelled() => Err(PipeError::Closed),
            frame = rx.recv() => frame.ok_or(PipeError::Closed),
        }
    }

    /// Queues a copy of `buf` for the other end, waiting while the slot is full.
    ///
    /// Returns `buf.len()` once the frame is accepted.
    pub async fn write(&self, buf: &[u8]) -> Result<usize, PipeError> {
        if self.is_closed() {
            return Err(PipeError::Closed);
        }

        tokio::select! {
            biased;
            _ = self.state.cancel.cancelled() => Err(PipeError::Closed),
            sent = self.tx.send(buf.to_vec()) => {
                sent.map(|()| buf.len()).map_err(|_| PipeError::Closed)
            }
        }
    }

    /// Closes both directions. Returns `false` if the pipe was already closed.
    ///
    /// Only the owning interface closes its pipe, so a registered interface
    /// always has an open one.
    pub(crate) fn close(&self) -> bool {
        if self.state.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.state.cancel.cancel();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Resolves once the pipe has been closed from either end.
    pub async fn closed(&self) {
        self.state.cancel.cancelled().await
    }
}

impl fmt::Debug for PipeEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeEnd").field("closed", &self.is_closed()).finish()
    }
}
