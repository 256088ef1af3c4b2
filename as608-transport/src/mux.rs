//! Shared-stream multiplexer
//!
//! One physical stream, many logical callers:
//!
//! ```text
//! caller 1 ─┐                         ┌─► waiter 1
//! caller 2 ─┼─► write lock ─► stream ─┤   reader task ─► drain registry
//! caller N ─┘                         └─► waiter N
//! ```
//!
//! Writes are serialized by an async lock held for a whole fragment
//! sequence. Reads belong to a single background task that only touches
//! the stream while at least one waiter is registered. Once a logical
//! exchange completes, its result is cloned to every registered waiter.
//! An exchange whose waiters all timed out is still read to its end, and
//! its result dropped, so the next caller does not get a late reply.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use as608_core::{constants::WAKE_TIMEOUT, ChunkSize, Packet};

use crate::codec;
use crate::error::{Error, Result};
use crate::waiter::{Delivery, WaiterId, WaiterRegistry};
use crate::Transport;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Background reader state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Parked until a waiter registers
    Idle,

    /// Decoding frames off the stream
    Reading,

    /// Handing the result to every registered waiter
    Delivering,

    /// Reader task ended
    Stopped,
}

struct Shared {
    waiters: parking_lot::Mutex<WaiterRegistry>,
    state: watch::Sender<ReaderState>,
    closed: AtomicBool,
}

impl Shared {
    fn set_state(&self, state: ReaderState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            trace!(from = ?previous, to = ?state, "Reader state");
        }
    }
}

/// Multiplexed transport over one duplex byte stream
///
/// The protocol has no request identifiers: a waiter receives whatever
/// exchange completes next. Callers keep to one send followed by its
/// receives before the next conversation starts.
pub struct Multiplexer {
    shared: Arc<Shared>,
    wake_tx: mpsc::Sender<()>,
    writer: tokio::sync::Mutex<BoxedWriter>,
    parked: parking_lot::Mutex<Option<(BoxedReader, mpsc::Receiver<()>)>>,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    chunk_size: parking_lot::Mutex<ChunkSize>,
}

impl Multiplexer {
    /// Wrap a duplex stream
    ///
    /// The reader task is not started until the first receive.
    pub fn new<S>(stream: S, chunk_size: ChunkSize) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::from_parts(reader, writer, chunk_size)
    }

    /// Build from separate read and write halves
    pub fn from_parts<R, W>(reader: R, writer: W, chunk_size: ChunkSize) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (wake_tx, wake_rx) = mpsc::channel(1);
        let (state, _) = watch::channel(ReaderState::Idle);

        Self {
            shared: Arc::new(Shared {
                waiters: parking_lot::Mutex::new(WaiterRegistry::new()),
                state,
                closed: AtomicBool::new(false),
            }),
            wake_tx,
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            parked: parking_lot::Mutex::new(Some((Box::new(reader), wake_rx))),
            task: parking_lot::Mutex::new(None),
            chunk_size: parking_lot::Mutex::new(chunk_size),
        }
    }

    /// Number of callers currently waiting for an exchange
    pub fn waiting(&self) -> usize {
        self.shared.waiters.lock().len()
    }

    /// Current reader state
    pub fn reader_state(&self) -> ReaderState {
        *self.shared.state.borrow()
    }

    /// Watch reader state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ReaderState> {
        self.shared.state.subscribe()
    }

    /// Check if the reader task has been spawned
    pub fn is_reader_started(&self) -> bool {
        self.task.lock().is_some()
    }

    fn ensure_reader(&self) {
        let Some((reader, wake_rx)) = self.parked.lock().take() else {
            return;
        };

        debug!("Starting background reader");
        let handle = tokio::spawn(run_reader(Arc::clone(&self.shared), reader, wake_rx));
        *self.task.lock() = Some(handle);
    }

    async fn register(&self) -> Result<(WaiterId, oneshot::Receiver<Delivery>)> {
        self.ensure_reader();

        let (id, rx) = {
            // close() drains under the same lock
            let mut waiters = self.shared.waiters.lock();
            if self.is_closed() {
                return Err(Error::Closed);
            }
            waiters.register()
        };
        trace!(waiter = ?id, "Registered waiter");

        self.wake().await;
        Ok((id, rx))
    }

    /// Nudge an idle reader
    ///
    /// A reader busy in a read does not take the wake within the window;
    /// it sees the new waiter when it next checks the registry.
    async fn wake(&self) {
        match self.wake_tx.send_timeout((), WAKE_TIMEOUT).await {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(())) => trace!("Reader busy, wake dropped"),
            Err(SendTimeoutError::Closed(())) => trace!("Reader stopped, wake dropped"),
        }
    }
}

#[async_trait]
impl Transport for Multiplexer {
    async fn send(&self, packet: &Packet) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let chunk_size = self.chunk_size();
        let mut writer = self.writer.lock().await;
        trace!("Sending: {:?}", packet);

        codec::write_packet(&mut *writer, packet, chunk_size).await
    }

    async fn receive(&self) -> Result<Packet> {
        let (_, rx) = self.register().await?;

        rx.await.unwrap_or(Err(Error::Closed))
    }

    async fn receive_timeout(&self, timeout: Duration) -> Result<Packet> {
        let (id, rx) = self.register().await?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(delivery) => delivery.unwrap_or(Err(Error::Closed)),
            Err(_) => {
                // A reply still owed for this exchange is dropped when it lands
                let retired = self.shared.waiters.lock().retire(id);
                if !retired {
                    warn!(waiter = ?id, "Result arrived as the receive timed out; discarded");
                }
                Err(Error::Timeout(timeout))
            }
        }
    }

    async fn close(&self) -> Result<()> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        debug!("Closing transport");

        let task = self.task.lock().take();
        if let Some(task) = task {
            task.abort();
        }
        self.parked.lock().take();

        // Registrations check the flag under this lock, so none slip in
        // after the drain
        let waiters = self.shared.waiters.lock().drain();
        for waiter in waiters {
            waiter.fulfil(Err(Error::Closed));
        }
        self.shared.set_state(ReaderState::Stopped);

        let mut writer = self.writer.lock().await;
        writer.shutdown().await?;

        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    fn chunk_size(&self) -> ChunkSize {
        *self.chunk_size.lock()
    }

    fn set_chunk_size(&self, chunk_size: ChunkSize) {
        debug!("Outbound chunk size: {}", chunk_size);
        *self.chunk_size.lock() = chunk_size;
    }
}

impl Drop for Multiplexer {
    /// An idle reader stops on its own once the wake sender is gone. A
    /// reader still owed a reply would block on the stream, so it is aborted.
    fn drop(&mut self) {
        let Some(task) = self.task.get_mut().take() else {
            return;
        };

        let busy = {
            let waiters = self.shared.waiters.lock();
            waiters.is_in_flight() || waiters.stale() > 0 || !waiters.is_empty()
        };
        if busy {
            task.abort();
            self.shared.set_state(ReaderState::Stopped);
        }
    }
}

/// Reader loop: Idle -> Reading -> Delivering -> Idle
async fn run_reader(
    shared: Arc<Shared>,
    mut reader: BoxedReader,
    mut wake_rx: mpsc::Receiver<()>,
) {
    loop {
        shared.set_state(ReaderState::Idle);

        loop {
            let started = shared.waiters.lock().begin_exchange();
            if started {
                break;
            }
            if wake_rx.recv().await.is_none() {
                debug!("Transport dropped, stopping reader");
                shared.set_state(ReaderState::Stopped);
                return;
            }
        }

        shared.set_state(ReaderState::Reading);
        let delivery = codec::read_packet(&mut reader).await;

        shared.set_state(ReaderState::Delivering);
        let finished = shared.waiters.lock().finish_exchange();
        let Some(waiters) = finished else {
            match &delivery {
                Ok(packet) => debug!("Discarding late reply {}", packet),
                Err(err) => debug!("Discarding late reply error: {}", err),
            }
            continue;
        };

        match &delivery {
            Ok(packet) => debug!(waiters = waiters.len(), "Delivering {}", packet),
            Err(err) if err.is_wire_error() => {
                warn!(waiters = waiters.len(), "Corrupted exchange: {}", err)
            }
            Err(err) => warn!(waiters = waiters.len(), "Delivering error: {}", err),
        }
        for waiter in waiters {
            waiter.fulfil(delivery.clone());
        }
    }
}
