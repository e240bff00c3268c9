//! Background pump - decoupling blocking transport I/O from consumer polling.
//!
//! [`BackgroundPump`] runs a [`FrameReader`] read-decode loop on its own tokio
//! task and buffers decoded messages into a lock-protected queue. Consumers
//! poll the queue with [`drain`](BackgroundPump::drain) /
//! [`get`](BackgroundPump::get) / [`wait`](BackgroundPump::wait) and never
//! touch the transport.
//!
//! # Architecture
//!
//! ```text
//! Transport ─► FrameReader ─► decode ─► Mutex<VecDeque> ─► drain()/get()
//!              (producer task, strictly one)               (consumer, strictly one)
//! ```
//!
//! # Lifecycle
//!
//! Closed (initial) → Open (producer running) → Closed (terminal). The pump
//! reaches the terminal state through [`close`](BackgroundPump::close) or
//! producer exhaustion (transport closure); it cannot be reopened.
//!
//! `close()` never returns with a live producer: it signals the cooperative
//! stop flag, waits a grace period, force-cancels the task as a fallback, and
//! reports [`NodelineError::ShutdownStalled`] if even that fails to stick.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::decode::Message;
use crate::error::{NodelineError, Result};
use crate::reader::{FrameReader, PollStatus};
use crate::transport::Transport;

/// Default per-cycle poll timeout for the producer loop.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Default interval between queue-length checks in [`BackgroundPump::wait`].
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_millis(100);

/// Default grace period for each shutdown phase.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Configuration for the pump.
#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// How long each producer poll cycle waits for a complete frame.
    pub poll_timeout: Duration,
    /// Fixed interval between queue-length checks while waiting.
    pub wait_interval: Duration,
    /// Grace period for the cooperative stop, and again for the forced one.
    pub shutdown_grace: Duration,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            wait_interval: DEFAULT_WAIT_INTERVAL,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// State crossing the producer/consumer boundary.
///
/// The queue is the only shared structure; the receive buffer stays exclusively
/// owned by the producer inside its [`FrameReader`].
struct Shared {
    queue: Mutex<VecDeque<Message>>,
    /// Cooperative stop request, checked before and after every poll cycle.
    stop: AtomicBool,
    /// True while the producer loop is running.
    open: AtomicBool,
}

impl Shared {
    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<Message>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Buffers a frame-producing reader behind a pollable, cancelable queue.
pub struct BackgroundPump<T: Transport> {
    /// Taken by the producer task on first open.
    reader: Option<FrameReader<T>>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
    config: PumpConfig,
}

impl<T: Transport> BackgroundPump<T> {
    /// Create a pump over `reader` with default configuration.
    ///
    /// The pump starts Closed; call [`open`](Self::open) to start producing.
    pub fn new(reader: FrameReader<T>) -> Self {
        Self::with_config(reader, PumpConfig::default())
    }

    /// Create a pump with custom configuration.
    pub fn with_config(reader: FrameReader<T>, config: PumpConfig) -> Self {
        Self {
            reader: Some(reader),
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                stop: AtomicBool::new(false),
                open: AtomicBool::new(false),
            }),
            handle: None,
            config,
        }
    }

    /// Start the producer task if it is not already running.
    ///
    /// Idempotent; a no-op while Open and after the terminal close.
    pub fn open(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let Some(reader) = self.reader.take() else {
            // Already closed once; Closed is terminal.
            return;
        };

        self.shared.stop.store(false, Ordering::Release);
        self.shared.open.store(true, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let poll_timeout = self.config.poll_timeout;
        self.handle = Some(tokio::spawn(producer_loop(reader, shared, poll_timeout)));
    }

    /// Whether the producer loop is currently running.
    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    /// Atomically swap out the queue contents and return them.
    ///
    /// Never blocks; returns an empty batch when nothing has arrived. Items
    /// are in producer arrival order.
    pub fn drain(&self) -> Vec<Message> {
        let mut queue = self.shared.lock_queue();
        std::mem::take(&mut *queue).into()
    }

    /// Pop the oldest queued message.
    ///
    /// With `block`, first waits until at least one item is queued or the pump
    /// is no longer open.
    pub async fn get(&self, block: bool) -> Result<Option<Message>> {
        if block {
            self.wait(None, 1).await?;
        }
        Ok(self.shared.lock_queue().pop_front())
    }

    /// Wait until the queue holds at least `min_items`, the pump is no longer
    /// open, or `timeout` elapses.
    ///
    /// Polls the queue length at the configured fixed interval. A `None`
    /// timeout waits indefinitely. Fails with
    /// [`NodelineError::WaitTimeout`] when the deadline passes first.
    pub async fn wait(&self, timeout: Option<Duration>, min_items: usize) -> Result<()> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if !self.is_open() || self.shared.lock_queue().len() >= min_items {
                return Ok(());
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(NodelineError::WaitTimeout);
                }
            }
            tokio::time::sleep(self.config.wait_interval).await;
        }
    }

    /// Stop the producer and transition to the terminal Closed state.
    ///
    /// Attempts a cooperative stop first (the producer observes the flag
    /// within one poll cycle); if the task does not finish within the grace
    /// period it is force-canceled and awaited again. Queue contents are
    /// discarded. Idempotent.
    ///
    /// # Errors
    ///
    /// [`NodelineError::ShutdownStalled`] if the producer is still running
    /// after forced cancellation; the shutdown contract is violated and the
    /// error must be treated as fatal.
    pub async fn close(&mut self) -> Result<()> {
        self.shared.stop.store(true, Ordering::Release);

        let result = match self.handle.take() {
            Some(handle) => Self::stop_producer(handle, self.config.shutdown_grace).await,
            None => Ok(()),
        };

        self.shared.open.store(false, Ordering::Release);
        self.shared.lock_queue().clear();
        result
    }

    async fn stop_producer(mut handle: JoinHandle<()>, grace: Duration) -> Result<()> {
        // Cooperative phase: the loop checks the stop flag around every
        // timeout-bounded poll, so this normally succeeds within one cycle.
        if tokio::time::timeout(grace, &mut handle).await.is_ok() {
            return Ok(());
        }

        tracing::warn!("producer ignored stop flag, forcing cancellation");
        handle.abort();
        match tokio::time::timeout(grace, handle).await {
            Ok(_) => Ok(()),
            Err(_) => Err(NodelineError::ShutdownStalled),
        }
    }
}

impl<T: Transport> Drop for BackgroundPump<T> {
    /// Last-resort guard; the documented contract is an explicit
    /// `close().await` on every exit path.
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

/// The producer loop: poll, decode, append; repeat until stopped or exhausted.
async fn producer_loop<T: Transport>(
    mut reader: FrameReader<T>,
    shared: Arc<Shared>,
    poll_timeout: Duration,
) {
    loop {
        if shared.stop.load(Ordering::Acquire) {
            break;
        }

        let status = match reader.poll(poll_timeout).await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(error = %e, "transport error, stopping producer");
                break;
            }
        };

        let messages = reader.drain_messages();
        if !messages.is_empty() {
            shared.lock_queue().extend(messages);
        }

        if status == PollStatus::Closed {
            tracing::debug!("transport closed, producer exhausted");
            break;
        }
        if shared.stop.load(Ordering::Acquire) {
            break;
        }
    }

    shared.open.store(false, Ordering::Release);
}
