//! Generic request batcher.
//!
//! Coalesces many small per-item requests issued close together in time into
//! one aggregate network call, then demultiplexes the aggregate response (or
//! error) back to each original caller.
//!
//! The generic [`Batcher`] owns the queue, the per-fingerprint waiter map,
//! and the flush scheduling; a [`BatchHandler`] implementation supplies the
//! request shaping, the wire call, and the per-item demultiplexing for one
//! concrete endpoint.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::defaults;
use crate::error::{Error, Result};

/// Configuration for a [`Batcher`].
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// How long the first enqueue of a batch waits for companions.
    pub debounce: Duration,
    /// Flush immediately once this many distinct items are queued.
    pub max_batch: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(defaults::BATCH_DEBOUNCE_MS),
            max_batch: defaults::BATCH_MAX_ITEMS,
        }
    }
}

impl BatcherConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CONFAB_BATCH_DEBOUNCE_MS` | `100` | Debounce window |
    /// | `CONFAB_BATCH_MAX_ITEMS` | `50` | Flush threshold |
    pub fn from_env() -> Self {
        let debounce = std::env::var("CONFAB_BATCH_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::BATCH_DEBOUNCE_MS);
        let max_batch = std::env::var("CONFAB_BATCH_MAX_ITEMS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::BATCH_MAX_ITEMS)
            .max(1);

        Self {
            debounce: Duration::from_millis(debounce),
            max_batch,
        }
    }

    /// Set the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the flush threshold.
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }
}

/// Disposition of one batched item after the aggregate response arrived.
#[derive(Debug, Clone)]
pub enum ItemDisposition<T> {
    /// The response satisfied the request as asked.
    Success(T),
    /// The response satisfied the request with different attributes than
    /// requested. Still delivered as success; the warning is logged once.
    Substituted { output: T, warning: String },
    /// No usable response entry existed for the item.
    Failed(String),
}

/// Shapes, submits, and demultiplexes one kind of batched request.
#[async_trait]
pub trait BatchHandler: Send + Sync + 'static {
    /// A unit of work submitted by one caller.
    type Item: Clone + Send + Sync + 'static;
    /// The shaped aggregate request body.
    type Payload: Send + 'static;
    /// The aggregate response body.
    type Response: Send + Sync + 'static;
    /// The per-item result handed back to the caller.
    type Output: Clone + Send + 'static;

    /// Stable key used to detect duplicate concurrent requests for the same
    /// logical item.
    fn fingerprint_request(&self, item: &Self::Item) -> String;

    /// Key used to route a response entry back to its waiters. Mirrors the
    /// request fingerprint unless a handler needs them to diverge.
    fn fingerprint_response(&self, item: &Self::Item) -> String {
        self.fingerprint_request(item)
    }

    /// Collapse the flushed queue into one request body.
    fn prepare_request(&self, queue: &[Self::Item]) -> Self::Payload;

    /// Submit the aggregate request.
    async fn submit(&self, payload: Self::Payload) -> Result<Self::Response>;

    /// Extract one item's portion of the aggregate response.
    fn accept_item(
        &self,
        item: &Self::Item,
        response: &Self::Response,
    ) -> ItemDisposition<Self::Output>;
}

struct BatchState<H: BatchHandler> {
    queue: Vec<H::Item>,
    waiters: HashMap<String, Vec<oneshot::Sender<Result<H::Output>>>>,
    /// Incremented on every flush so a debounce timer armed for an earlier
    /// batch can never flush its successor early.
    epoch: u64,
    timer_armed: bool,
}

/// Owned queue of pending items with debounced flushing.
///
/// Cloning is cheap and shares the queue; a handle can be kept per call
/// site. The batcher survives transport failures and keeps accepting items.
pub struct Batcher<H: BatchHandler> {
    handler: Arc<H>,
    config: BatcherConfig,
    state: Arc<Mutex<BatchState<H>>>,
}

impl<H: BatchHandler> Clone for Batcher<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<H: BatchHandler> Batcher<H> {
    /// Create a batcher around the given handler.
    pub fn new(handler: H, config: BatcherConfig) -> Self {
        Self {
            handler: Arc::new(handler),
            config,
            state: Arc::new(Mutex::new(BatchState {
                queue: Vec::new(),
                waiters: HashMap::new(),
                epoch: 0,
                timer_armed: false,
            })),
        }
    }

    /// The handler backing this batcher.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Submit one item and wait for its portion of the aggregate response.
    ///
    /// Items sharing a request fingerprint join the outstanding entry rather
    /// than issuing redundant work. The returned future resolves exactly
    /// once: with the item's result, a per-item failure, or the transport
    /// error that sank the whole batch.
    pub async fn enqueue(&self, item: H::Item) -> Result<H::Output> {
        let (tx, rx) = oneshot::channel();
        let fingerprint = self.handler.fingerprint_request(&item);

        let flush_now = {
            let mut state = self.state.lock().unwrap();
            match state.waiters.entry(fingerprint.clone()) {
                Entry::Occupied(mut entry) => {
                    debug!(fingerprint = %fingerprint, "Joining outstanding batched request");
                    entry.get_mut().push(tx);
                }
                Entry::Vacant(entry) => {
                    entry.insert(vec![tx]);
                    state.queue.push(item);
                }
            }

            if state.queue.len() >= self.config.max_batch {
                true
            } else {
                if !state.timer_armed {
                    state.timer_armed = true;
                    self.arm_timer(state.epoch);
                }
                false
            }
        };

        if flush_now {
            self.flush().await;
        }

        rx.await
            .map_err(|_| Error::Internal("batcher dropped a pending item".to_string()))?
    }

    /// Flush the currently queued batch immediately.
    ///
    /// Items enqueued after the flush begins form the next batch.
    pub async fn flush(&self) {
        self.flush_epoch(None).await;
    }

    fn arm_timer(&self, epoch: u64) {
        let batcher = self.clone();
        let debounce = self.config.debounce;
        tokio::spawn(async move {
            sleep(debounce).await;
            batcher.flush_epoch(Some(epoch)).await;
        });
    }

    async fn flush_epoch(&self, only_epoch: Option<u64>) {
        let (queue, waiters) = {
            let mut state = self.state.lock().unwrap();
            if let Some(epoch) = only_epoch {
                if state.epoch != epoch {
                    return;
                }
            }
            if state.queue.is_empty() {
                return;
            }
            state.epoch += 1;
            state.timer_armed = false;
            (
                std::mem::take(&mut state.queue),
                std::mem::take(&mut state.waiters),
            )
        };

        self.run_batch(queue, waiters).await;
    }

    async fn run_batch(
        &self,
        queue: Vec<H::Item>,
        mut waiters: HashMap<String, Vec<oneshot::Sender<Result<H::Output>>>>,
    ) {
        debug!(batch_size = queue.len(), "Flushing request batch");
        let payload = self.handler.prepare_request(&queue);

        match self.handler.submit(payload).await {
            Ok(response) => {
                for item in &queue {
                    let fingerprint = self.handler.fingerprint_response(item);
                    let Some(senders) = waiters.remove(&fingerprint) else {
                        warn!(fingerprint = %fingerprint, "No waiters registered for batched item");
                        continue;
                    };

                    match self.handler.accept_item(item, &response) {
                        ItemDisposition::Success(output) => {
                            for tx in senders {
                                let _ = tx.send(Ok(output.clone()));
                            }
                        }
                        ItemDisposition::Substituted { output, warning } => {
                            warn!(fingerprint = %fingerprint, "{warning}");
                            for tx in senders {
                                let _ = tx.send(Ok(output.clone()));
                            }
                        }
                        ItemDisposition::Failed(reason) => {
                            for tx in senders {
                                let _ = tx.send(Err(Error::NotFound(reason.clone())));
                            }
                        }
                    }
                }

                // Request and response fingerprints diverged; settle the
                // leftovers so no waiter hangs.
                for (fingerprint, senders) in waiters {
                    warn!(fingerprint = %fingerprint, "Batched item matched no response entry");
                    for tx in senders {
                        let _ = tx.send(Err(Error::Internal(format!(
                            "no response entry for {fingerprint}"
                        ))));
                    }
                }
            }
            Err(err) => {
                let message = err.to_string();
                warn!(batch_size = queue.len(), error = %message, "Batch request failed");
                for senders in waiters.into_values() {
                    for tx in senders {
                        let _ = tx.send(Err(Error::Request(message.clone())));
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
