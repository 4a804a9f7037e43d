//! Connection registry and broadcast fan-out.
//!
//! A single [`Hub`] instance owns the set of live connections. Each
//! connection gets a bounded outbox channel at registration; `broadcast`
//! enqueues onto every outbox without ever blocking, and a client whose
//! outbox is full is evicted on the spot rather than allowed to stall the
//! others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;

/// Identifier for one registered connection. Never reused within a process.
pub type ConnId = u64;

/// An opaque relay payload. The hub never looks inside; text and binary
/// frames are relayed identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Registry of live connections plus the broadcast policy knobs.
///
/// Construct one at startup and share it via `Arc`. All registry access
/// funnels through a single mutex; nothing awaits while holding it, so
/// register/unregister/broadcast are mutually exclusive and none of them
/// can block on a slow client.
pub struct Hub {
    registry: Mutex<HashMap<ConnId, mpsc::Sender<Frame>>>,
    next_id: AtomicU64,
    outbox_capacity: usize,
    echo_to_sender: bool,
}

impl Hub {
    pub fn new(outbox_capacity: usize, echo_to_sender: bool) -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            outbox_capacity,
            echo_to_sender,
        }
    }

    /// Register a new connection.
    ///
    /// The hub mints the id and the outbox itself, so a connection cannot
    /// be registered twice: callers only ever receive fresh ids. Returns
    /// the id and the receiving half of the outbox for the writer pump.
    pub async fn register(&self) -> (ConnId, mpsc::Receiver<Frame>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.outbox_capacity);
        self.registry.lock().await.insert(id, tx);
        tracing::debug!(conn = id, "registered");
        (id, rx)
    }

    /// Remove a connection from the registry.
    ///
    /// Dropping the stored sender closes the outbox, which terminates the
    /// connection's writer pump. Unregistering an id that is absent
    /// (already evicted, or unregistered twice during teardown) is a no-op.
    pub async fn unregister(&self, id: ConnId) {
        if self.registry.lock().await.remove(&id).is_some() {
            tracing::debug!(conn = id, "unregistered");
        }
    }

    /// Fan a frame out to every registered connection.
    ///
    /// Each delivery is a non-blocking `try_send`. A connection whose
    /// outbox is full is not draining fast enough and is evicted inline,
    /// under the same lock hold — the frame is dropped for that client
    /// only, and the broadcaster never waits. Delivery failures are not
    /// reported to the caller; they are resolved by disconnection.
    pub async fn broadcast(&self, origin: ConnId, frame: Frame) {
        let mut registry = self.registry.lock().await;
        registry.retain(|&id, tx| {
            if !self.echo_to_sender && id == origin {
                return true;
            }
            match tx.try_send(frame.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(conn = id, "outbox full, evicting slow client");
                    false
                }
                // Receiver already gone; the connection is mid-teardown.
                Err(TrySendError::Closed(_)) => false,
            }
        });
    }

    /// Number of currently registered connections.
    pub async fn connections(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Whether `id` is currently registered.
    pub async fn contains(&self, id: ConnId) -> bool {
        self.registry.lock().await.contains_key(&id)
    }
}
