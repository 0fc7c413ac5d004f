//! Cache Events Module
//!
//! Notifications for evictions, expirations, promotions and absorbed
//! failures. Listeners are registered when the cache is built; there is no
//! global emitter.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

// == Cache Event ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    /// Removed by the tier's policy to free budget
    Evicted { tier: String, key: String },
    /// Removed because its TTL elapsed (lazily or by the janitor)
    Expired { tier: String, key: String },
    /// Copied from a slower tier into a faster one
    Promoted { from: String, to: String, key: String },
    /// Evicted item written into the next slower tier
    Demoted { from: String, to: String, key: String },
    /// A remote tier call failed; reads degrade to a miss
    BackendFailure {
        tier: String,
        operation: String,
        reason: String,
    },
    /// Stored bytes failed verification; the item was purged
    IntegrityFailure { tier: String, key: String },
    /// Every tier was emptied
    Cleared,
}

// == Event Listener ==
/// Receives cache events synchronously on the emitting thread.
///
/// Implementations must be cheap and must not call back into the cache:
/// events can be emitted while a tier lock is held.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &CacheEvent);
}

impl<F> EventListener for F
where
    F: Fn(&CacheEvent) + Send + Sync,
{
    fn on_event(&self, event: &CacheEvent) {
        self(event)
    }
}

// == Channel Listener ==
/// Forwards events into an unbounded tokio channel.
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<CacheEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CacheEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventListener for ChannelListener {
    fn on_event(&self, event: &CacheEvent) {
        // Receiver dropped: nobody is listening any more.
        let _ = self.tx.send(event.clone());
    }
}

// == Event Bus ==
/// Fan-out to the listeners registered at construction.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listeners(listeners: Vec<Arc<dyn EventListener>>) -> Self {
        Self { listeners }
    }

    pub fn emit(&self, event: CacheEvent) {
        debug!(?event, "cache event");
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
