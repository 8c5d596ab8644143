//! Update feed for observing remote changes.
//!
//! The feed distributes events the live channel produced to any number of
//! subscribers.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut updates = client.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Some(UpdateEvent::ListsUpdated { lists }) = updates.recv().await {
//!         println!("{} lists changed", lists.len());
//!     }
//! });
//! ```

use larder_core::List;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// An update pushed to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    /// Shopping lists changed on another client. Carries the refetched lists.
    ListsUpdated {
        /// Every list of the account after the refetch.
        lists: Vec<List>,
    },
}

type Subscribers = RwLock<Vec<(u64, UnboundedSender<UpdateEvent>)>>;

/// Distributes update events to subscribers.
///
/// - Preserves publish order per subscriber
/// - Supports multiple subscribers
/// - Prunes subscribers whose [`Subscription`] was dropped
pub struct UpdateFeed {
    subscribers: Arc<Subscribers>,
    next_id: AtomicU64,
}

impl UpdateFeed {
    /// Creates a feed with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribes to the feed.
    ///
    /// The subscription receives every event published after this call.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().push((id, tx));
        Subscription {
            id,
            rx,
            feed: Arc::downgrade(&self.subscribers),
        }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, event: UpdateEvent) -> usize {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        subscribers.len()
    }

    /// Cancels a subscription by id. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: u64) -> bool {
        remove_subscriber(&self.subscribers, id)
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|(_, tx)| !tx.is_closed());
        subscribers.len()
    }
}

impl Default for UpdateFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UpdateFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateFeed")
            .field("subscribers", &self.subscribers.read().len())
            .finish()
    }
}

fn remove_subscriber(subscribers: &Subscribers, id: u64) -> bool {
    let mut subscribers = subscribers.write();
    let before = subscribers.len();
    subscribers.retain(|(existing, _)| *existing != id);
    subscribers.len() != before
}

/// A live subscription to an [`UpdateFeed`]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: UnboundedReceiver<UpdateEvent>,
    feed: Weak<Subscribers>,
}

impl Subscription {
    /// Returns the subscription id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next event. Returns `None` once cancelled.
    pub async fn recv(&mut self) -> Option<UpdateEvent> {
        self.rx.recv().await
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<UpdateEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.feed.upgrade() {
            remove_subscriber(&subscribers, self.id);
        }
    }
}
