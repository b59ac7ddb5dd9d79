//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Tracking`] | `TrackingFound` / `TrackingLost` for a marker index |
//! | [`Topic::Pointer`] | `ContactsChanged` with the full active contact list |
//! | [`Topic::Lifecycle`] | `ExperienceStarted` |
//! | [`Topic::Presence`] | `PresenceChanged` emitted by anchors |
//!
//! # Subscriptions
//!
//! [`EventBus::subscribe_to`] returns a [`Subscription`]. The anchors drain it
//! synchronously between frames with [`Subscription::drain`]; async
//! consumers await [`Subscription::recv`]. Dropping the handle unsubscribes.
//!
//! # Example
//!
//! ```
//! use sticky_middleware::bus::{EventBus, Topic};
//! use sticky_types::{Event, EventPayload};
//!
//! let bus = EventBus::default();
//! let mut sub = bus.subscribe_to(Topic::Tracking);
//!
//! bus.publish_to(
//!     Topic::Tracking,
//!     Event::new("tracker", EventPayload::TrackingFound { target: 0 }),
//! )
//! .unwrap();
//!
//! assert_eq!(sub.drain().len(), 1);
//! drop(sub);
//! assert_eq!(bus.subscriber_count(Topic::Tracking), 0);
//! ```

use sticky_types::{Event, StickyError};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes of the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Marker found / lost notifications.
    Tracking,
    /// Pointer contact changes.
    Pointer,
    /// Experience lifecycle (start gesture).
    Lifecycle,
    /// Presence transitions published by anchors.
    Presence,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    tracking: broadcast::Sender<Event>,
    pointer: broadcast::Sender<Event>,
    lifecycle: broadcast::Sender<Event>,
    presence: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently and is
    /// raised to 1 if zero.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tracking, _) = broadcast::channel(capacity);
        let (pointer, _) = broadcast::channel(capacity);
        let (lifecycle, _) = broadcast::channel(capacity);
        let (presence, _) = broadcast::channel(capacity);
        Self {
            tracking,
            pointer,
            lifecycle,
            presence,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active subscriptions that were handed the event.
    /// Publishing to a topic nobody listens to is a normal condition and
    /// returns `Ok(0)`.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, StickyError> {
        let sender = self.topic_sender(topic);
        if sender.receiver_count() == 0 {
            return Ok(0);
        }
        sender
            .send(event)
            .map_err(|e| StickyError::Channel(format!("event bus send error on {topic:?}: {e}")))
    }

    /// Subscribe to a specific [`Topic`] channel.
    ///
    /// Only events published after this call are delivered.
    pub fn subscribe_to(&self, topic: Topic) -> Subscription {
        Subscription {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Tracking => &self.tracking,
            Topic::Pointer => &self.pointer,
            Topic::Lifecycle => &self.lifecycle,
            Topic::Presence => &self.presence,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// A receiver bound to a single [`Topic`] channel. Dropping it unsubscribes.
///
/// Obtained via [`EventBus::subscribe_to`].
#[derive(Debug)]
pub struct Subscription {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// The [`Topic`] this subscription is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Next buffered event, without waiting.
    ///
    /// A lagging subscription logs the number of dropped events and carries
    /// on with the oldest event still buffered.
    pub fn try_next(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "subscription lagged");
                    continue;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Every buffered event in publication order.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Wait for the next event on this topic.
    ///
    /// Returns `None` once the bus has been dropped and no further events
    /// will arrive.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "subscription lagged");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
