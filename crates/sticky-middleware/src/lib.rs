//! `sticky-middleware` – Event Routing
//!
//! Carries tracking, pointer and lifecycle notifications from the host to
//! the anchors without caring about their meaning.
//!
//! # Modules
//!
//! - [`bus`] – Headless, topic-based publish/subscribe event bus built on
//!   Tokio broadcast channels. Subscriptions are handles: dropping one
//!   unsubscribes it.

pub mod bus;

pub use bus::{EventBus, Subscription, Topic};
