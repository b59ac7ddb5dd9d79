//! `sticky-hal` – Collaborator Abstraction Layer
//!
//! The engine never talks to a tracker or a scene graph directly. It talks to
//! the two traits defined here, so hosts (a WebXR bridge, a native AR
//! runtime, a headless test) can be swapped without touching the filter or
//! the state machine.
//!
//! # Modules
//!
//! - [`tracking`] – [`TrackingSource`][tracking::TrackingSource]: raw
//!   world-space pose samples for one marker plus the viewer position.
//! - [`node`] – [`AttachedNode`][node::AttachedNode]: the content node whose
//!   transform, visibility and parent frame the engine drives.
//! - [`sim`] – [`SimTracker`][sim::SimTracker] / [`SimNode`][sim::SimNode]:
//!   in-process stubs with shared probes for headless tests and scenario
//!   replay.

pub mod node;
pub mod sim;
pub mod tracking;

pub use node::AttachedNode;
pub use sim::{SimNode, SimTracker};
pub use tracking::TrackingSource;
