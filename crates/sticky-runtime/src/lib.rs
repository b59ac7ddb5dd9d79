//! `sticky-runtime` – The Frame Loop
//!
//! Wires perception, presence and the collaborators together and runs them
//! once per rendered frame.
//!
//! # Modules
//!
//! - [`anchor`] – [`AnchorInstance`][anchor::AnchorInstance]: all state for
//!   one tracked marker and its content, and the per-tick pipeline that
//!   drains events, polls the hold timer and writes the stabilized transform.
//! - [`stage`] – [`Stage`][stage::Stage]: several anchors sharing one
//!   [`EventBus`][sticky_middleware::EventBus] and one
//!   [`StartGate`][sticky_kernel::StartGate].
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: initialises
//!   the global `tracing` subscriber with an optional OTLP span exporter.

pub mod anchor;
pub mod stage;
pub mod telemetry;

pub use anchor::{AnchorInstance, AnchorSnapshot};
pub use stage::Stage;
