//! `sticky-perception` – turns raw tracker and pointer input into placement.
//!
//! # Modules
//!
//! - [`pose_filter`] – [`PoseFilter`][pose_filter::PoseFilter]: frame-rate
//!   independent exponential smoothing of marker poses, with a no-inertia
//!   snap on acquisition and freeze-on-loss.
//! - [`sample_gate`] – [`admit`][sample_gate::admit]: rejects non-finite or
//!   collapsed pose samples before they reach the filter.
//! - [`billboard`] – [`BillboardConstraint`][billboard::BillboardConstraint]:
//!   stateless viewer-facing rotation with optional roll lock.
//! - [`gesture`] – [`GestureController`][gesture::GestureController]: pan and
//!   pinch handling for content frozen in reading mode.

pub mod billboard;
pub mod gesture;
pub mod pose_filter;
pub mod sample_gate;

pub use billboard::BillboardConstraint;
pub use gesture::{GestureController, GestureMode, GestureState, ManualAdjustment};
pub use pose_filter::{FilterState, Gains, PoseFilter, NOMINAL_FRAME_MS};
