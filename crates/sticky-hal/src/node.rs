//! Generic `AttachedNode` trait for the content the engine positions.
//!
//! Calls are fire-and-forget from the engine's point of view: a failing call
//! is logged by the caller and the tick carries on.

use sticky_types::{FeedbackCue, ReparentFrame, StabilizedTransform, StickyError};

/// A scene node holding the anchored content.
pub trait AttachedNode: Send {
    /// Stable identifier for logs, e.g. `"poster"`.
    fn id(&self) -> &str;

    /// Write the node's local transform within its current frame.
    fn set_transform(&mut self, transform: &StabilizedTransform) -> Result<(), StickyError>;

    fn set_visible(&mut self, visible: bool) -> Result<(), StickyError>;

    /// Move the node under a different parent frame.
    fn reparent(&mut self, frame: ReparentFrame) -> Result<(), StickyError>;

    /// Play a transient presentation cue. Nodes that do not animate can rely
    /// on the default, which does nothing.
    fn play_feedback(&mut self, cue: FeedbackCue) -> Result<(), StickyError> {
        let _ = cue;
        Ok(())
    }
}
