//! The transition plugin interface.

use crate::Frame;

/// A transition: blends the outgoing and incoming clip frames.
///
/// `progress` runs from 0 (all previous) to 1 (all next) and has
/// already been mapped through the configured easing curve by the
/// transition manager. Implementations must handle mismatched frame
/// sizes by resizing `prev` to `next`'s dimensions.
pub trait Transition: Send + Sync {
    /// Blend the two frames at the given eased progress.
    fn blend(&self, prev: &Frame, next: &Frame, progress: f32) -> Frame;
}
