//! The procedural frame generator interface.

use crate::{Frame, ParamMap, RenderContext};

/// A procedural frame source plugin.
///
/// Generators produce frames of the caller-supplied size on demand.
/// They are infinite and must be stateless across seeks: the output for
/// a given `(width, height, params, ctx)` tuple may depend on internal
/// animation state only in ways that `reset` clears.
pub trait Generator: Send {
    /// Produce one frame of the requested size.
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        params: &ParamMap,
        ctx: &RenderContext,
    ) -> Frame;

    /// Return to the initial animation state.
    fn reset(&mut self) {}
}
