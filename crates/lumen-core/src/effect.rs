//! The pixel-effect plugin interface.

use crate::{Frame, ParamMap};

/// Per-frame timing context handed to effects and generators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    /// Seconds since the owning player started the current clip.
    pub time_s: f64,
    /// Monotonic frame counter for the current clip.
    pub frame_number: u64,
    /// The owning player's effective frames per second.
    pub fps: f32,
}

impl RenderContext {
    /// Context for the first frame at a given FPS.
    pub fn start(fps: f32) -> Self {
        Self {
            time_s: 0.0,
            frame_number: 0,
            fps,
        }
    }

    /// Advance by one frame interval.
    pub fn advanced(self) -> Self {
        Self {
            time_s: self.time_s + f64::from(1.0 / self.fps.max(1.0)),
            frame_number: self.frame_number + 1,
            ..self
        }
    }
}

/// A pixel effect: a pure transform over one frame.
///
/// Effects are instantiated per chain position and live until the slot
/// is removed or the clip is evicted. They may keep internal state
/// (oscillator phase, running averages) but must not hold references to
/// frames across calls.
///
/// Parameters arrive as a per-frame snapshot of the clip's parameter
/// map; the values are guaranteed to satisfy the descriptors the plugin
/// registered with. An effect that cannot process a frame should return
/// an error rather than panic; the playback engine bypasses it for that
/// frame.
pub trait PixelEffect: Send {
    /// Transform `frame` in place.
    ///
    /// # Errors
    ///
    /// Implementations return a message describing the fault; the
    /// playback engine logs it and leaves the frame untouched.
    fn apply(
        &mut self,
        frame: &mut Frame,
        params: &ParamMap,
        ctx: &RenderContext,
    ) -> Result<(), String>;

    /// Clear internal state without touching parameters.
    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_advances_by_frame_interval() {
        let ctx = RenderContext::start(30.0);
        let next = ctx.advanced();
        assert_eq!(next.frame_number, 1);
        assert!((next.time_s - 1.0 / 30.0).abs() < 1e-9);
    }
}
