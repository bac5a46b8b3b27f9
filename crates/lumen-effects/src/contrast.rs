//! Contrast adjustment around mid-gray.

use lumen_core::{Frame, ParamDescriptor, ParamMap, PixelEffect, RenderContext};

/// Scales channel distance from mid-gray.
///
/// `factor = 1.0` is the identity, `0.0` collapses to flat gray, values
/// above 1 stretch toward the extremes.
#[derive(Debug, Default)]
pub struct Contrast;

impl Contrast {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] =
        &[ParamDescriptor::float("factor", 1.0, 0.0, 4.0)];

    /// Create the effect.
    pub fn new() -> Self {
        Self
    }
}

impl PixelEffect for Contrast {
    fn apply(
        &mut self,
        frame: &mut Frame,
        params: &ParamMap,
        _ctx: &RenderContext,
    ) -> Result<(), String> {
        let factor = params
            .get("factor")
            .and_then(|v| v.as_f32())
            .unwrap_or(1.0);
        if (factor - 1.0).abs() < f32::EPSILON {
            return Ok(());
        }
        for b in frame.data_mut() {
            let n = f32::from(*b) / 255.0;
            let adjusted = (n - 0.5) * factor + 0.5;
            *b = (adjusted.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        Ok(())
    }
}
