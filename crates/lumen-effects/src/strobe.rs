//! Time-driven strobe.

use lumen_core::{Frame, ParamDescriptor, ParamMap, PixelEffect, RenderContext};

/// Blacks the frame out during the off phase of a duty cycle.
///
/// Phase is derived from the render context clock, so two players
/// running the same clip strobe in step.
#[derive(Debug, Default)]
pub struct Strobe;

impl Strobe {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] = &[
        ParamDescriptor::float("frequency_hz", 10.0, 0.1, 30.0),
        ParamDescriptor::float("duty", 0.5, 0.0, 1.0),
    ];

    /// Create the effect.
    pub fn new() -> Self {
        Self
    }
}

impl PixelEffect for Strobe {
    fn apply(
        &mut self,
        frame: &mut Frame,
        params: &ParamMap,
        ctx: &RenderContext,
    ) -> Result<(), String> {
        let freq = params
            .get("frequency_hz")
            .and_then(|v| v.as_f64())
            .unwrap_or(10.0);
        let duty = params.get("duty").and_then(|v| v.as_f64()).unwrap_or(0.5);
        let phase = (ctx.time_s * freq).fract();
        if phase >= duty {
            frame.data_mut().fill(0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{ParamValue, default_params};

    fn ctx_at(time_s: f64) -> RenderContext {
        RenderContext {
            time_s,
            frame_number: 0,
            fps: 30.0,
        }
    }

    #[test]
    fn on_phase_passes_through() {
        let mut effect = Strobe::new();
        let mut params = default_params(Strobe::PARAMS);
        params.insert("frequency_hz".into(), ParamValue::Float(1.0));
        let mut frame = Frame::solid(1, 1, [200, 200, 200]);
        effect.apply(&mut frame, &params, &ctx_at(0.25)).unwrap();
        assert_eq!(frame.pixel(0, 0), [200, 200, 200]);
    }

    #[test]
    fn off_phase_blacks_out() {
        let mut effect = Strobe::new();
        let mut params = default_params(Strobe::PARAMS);
        params.insert("frequency_hz".into(), ParamValue::Float(1.0));
        let mut frame = Frame::solid(1, 1, [200, 200, 200]);
        effect.apply(&mut frame, &params, &ctx_at(0.75)).unwrap();
        assert_eq!(frame.pixel(0, 0), [0, 0, 0]);
    }
}
