//! Brightness scaling.

use lumen_core::{Frame, ParamDescriptor, ParamMap, PixelEffect, RenderContext};

/// Multiplies every channel by a factor.
///
/// `factor = 1.0` is the identity; values above 1 push toward white
/// with saturating arithmetic. The factor is the classic target for an
/// audio or LFO binding.
///
/// # Example
///
/// ```rust
/// use lumen_core::{Frame, ParamValue, PixelEffect, RenderContext, default_params};
/// use lumen_effects::Brightness;
///
/// let mut effect = Brightness::new();
/// let mut params = default_params(Brightness::PARAMS);
/// params.insert("factor".into(), ParamValue::Float(2.0));
///
/// let mut frame = Frame::solid(1, 1, [100, 100, 100]);
/// effect
///     .apply(&mut frame, &params, &RenderContext::start(30.0))
///     .unwrap();
/// assert_eq!(frame.pixel(0, 0), [200, 200, 200]);
/// ```
#[derive(Debug, Default)]
pub struct Brightness;

impl Brightness {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] =
        &[ParamDescriptor::float("factor", 1.0, 0.0, 5.0)];

    /// Create the effect.
    pub fn new() -> Self {
        Self
    }
}

impl PixelEffect for Brightness {
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
            *b = (f32::from(*b) * factor).clamp(0.0, 255.0).round() as u8;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{ParamValue, default_params};

    #[test]
    fn identity_at_factor_one() {
        let mut effect = Brightness::new();
        let params = default_params(Brightness::PARAMS);
        let mut frame = Frame::solid(2, 2, [13, 200, 77]);
        let before = frame.clone();
        effect
            .apply(&mut frame, &params, &RenderContext::start(30.0))
            .unwrap();
        assert_eq!(frame, before);
    }

    #[test]
    fn factor_zero_blacks_out() {
        let mut effect = Brightness::new();
        let mut params = default_params(Brightness::PARAMS);
        params.insert("factor".into(), ParamValue::Float(0.0));
        let mut frame = Frame::solid(2, 2, [255, 128, 7]);
        effect
            .apply(&mut frame, &params, &RenderContext::start(30.0))
            .unwrap();
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn saturates_at_white() {
        let mut effect = Brightness::new();
        let mut params = default_params(Brightness::PARAMS);
        params.insert("factor".into(), ParamValue::Float(5.0));
        let mut frame = Frame::solid(1, 1, [100, 100, 100]);
        effect
            .apply(&mut frame, &params, &RenderContext::start(30.0))
            .unwrap();
        assert_eq!(frame.pixel(0, 0), [255, 255, 255]);
    }
}
