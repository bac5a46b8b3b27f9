//! Channel inversion.

use lumen_core::{Frame, ParamDescriptor, ParamMap, PixelEffect, RenderContext};

/// Inverts each channel, optionally partially.
#[derive(Debug, Default)]
pub struct Invert;

impl Invert {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] =
        &[ParamDescriptor::float("strength", 1.0, 0.0, 1.0)];

    /// Create the effect.
    pub fn new() -> Self {
        Self
    }
}

impl PixelEffect for Invert {
    fn apply(
        &mut self,
        frame: &mut Frame,
        params: &ParamMap,
        _ctx: &RenderContext,
    ) -> Result<(), String> {
        let strength = params
            .get("strength")
            .and_then(|v| v.as_f32())
            .unwrap_or(1.0);
        if strength <= 0.0 {
            return Ok(());
        }
        for b in frame.data_mut() {
            let orig = f32::from(*b);
            let inverted = 255.0 - orig;
            *b = (orig + (inverted - orig) * strength).round() as u8;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::default_params;

    #[test]
    fn full_inversion() {
        let mut effect = Invert::new();
        let params = default_params(Invert::PARAMS);
        let mut frame = Frame::solid(1, 1, [0, 255, 100]);
        effect
            .apply(&mut frame, &params, &RenderContext::start(30.0))
            .unwrap();
        assert_eq!(frame.pixel(0, 0), [255, 0, 155]);
    }

    #[test]
    fn double_inversion_is_identity() {
        let mut effect = Invert::new();
        let params = default_params(Invert::PARAMS);
        let mut frame = Frame::solid(1, 1, [12, 34, 56]);
        let original = frame.clone();
        let ctx = RenderContext::start(30.0);
        effect.apply(&mut frame, &params, &ctx).unwrap();
        effect.apply(&mut frame, &params, &ctx).unwrap();
        assert_eq!(frame, original);
    }
}
