//! Saturation adjustment.

use lumen_core::{Frame, ParamDescriptor, ParamMap, PixelEffect, RenderContext};

/// Rec. 601 luma weights.
const LUMA: [f32; 3] = [0.299, 0.587, 0.114];

/// Interpolates each pixel between its grayscale luma and itself.
///
/// `amount = 0` is fully desaturated, `1` the identity, values above 1
/// oversaturate with clamping.
#[derive(Debug, Default)]
pub struct Saturation;

impl Saturation {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] =
        &[ParamDescriptor::float("amount", 1.0, 0.0, 3.0)];

    /// Create the effect.
    pub fn new() -> Self {
        Self
    }
}

impl PixelEffect for Saturation {
    fn apply(
        &mut self,
        frame: &mut Frame,
        params: &ParamMap,
        _ctx: &RenderContext,
    ) -> Result<(), String> {
        let amount = params
            .get("amount")
            .and_then(|v| v.as_f32())
            .unwrap_or(1.0);
        if (amount - 1.0).abs() < f32::EPSILON {
            return Ok(());
        }
        let (w, h) = frame.dimensions();
        for y in 0..h {
            for x in 0..w {
                let [r, g, b] = frame.pixel(x, y);
                let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
                let luma = rf * LUMA[0] + gf * LUMA[1] + bf * LUMA[2];
                let mix = |c: f32| (luma + (c - luma) * amount).clamp(0.0, 255.0).round() as u8;
                frame.set_pixel(x, y, [mix(rf), mix(gf), mix(bf)]);
            }
        }
        Ok(())
    }
}
