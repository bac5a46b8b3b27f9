//! Luma-preserving tint.

use lumen_core::{Frame, ParamDescriptor, ParamMap, PixelEffect, RenderContext};

/// Replaces chroma with a fixed tint scaled by the pixel's luma.
#[derive(Debug, Default)]
pub struct Colorize;

impl Colorize {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] = &[
        ParamDescriptor::color("color", [255, 128, 0]),
        ParamDescriptor::float("strength", 1.0, 0.0, 1.0),
    ];

    /// Create the effect.
    pub fn new() -> Self {
        Self
    }
}

impl PixelEffect for Colorize {
    fn apply(
        &mut self,
        frame: &mut Frame,
        params: &ParamMap,
        _ctx: &RenderContext,
    ) -> Result<(), String> {
        let tint = params
            .get("color")
            .and_then(|v| v.as_color())
            .unwrap_or([255, 128, 0]);
        let strength = params
            .get("strength")
            .and_then(|v| v.as_f32())
            .unwrap_or(1.0);
        if strength <= 0.0 {
            return Ok(());
        }
        let (w, h) = frame.dimensions();
        for y in 0..h {
            for x in 0..w {
                let [r, g, b] = frame.pixel(x, y);
                let luma = (f32::from(r) * 0.299 + f32::from(g) * 0.587 + f32::from(b) * 0.114)
                    / 255.0;
                let mix = |orig: u8, t: u8| {
                    let tinted = f32::from(t) * luma;
                    (f32::from(orig) + (tinted - f32::from(orig)) * strength).round() as u8
                };
                frame.set_pixel(x, y, [mix(r, tint[0]), mix(g, tint[1]), mix(b, tint[2])]);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{ParamValue, default_params};

    #[test]
    fn white_maps_to_tint() {
        let mut effect = Colorize::new();
        let mut params = default_params(Colorize::PARAMS);
        params.insert("color".into(), ParamValue::Color([0, 0, 255]));
        let mut frame = Frame::solid(1, 1, [255, 255, 255]);
        effect
            .apply(&mut frame, &params, &RenderContext::start(30.0))
            .unwrap();
        let [r, g, b] = frame.pixel(0, 0);
        assert!(r < 5 && g < 5 && b > 250);
    }

    #[test]
    fn black_stays_black() {
        let mut effect = Colorize::new();
        let params = default_params(Colorize::PARAMS);
        let mut frame = Frame::black(1, 1);
        effect
            .apply(&mut frame, &params, &RenderContext::start(30.0))
            .unwrap();
        assert_eq!(frame.pixel(0, 0), [0, 0, 0]);
    }
}
