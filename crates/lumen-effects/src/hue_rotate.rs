//! Hue rotation through HSV space.

use lumen_core::{Frame, ParamDescriptor, ParamMap, PixelEffect, RenderContext};

/// Rotates every pixel's hue by a fixed angle.
#[derive(Debug, Default)]
pub struct HueRotate;

impl HueRotate {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] =
        &[ParamDescriptor::float("degrees", 0.0, 0.0, 360.0)];

    /// Create the effect.
    pub fn new() -> Self {
        Self
    }
}

impl PixelEffect for HueRotate {
    fn apply(
        &mut self,
        frame: &mut Frame,
        params: &ParamMap,
        _ctx: &RenderContext,
    ) -> Result<(), String> {
        let degrees = params
            .get("degrees")
            .and_then(|v| v.as_f32())
            .unwrap_or(0.0);
        if degrees.abs() < f32::EPSILON {
            return Ok(());
        }
        let (w, h) = frame.dimensions();
        for y in 0..h {
            for x in 0..w {
                let (hue, s, v) = rgb_to_hsv(frame.pixel(x, y));
                let rotated = (hue + degrees).rem_euclid(360.0);
                frame.set_pixel(x, y, hsv_to_rgb(rotated, s, v));
            }
        }
        Ok(())
    }
}

fn rgb_to_hsv([r, g, b]: [u8; 3]) -> (f32, f32, f32) {
    let (rf, gf, bf) = (
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
    );
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let hue = if delta < 1e-6 {
        0.0
    } else if (max - rf).abs() < 1e-6 {
        60.0 * (((gf - bf) / delta).rem_euclid(6.0))
    } else if (max - gf).abs() < 1e-6 {
        60.0 * ((bf - rf) / delta + 2.0)
    } else {
        60.0 * ((rf - gf) / delta + 4.0)
    };
    let saturation = if max < 1e-6 { 0.0 } else { delta / max };
    (hue, saturation, max)
}

fn hsv_to_rgb(hue: f32, s: f32, v: f32) -> [u8; 3] {
    let c = v * s;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match hue {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    ]
}
