//! Block pixelation.

use lumen_core::{Frame, ParamDescriptor, ParamMap, PixelEffect, RenderContext};

/// Replaces each `block_size` square with its top-left sample.
///
/// Nearest-sample rather than averaged: LED fixtures sample sparse
/// points anyway, and the hard-edged look is the desired aesthetic.
#[derive(Debug, Default)]
pub struct Pixelate;

impl Pixelate {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] =
        &[ParamDescriptor::int("block_size", 8, 1, 64)];

    /// Create the effect.
    pub fn new() -> Self {
        Self
    }
}

impl PixelEffect for Pixelate {
    fn apply(
        &mut self,
        frame: &mut Frame,
        params: &ParamMap,
        _ctx: &RenderContext,
    ) -> Result<(), String> {
        let block = params
            .get("block_size")
            .and_then(|v| v.as_i64())
            .unwrap_or(8)
            .max(1) as u32;
        if block == 1 {
            return Ok(());
        }
        let (w, h) = frame.dimensions();
        for y in 0..h {
            for x in 0..w {
                let sample = frame.pixel(x / block * block, y / block * block);
                frame.set_pixel(x, y, sample);
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
    fn block_of_two_duplicates_corner() {
        let mut effect = Pixelate::new();
        let mut params = default_params(Pixelate::PARAMS);
        params.insert("block_size".into(), ParamValue::Int(2));
        let mut frame = Frame::from_fn(2, 2, |x, y| [(x * 100 + y * 50) as u8, 0, 0]);
        let corner = frame.pixel(0, 0);
        effect
            .apply(&mut frame, &params, &RenderContext::start(30.0))
            .unwrap();
        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(frame.pixel(x, y), corner);
            }
        }
    }

    #[test]
    fn block_one_is_identity() {
        let mut effect = Pixelate::new();
        let mut params = default_params(Pixelate::PARAMS);
        params.insert("block_size".into(), ParamValue::Int(1));
        let mut frame = Frame::from_fn(3, 3, |x, y| [x as u8, y as u8, 9]);
        let before = frame.clone();
        effect
            .apply(&mut frame, &params, &RenderContext::start(30.0))
            .unwrap();
        assert_eq!(frame, before);
    }
}
