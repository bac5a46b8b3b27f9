//! Axis mirroring.

use lumen_core::{Frame, ParamDescriptor, ParamMap, PixelEffect, RenderContext};

/// Reflects the left half onto the right, the top onto the bottom, or both.
#[derive(Debug, Default)]
pub struct Mirror;

impl Mirror {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] = &[ParamDescriptor::select(
        "mode",
        "horizontal",
        &["horizontal", "vertical", "both"],
    )];

    /// Create the effect.
    pub fn new() -> Self {
        Self
    }
}

impl PixelEffect for Mirror {
    fn apply(
        &mut self,
        frame: &mut Frame,
        params: &ParamMap,
        _ctx: &RenderContext,
    ) -> Result<(), String> {
        let mode = params
            .get("mode")
            .and_then(|v| v.as_text().map(ToOwned::to_owned))
            .unwrap_or_else(|| "horizontal".to_owned());
        let (w, h) = frame.dimensions();
        if mode == "horizontal" || mode == "both" {
            for y in 0..h {
                for x in 0..w / 2 {
                    let p = frame.pixel(x, y);
                    frame.set_pixel(w - 1 - x, y, p);
                }
            }
        }
        if mode == "vertical" || mode == "both" {
            for y in 0..h / 2 {
                for x in 0..w {
                    let p = frame.pixel(x, y);
                    frame.set_pixel(x, h - 1 - y, p);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::default_params;

    #[test]
    fn horizontal_mirror_reflects_left() {
        let mut effect = Mirror::new();
        let params = default_params(Mirror::PARAMS);
        let mut frame = Frame::from_fn(4, 1, |x, _| [x as u8 * 10, 0, 0]);
        effect
            .apply(&mut frame, &params, &RenderContext::start(30.0))
            .unwrap();
        assert_eq!(frame.pixel(3, 0), frame.pixel(0, 0));
        assert_eq!(frame.pixel(2, 0), frame.pixel(1, 0));
    }
}
