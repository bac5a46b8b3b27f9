//! Layer compositing arithmetic.
//!
//! Blend math runs in normalized [0,1] float space and converts back to
//! 8-bit at the end. Opacity is a linear cross-fade between the running
//! composite and the blended contribution, so `opacity = 0` leaves the
//! base untouched and `opacity = 1` fully replaces it with the blend
//! result.

use serde::{Deserialize, Serialize};

use crate::Frame;

/// How a layer combines with the composite beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Top layer replaces the base (subject to opacity).
    #[default]
    Normal,
    /// Component-wise product. White is the identity.
    Multiply,
    /// Inverted product of inverses. Black is the identity.
    Screen,
    /// Saturating addition.
    Add,
    /// Saturating subtraction (base minus top).
    Subtract,
    /// Multiply where the base is dark, screen where it is bright.
    Overlay,
}

impl BlendMode {
    /// Blend two normalized channel values.
    #[inline]
    fn apply(self, base: f32, top: f32) -> f32 {
        match self {
            BlendMode::Normal => top,
            BlendMode::Multiply => base * top,
            BlendMode::Screen => 1.0 - (1.0 - base) * (1.0 - top),
            BlendMode::Add => (base + top).min(1.0),
            BlendMode::Subtract => (base - top).max(0.0),
            BlendMode::Overlay => {
                if base < 0.5 {
                    2.0 * base * top
                } else {
                    1.0 - 2.0 * (1.0 - base) * (1.0 - top)
                }
            }
        }
    }
}

/// Composite `top` onto `base`, returning a new frame.
///
/// `top` must already match the base dimensions; callers resize first.
pub fn composite(base: &Frame, top: &Frame, mode: BlendMode, opacity: f32) -> Frame {
    let mut out = base.clone();
    composite_into(&mut out, top, mode, opacity);
    out
}

/// Composite `top` onto `base` in place.
///
/// With `opacity <= 0` the base is returned bit-identical; the layer
/// stack's single-layer fast path depends on this.
pub fn composite_into(base: &mut Frame, top: &Frame, mode: BlendMode, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }
    debug_assert_eq!(base.dimensions(), top.dimensions());

    let top_data = top.data();
    for (i, b) in base.data_mut().iter_mut().enumerate() {
        let base_n = f32::from(*b) / 255.0;
        let top_n = f32::from(top_data[i]) / 255.0;
        let blended = mode.apply(base_n, top_n);
        let mixed = base_n + (blended - base_n) * opacity;
        *b = (mixed.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Frame {
        Frame::from_fn(2, 2, |x, y| {
            if (x + y) % 2 == 0 {
                [200, 100, 50]
            } else {
                [10, 20, 30]
            }
        })
    }

    #[test]
    fn normal_opacity_zero_is_base() {
        let base = checker();
        let top = Frame::solid(2, 2, [255, 0, 0]);
        assert_eq!(composite(&base, &top, BlendMode::Normal, 0.0), base);
    }

    #[test]
    fn normal_opacity_one_is_top() {
        let base = checker();
        let top = Frame::solid(2, 2, [255, 0, 0]);
        assert_eq!(composite(&base, &top, BlendMode::Normal, 1.0), top);
    }

    #[test]
    fn multiply_by_white_is_identity() {
        let base = checker();
        let white = Frame::solid(2, 2, [255, 255, 255]);
        assert_eq!(composite(&base, &white, BlendMode::Multiply, 1.0), base);
    }

    #[test]
    fn screen_with_black_is_identity() {
        let base = checker();
        let black = Frame::black(2, 2);
        assert_eq!(composite(&base, &black, BlendMode::Screen, 1.0), base);
    }

    #[test]
    fn add_saturates() {
        let base = Frame::solid(1, 1, [200, 200, 200]);
        let top = Frame::solid(1, 1, [100, 100, 100]);
        let out = composite(&base, &top, BlendMode::Add, 1.0);
        assert_eq!(out.pixel(0, 0), [255, 255, 255]);
    }

    #[test]
    fn subtract_floors_at_zero() {
        let base = Frame::solid(1, 1, [50, 50, 50]);
        let top = Frame::solid(1, 1, [100, 100, 100]);
        let out = composite(&base, &top, BlendMode::Subtract, 1.0);
        assert_eq!(out.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn overlay_splits_at_midpoint() {
        // Dark base multiplies: 2 * 0.2 * 0.5 = 0.2
        let dark = composite(
            &Frame::solid(1, 1, [51, 51, 51]),
            &Frame::solid(1, 1, [128, 128, 128]),
            BlendMode::Overlay,
            1.0,
        );
        let [r, _, _] = dark.pixel(0, 0);
        assert!((f32::from(r) / 255.0 - 0.2).abs() < 0.02);

        // Bright base screens: 1 - 2 * 0.2 * 0.5 = 0.8
        let bright = composite(
            &Frame::solid(1, 1, [204, 204, 204]),
            &Frame::solid(1, 1, [128, 128, 128]),
            BlendMode::Overlay,
            1.0,
        );
        let [r, _, _] = bright.pixel(0, 0);
        assert!((f32::from(r) / 255.0 - 0.8).abs() < 0.02);
    }

    #[test]
    fn half_opacity_mixes_linearly() {
        let base = Frame::solid(1, 1, [0, 0, 0]);
        let top = Frame::solid(1, 1, [255, 255, 255]);
        let out = composite(&base, &top, BlendMode::Normal, 0.5);
        let [r, _, _] = out.pixel(0, 0);
        assert!((i32::from(r) - 128).abs() <= 1);
    }
}
