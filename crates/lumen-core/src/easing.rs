//! Progress-curve easing shared by transitions and keyframe timelines.

use serde::{Deserialize, Serialize};

/// Easing function applied to a normalized progress value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Identity.
    #[default]
    Linear,
    /// Quadratic ease-in (slow start).
    EaseIn,
    /// Quadratic ease-out (slow finish).
    EaseOut,
    /// Quadratic ease-in-out.
    EaseInOut,
}

impl Easing {
    /// Map progress `t` in [0,1] through the curve. Input is clamped.
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => t * (2.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_fixed() {
        for e in [
            Easing::Linear,
            Easing::EaseIn,
            Easing::EaseOut,
            Easing::EaseInOut,
        ] {
            assert_eq!(e.apply(0.0), 0.0, "{e:?} at 0");
            assert_eq!(e.apply(1.0), 1.0, "{e:?} at 1");
        }
    }

    #[test]
    fn input_is_clamped() {
        assert_eq!(Easing::Linear.apply(-1.0), 0.0);
        assert_eq!(Easing::Linear.apply(2.0), 1.0);
    }

    #[test]
    fn ease_in_starts_slow() {
        assert!(Easing::EaseIn.apply(0.25) < 0.25);
        assert!(Easing::EaseOut.apply(0.25) > 0.25);
    }

    #[test]
    fn ease_in_out_is_symmetric() {
        for t in [0.1, 0.2, 0.3, 0.4] {
            let a = Easing::EaseInOut.apply(t);
            let b = Easing::EaseInOut.apply(1.0 - t);
            assert!((a + b - 1.0).abs() < 1e-6);
        }
    }
}
