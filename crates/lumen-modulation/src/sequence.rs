//! Sequence variants and their evaluation.
//!
//! All three variants produce a value mapped into the sequence's
//! `[min_value, max_value]` range. LFO and timeline sequences are pure
//! functions of the engine clock; only audio sequences carry state (the
//! exponential smoother), which is why evaluation goes through
//! [`SequenceRuntime`].

use serde::{Deserialize, Serialize};

use lumen_analysis::{AudioFeature, AudioFeatures};
use lumen_core::Easing;

/// LFO waveform shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LfoWaveform {
    /// Smooth sinusoid.
    #[default]
    Sine,
    /// Hard on/off.
    Square,
    /// Linear up/down ramps.
    Triangle,
    /// Rising ramp with abrupt reset.
    Sawtooth,
    /// Sample-and-hold noise: a new deterministic value each cycle.
    ///
    /// The only aperiodic waveform; the value is a hash of the cycle
    /// index so evaluation stays stateless and reproducible.
    Random,
}

/// Keyframe interpolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Straight lerp between keyframes.
    #[default]
    Linear,
    /// Quadratic ease-in per segment.
    EaseIn,
    /// Quadratic ease-out per segment.
    EaseOut,
    /// Quadratic ease-in-out per segment.
    EaseInOut,
    /// Hold the lower keyframe's value.
    Step,
}

impl Interpolation {
    fn ease(self, t: f32) -> f32 {
        match self {
            Interpolation::Linear => Easing::Linear.apply(t),
            Interpolation::EaseIn => Easing::EaseIn.apply(t),
            Interpolation::EaseOut => Easing::EaseOut.apply(t),
            Interpolation::EaseInOut => Easing::EaseInOut.apply(t),
            Interpolation::Step => 0.0,
        }
    }
}

/// Timeline repetition behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Play once, then hold the final value.
    #[default]
    Once,
    /// Wrap every `duration` seconds.
    Loop,
    /// Reflect: forward then backward over a doubled period.
    PingPong,
}

/// One timeline keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Position on the timeline in seconds.
    pub time: f64,
    /// Value at that position.
    pub value: f64,
}

fn default_amplitude() -> f64 {
    1.0
}

/// A time-varying value source bound to one effect parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Sequence {
    /// Follows one analyzer feature.
    Audio {
        /// Which feature to follow.
        feature: AudioFeature,
        /// Output at feature value 0.
        min_value: f64,
        /// Output at feature value 1.
        max_value: f64,
        /// Exponential smoothing coefficient in [0,1]; 0 is unsmoothed.
        #[serde(default)]
        smoothing: f64,
        /// Flip the feature before mapping.
        #[serde(default)]
        invert: bool,
    },
    /// Free-running low-frequency oscillator.
    Lfo {
        /// Waveform shape.
        #[serde(default)]
        waveform: LfoWaveform,
        /// Oscillation rate in Hz.
        frequency_hz: f64,
        /// Phase offset in cycles, [0,1).
        #[serde(default)]
        phase: f64,
        /// Waveform scale before mapping.
        #[serde(default = "default_amplitude")]
        amplitude: f64,
        /// Waveform offset before mapping.
        #[serde(default)]
        offset: f64,
        /// Output at the waveform trough.
        min_value: f64,
        /// Output at the waveform crest.
        max_value: f64,
    },
    /// Keyframed timeline.
    Timeline {
        /// Keyframes ordered by time.
        keyframes: Vec<Keyframe>,
        /// Interpolation between keyframes.
        #[serde(default)]
        interpolation: Interpolation,
        /// Repetition behavior.
        #[serde(default)]
        loop_mode: LoopMode,
        /// Timeline length in seconds.
        duration: f64,
    },
}

/// Evaluation state for one active sequence.
///
/// LFO and timeline variants are stateless; the runtime exists so the
/// audio smoother survives between ticks.
#[derive(Debug, Clone)]
pub struct SequenceRuntime {
    sequence: Sequence,
    smoothed: f64,
    primed: bool,
}

impl SequenceRuntime {
    /// Wrap a sequence for evaluation.
    pub fn new(sequence: Sequence) -> Self {
        Self {
            sequence,
            smoothed: 0.0,
            primed: false,
        }
    }

    /// The wrapped sequence.
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Evaluate at engine time `time_s` against the current feature snapshot.
    pub fn evaluate(&mut self, time_s: f64, features: &AudioFeatures) -> f64 {
        match &self.sequence {
            Sequence::Audio {
                feature,
                min_value,
                max_value,
                smoothing,
                invert,
            } => {
                let mut raw = f64::from(features.get(*feature)).clamp(0.0, 1.0);
                if *invert {
                    raw = 1.0 - raw;
                }
                let level = if *smoothing <= 0.0 {
                    self.smoothed = raw;
                    self.primed = true;
                    raw
                } else if self.primed {
                    let s = smoothing.clamp(0.0, 1.0);
                    self.smoothed = self.smoothed * s + raw * (1.0 - s);
                    self.smoothed
                } else {
                    self.smoothed = raw;
                    self.primed = true;
                    raw
                };
                min_value + level * (max_value - min_value)
            }
            Sequence::Lfo {
                waveform,
                frequency_hz,
                phase,
                amplitude,
                offset,
                min_value,
                max_value,
            } => {
                let x = time_s * frequency_hz + phase;
                let wave = waveform_value(*waveform, x);
                let raw = (wave * amplitude + offset).clamp(-1.0, 1.0);
                let unipolar = (raw + 1.0) / 2.0;
                min_value + unipolar * (max_value - min_value)
            }
            Sequence::Timeline {
                keyframes,
                interpolation,
                loop_mode,
                duration,
            } => timeline_value(keyframes, *interpolation, *loop_mode, *duration, time_s),
        }
    }
}

fn waveform_value(waveform: LfoWaveform, x: f64) -> f64 {
    let ph = x.rem_euclid(1.0);
    match waveform {
        LfoWaveform::Sine => (x * std::f64::consts::TAU).sin(),
        LfoWaveform::Square => {
            if ph < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        LfoWaveform::Triangle => {
            if ph < 0.5 {
                4.0 * ph - 1.0
            } else {
                3.0 - 4.0 * ph
            }
        }
        LfoWaveform::Sawtooth => 2.0 * ph - 1.0,
        LfoWaveform::Random => cycle_noise(x.floor() as i64),
    }
}

/// Deterministic noise in [-1, 1] for a cycle index.
fn cycle_noise(cycle: i64) -> f64 {
    let mut v = (cycle as u64).wrapping_mul(0x9E3779B97F4A7C15);
    v ^= v >> 31;
    v = v.wrapping_mul(0xBF58476D1CE4E5B9);
    v ^= v >> 27;
    (v % 100_000) as f64 / 50_000.0 - 1.0
}

fn timeline_value(
    keyframes: &[Keyframe],
    interpolation: Interpolation,
    loop_mode: LoopMode,
    duration: f64,
    time_s: f64,
) -> f64 {
    let Some(first) = keyframes.first() else {
        return 0.0;
    };
    let last = keyframes.last().unwrap_or(first);
    if duration <= 0.0 {
        return first.value;
    }

    let local = match loop_mode {
        LoopMode::Once => time_s.clamp(0.0, duration),
        LoopMode::Loop => time_s.rem_euclid(duration),
        LoopMode::PingPong => {
            let p = time_s.rem_euclid(2.0 * duration);
            if p <= duration { p } else { 2.0 * duration - p }
        }
    };

    if local <= first.time {
        return first.value;
    }
    if local >= last.time {
        return last.value;
    }

    // Bisect for the first keyframe strictly after `local`.
    let upper = keyframes.partition_point(|k| k.time <= local);
    let k1 = keyframes[upper];
    let k0 = keyframes[upper - 1];

    let span = k1.time - k0.time;
    if span <= 0.0 || interpolation == Interpolation::Step {
        return k0.value;
    }
    let u = ((local - k0.time) / span) as f32;
    let eased = f64::from(interpolation.ease(u));
    k0.value + (k1.value - k0.value) * eased
}
