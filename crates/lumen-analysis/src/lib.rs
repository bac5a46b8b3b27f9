//! Audio analysis for lumen's audio-reactive modulation.
//!
//! A capture thread (cpal) feeds fixed-size sample blocks into the
//! [`FeatureExtractor`], which computes time-domain levels plus
//! band-split spectral features with a real FFT and publishes them as a
//! process-wide [`AudioFeatures`] snapshot under a mutex. Audio
//! sequences read the snapshot each frame; smoothing is theirs, the
//! analyzer reports raw instantaneous values.

mod analyzer;
mod features;
mod fft;

pub use analyzer::{AnalyzerError, AudioAnalyzer, CaptureDevice};
pub use features::{AudioFeature, AudioFeatures, FeatureExtractor};
pub use fft::Fft;
