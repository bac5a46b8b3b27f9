//! Audio feature extraction.
//!
//! One [`FeatureExtractor`] instance lives on the capture thread and
//! turns each sample block into an [`AudioFeatures`] snapshot. Band
//! boundaries follow the usual live-lighting split: bass 20–250 Hz,
//! mid 250–4000 Hz, treble 4–20 kHz.

use serde::{Deserialize, Serialize};

use crate::Fft;

/// Frequency band boundaries in Hz.
const BASS_RANGE: (f32, f32) = (20.0, 250.0);
const MID_RANGE: (f32, f32) = (250.0, 4000.0);
const TREBLE_RANGE: (f32, f32) = (4000.0, 20000.0);

/// Gain applied to mean band magnitudes before clamping to [0,1].
///
/// Chosen so a full-scale sine in a band reads near 1.0.
const BAND_GAIN: f32 = 2.5;

/// Beat detection: RMS must exceed the adaptive baseline by this factor
/// while rising.
const BEAT_THRESHOLD: f32 = 1.4;

/// Baseline smoothing coefficient per block.
const BASELINE_DECAY: f32 = 0.98;

/// A named audio feature, as referenced by audio sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFeature {
    /// Time-domain root-mean-square level.
    Rms,
    /// Time-domain absolute peak.
    Peak,
    /// Mean magnitude 20–250 Hz.
    Bass,
    /// Mean magnitude 250–4000 Hz.
    Mid,
    /// Mean magnitude 4–20 kHz.
    Treble,
    /// Transient pulse: 1.0 on a detected beat, else 0.0.
    Beat,
}

/// Raw instantaneous features for one analysis block.
///
/// Published by the analyzer under a mutex; readers snapshot by copy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFeatures {
    /// RMS level in [0,1].
    pub rms: f32,
    /// Peak level in [0,1].
    pub peak: f32,
    /// Normalized bass band energy.
    pub bass: f32,
    /// Normalized mid band energy.
    pub mid: f32,
    /// Normalized treble band energy.
    pub treble: f32,
    /// 1.0 on the block where a beat was detected, else 0.0.
    pub beat_pulse: f32,
}

impl AudioFeatures {
    /// Read one feature by name.
    pub fn get(&self, feature: AudioFeature) -> f32 {
        match feature {
            AudioFeature::Rms => self.rms,
            AudioFeature::Peak => self.peak,
            AudioFeature::Bass => self.bass,
            AudioFeature::Mid => self.mid,
            AudioFeature::Treble => self.treble,
            AudioFeature::Beat => self.beat_pulse,
        }
    }
}

/// Turns sample blocks into [`AudioFeatures`].
pub struct FeatureExtractor {
    fft: Fft,
    sample_rate: f32,
    baseline: f32,
    prev_rms: f32,
}

impl FeatureExtractor {
    /// Create an extractor for a block size and sample rate.
    pub fn new(block_size: usize, sample_rate: f32) -> Self {
        Self {
            fft: Fft::new(block_size),
            sample_rate,
            baseline: 0.0,
            prev_rms: 0.0,
        }
    }

    /// Analyze one block of mono samples.
    pub fn analyze(&mut self, block: &[f32]) -> AudioFeatures {
        let rms = (block.iter().map(|s| s * s).sum::<f32>() / block.len().max(1) as f32).sqrt();
        let peak = block.iter().fold(0.0f32, |p, s| p.max(s.abs()));

        let mags = self.fft.magnitudes(block);
        let bass = self.band_mean(&mags, BASS_RANGE);
        let mid = self.band_mean(&mags, MID_RANGE);
        let treble = self.band_mean(&mags, TREBLE_RANGE);

        // Transient detector: RMS rising above the adaptive baseline.
        let beat = rms > self.baseline * BEAT_THRESHOLD && rms > self.prev_rms && rms > 0.01;
        self.baseline = self.baseline * BASELINE_DECAY + rms * (1.0 - BASELINE_DECAY);
        self.prev_rms = rms;

        AudioFeatures {
            rms: rms.min(1.0),
            peak: peak.min(1.0),
            bass,
            mid,
            treble,
            beat_pulse: if beat { 1.0 } else { 0.0 },
        }
    }

    fn band_mean(&self, mags: &[f32], (lo, hi): (f32, f32)) -> f32 {
        let mut sum = 0.0;
        let mut count = 0u32;
        for (bin, &m) in mags.iter().enumerate() {
            let hz = self.fft.bin_hz(bin, self.sample_rate);
            if hz >= lo && hz < hi {
                sum += m;
                count += 1;
            }
        }
        if count == 0 {
            return 0.0;
        }
        (sum / count as f32 * BAND_GAIN).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn silence_yields_zero_features() {
        let mut extractor = FeatureExtractor::new(1024, 44100.0);
        let f = extractor.analyze(&vec![0.0; 1024]);
        assert_eq!(f.rms, 0.0);
        assert_eq!(f.peak, 0.0);
        assert_eq!(f.bass, 0.0);
        assert_eq!(f.beat_pulse, 0.0);
    }

    #[test]
    fn bass_tone_lands_in_bass_band() {
        let mut extractor = FeatureExtractor::new(2048, 44100.0);
        let f = extractor.analyze(&tone(100.0, 44100.0, 2048));
        assert!(f.bass > f.mid, "bass {} vs mid {}", f.bass, f.mid);
        assert!(f.bass > f.treble);
    }

    #[test]
    fn treble_tone_lands_in_treble_band() {
        let mut extractor = FeatureExtractor::new(2048, 44100.0);
        let f = extractor.analyze(&tone(8000.0, 44100.0, 2048));
        assert!(f.treble > f.bass);
        assert!(f.treble > f.mid);
    }

    #[test]
    fn rms_of_full_scale_sine() {
        let mut extractor = FeatureExtractor::new(1024, 44100.0);
        let f = extractor.analyze(&tone(441.0, 44100.0, 1024));
        // Sine RMS is 1/sqrt(2).
        assert!((f.rms - 0.707).abs() < 0.02);
        assert!((f.peak - 1.0).abs() < 0.01);
    }

    #[test]
    fn quiet_then_loud_triggers_beat() {
        let mut extractor = FeatureExtractor::new(1024, 44100.0);
        let quiet: Vec<f32> = tone(200.0, 44100.0, 1024).iter().map(|s| s * 0.05).collect();
        for _ in 0..20 {
            extractor.analyze(&quiet);
        }
        let loud = tone(200.0, 44100.0, 1024);
        let f = extractor.analyze(&loud);
        assert_eq!(f.beat_pulse, 1.0);
    }

    #[test]
    fn steady_level_does_not_rebeat() {
        let mut extractor = FeatureExtractor::new(1024, 44100.0);
        let loud = tone(200.0, 44100.0, 1024);
        for _ in 0..50 {
            extractor.analyze(&loud);
        }
        let f = extractor.analyze(&loud);
        assert_eq!(f.beat_pulse, 0.0);
    }

    #[test]
    fn feature_lookup_matches_fields() {
        let f = AudioFeatures {
            rms: 0.1,
            peak: 0.2,
            bass: 0.3,
            mid: 0.4,
            treble: 0.5,
            beat_pulse: 1.0,
        };
        assert_eq!(f.get(AudioFeature::Rms), 0.1);
        assert_eq!(f.get(AudioFeature::Treble), 0.5);
        assert_eq!(f.get(AudioFeature::Beat), 1.0);
    }
}
