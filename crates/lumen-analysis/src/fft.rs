//! Real-FFT wrapper with Hann windowing.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{FftPlanner, num_complex::Complex};

/// Forward FFT processor with a cached plan and window.
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
    size: usize,
}

impl Fft {
    /// Create an FFT processor for the given block size.
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let window = (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
            .collect();
        Self { fft, window, size }
    }

    /// FFT block size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Windowed forward FFT of a real block.
    ///
    /// Returns magnitudes for the positive-frequency bins (DC through
    /// Nyquist, `size/2 + 1` values), normalized by block length.
    pub fn magnitudes(&self, input: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = input
            .iter()
            .zip(self.window.iter())
            .map(|(&x, &w)| Complex::new(x * w, 0.0))
            .collect();
        buffer.resize(self.size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        let scale = 2.0 / self.size as f32;
        buffer
            .iter()
            .take(self.size / 2 + 1)
            .map(|c| c.norm() * scale)
            .collect()
    }

    /// The frequency in Hz of a given bin at a sample rate.
    pub fn bin_hz(&self, bin: usize, sample_rate: f32) -> f32 {
        bin as f32 * sample_rate / self.size as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_tone_peaks_at_its_bin() {
        let fft = Fft::new(1024);
        let sample_rate = 44100.0;
        // 10 full cycles across the block lands exactly on bin 10.
        let input: Vec<f32> = (0..1024)
            .map(|i| (2.0 * PI * 10.0 * i as f32 / 1024.0).sin())
            .collect();
        let mags = fft.magnitudes(&input);

        let peak_bin = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_bin, 10);
        assert!(fft.bin_hz(peak_bin, sample_rate) > 400.0);
    }

    #[test]
    fn silence_is_flat() {
        let fft = Fft::new(256);
        let mags = fft.magnitudes(&vec![0.0; 256]);
        assert!(mags.iter().all(|&m| m < 1e-6));
    }

    #[test]
    fn bin_count_is_half_plus_one() {
        let fft = Fft::new(512);
        assert_eq!(fft.magnitudes(&vec![0.0; 512]).len(), 257);
    }
}
