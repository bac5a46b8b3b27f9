//! Live audio capture and feature publication.
//!
//! The analyzer opens a cpal input stream on the selected device and
//! accumulates samples into fixed-size blocks inside the audio
//! callback. Each full block runs through the [`FeatureExtractor`] and
//! the result is swapped into a shared [`AudioFeatures`] cell under a
//! mutex. The lock is held only for the struct copy; FFT buffers never
//! cross threads.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use thiserror::Error;

use crate::{AudioFeatures, FeatureExtractor};

/// Capture sample rate. LED feature extraction has no use for more.
const SAMPLE_RATE: u32 = 44_100;

/// Analysis block size in samples.
const BLOCK_SIZE: usize = 1024;

/// Which input the analyzer captures from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureDevice {
    /// The default input device.
    #[default]
    Microphone,
    /// A device whose name mentions "line".
    LineIn,
    /// A monitor/loopback device exposing system output.
    Loopback,
}

impl CaptureDevice {
    /// Substring used to match device names for the non-default variants.
    fn name_hint(self) -> Option<&'static str> {
        match self {
            CaptureDevice::Microphone => None,
            CaptureDevice::LineIn => Some("line"),
            CaptureDevice::Loopback => Some("monitor"),
        }
    }
}

/// Errors from starting the capture stream.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// No input device is available.
    #[error("no audio input device available")]
    NoDevice,

    /// No device matched the requested capture source.
    #[error("no input device matching '{0}'")]
    DeviceNotFound(String),

    /// The stream could not be configured or started.
    #[error("audio stream error: {0}")]
    Stream(String),
}

/// Keeps a platform stream alive until dropped.
///
/// The wrapped value must be `Send` so the handle can move between
/// threads with the analyzer.
struct StreamHandle {
    _inner: Box<dyn Send>,
}

/// Captures audio and publishes [`AudioFeatures`].
///
/// When no device can be opened the analyzer stays stopped and the
/// published features remain zero, which audio sequences map to their
/// configured minimum. Playback never depends on the analyzer running.
pub struct AudioAnalyzer {
    features: Arc<Mutex<AudioFeatures>>,
    stream: Option<StreamHandle>,
}

impl Default for AudioAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioAnalyzer {
    /// Create a stopped analyzer.
    pub fn new() -> Self {
        Self {
            features: Arc::new(Mutex::new(AudioFeatures::default())),
            stream: None,
        }
    }

    /// Whether a capture stream is currently running.
    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Copy of the latest published features.
    pub fn snapshot(&self) -> AudioFeatures {
        *self.features.lock()
    }

    /// Shared handle for readers on other threads.
    pub fn features_handle(&self) -> Arc<Mutex<AudioFeatures>> {
        Arc::clone(&self.features)
    }

    /// Open the capture stream on the selected device.
    ///
    /// Restarting an already-running analyzer replaces the stream.
    pub fn start(&mut self, device: CaptureDevice) -> Result<(), AnalyzerError> {
        self.stop();

        let host = cpal::default_host();
        let cpal_device = find_input_device(&host, device)?;
        let device_label = cpal_device.name().unwrap_or_else(|_| "unknown".into());

        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            buffer_size: cpal::BufferSize::Default,
        };

        let features = Arc::clone(&self.features);
        let mut extractor = FeatureExtractor::new(BLOCK_SIZE, SAMPLE_RATE as f32);
        let mut block = Vec::with_capacity(BLOCK_SIZE);

        let stream = cpal_device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    for &sample in data {
                        block.push(sample);
                        if block.len() == BLOCK_SIZE {
                            let snapshot = extractor.analyze(&block);
                            *features.lock() = snapshot;
                            block.clear();
                        }
                    }
                },
                |err| tracing::error!(error = %err, "audio capture stream error"),
                None,
            )
            .map_err(|e| AnalyzerError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AnalyzerError::Stream(e.to_string()))?;

        tracing::info!(device = %device_label, source = ?device, "audio analyzer started");
        self.stream = Some(StreamHandle {
            _inner: Box::new(stream),
        });
        Ok(())
    }

    /// Stop capture and reset the published features to zero.
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!("audio analyzer stopped");
        }
        *self.features.lock() = AudioFeatures::default();
    }
}

fn find_input_device(
    host: &cpal::Host,
    device: CaptureDevice,
) -> Result<cpal::Device, AnalyzerError> {
    match device.name_hint() {
        None => host.default_input_device().ok_or(AnalyzerError::NoDevice),
        Some(hint) => {
            let devices = host
                .input_devices()
                .map_err(|e| AnalyzerError::Stream(e.to_string()))?;
            for candidate in devices {
                if let Ok(name) = candidate.name()
                    && name.to_lowercase().contains(hint)
                {
                    return Ok(candidate);
                }
            }
            Err(AnalyzerError::DeviceNotFound(hint.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_analyzer_reads_zero() {
        let analyzer = AudioAnalyzer::new();
        assert!(!analyzer.is_running());
        assert_eq!(analyzer.snapshot(), AudioFeatures::default());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut analyzer = AudioAnalyzer::new();
        analyzer.stop();
        analyzer.stop();
        assert!(!analyzer.is_running());
    }

    #[test]
    fn shared_handle_sees_writes() {
        let analyzer = AudioAnalyzer::new();
        let handle = analyzer.features_handle();
        handle.lock().rms = 0.5;
        assert_eq!(analyzer.snapshot().rms, 0.5);
    }
}
