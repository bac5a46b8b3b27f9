//! The per-tick modulation engine.
//!
//! The engine owns the audio analyzer and the set of active sequences.
//! The player manager drives `tick(dt, sink)` once per frame; every
//! active sequence is evaluated and its value written through the
//! [`ParamSink`], which the clip registry implements. The effect
//! pipeline picks the new values up on the next rendered frame.

use lumen_analysis::{AnalyzerError, AudioAnalyzer, AudioFeatures, CaptureDevice};
use lumen_core::ClipId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Sequence, SequenceRuntime};

/// Address of one modulated parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingPath {
    /// Owning clip.
    pub clip_id: ClipId,
    /// Layer index for layer-local effect chains; `None` targets the
    /// clip's top-level chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<usize>,
    /// Position in the effect chain.
    pub effect_index: usize,
    /// Parameter name within the effect.
    pub parameter: String,
}

/// Returned by a [`ParamSink`] when a binding path no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("binding target {0} does not resolve")]
pub struct PathUnresolved(pub String);

/// Receives modulated parameter writes.
///
/// Implemented by the clip registry. Writes are clamped into the
/// parameter's declared range by the implementation.
pub trait ParamSink {
    /// Write a modulated value to the parameter at `path`.
    fn write_modulated(&self, path: &BindingPath, value: f64) -> Result<(), PathUnresolved>;
}

struct ActiveBinding {
    path: BindingPath,
    runtime: SequenceRuntime,
    /// Suppresses repeated resolution-failure logs; cleared on success.
    invalid: bool,
}

/// Evaluates active sequences and writes their values each frame.
pub struct ModulationEngine {
    analyzer: AudioAnalyzer,
    bindings: Vec<ActiveBinding>,
    time_s: f64,
}

impl Default for ModulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModulationEngine {
    /// Create an engine with a stopped analyzer and no bindings.
    pub fn new() -> Self {
        Self {
            analyzer: AudioAnalyzer::new(),
            bindings: Vec::new(),
            time_s: 0.0,
        }
    }

    /// Start audio capture for audio-reactive sequences.
    pub fn start_audio(&mut self, device: CaptureDevice) -> Result<(), AnalyzerError> {
        self.analyzer.start(device)
    }

    /// Stop audio capture; audio sequences evaluate from zero features.
    pub fn stop_audio(&mut self) {
        self.analyzer.stop();
    }

    /// Whether the analyzer is capturing.
    pub fn audio_running(&self) -> bool {
        self.analyzer.is_running()
    }

    /// Latest analyzer feature snapshot.
    pub fn audio_features(&self) -> AudioFeatures {
        self.analyzer.snapshot()
    }

    /// Number of active bindings.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Activate one binding.
    ///
    /// An existing binding for the same path is replaced, so reloading
    /// a clip's sequences is idempotent.
    pub fn bind(&mut self, path: BindingPath, sequence: Sequence) {
        self.unbind(&path);
        self.bindings.push(ActiveBinding {
            path,
            runtime: SequenceRuntime::new(sequence),
            invalid: false,
        });
    }

    /// Deactivate the binding for a path, if any.
    pub fn unbind(&mut self, path: &BindingPath) {
        self.bindings.retain(|b| &b.path != path);
    }

    /// Activate all of a clip's bindings at once (clip became active).
    pub fn load_clip_bindings(
        &mut self,
        clip_id: ClipId,
        bindings: impl IntoIterator<Item = (BindingPath, Sequence)>,
    ) {
        self.unload_clip_bindings(clip_id);
        for (path, sequence) in bindings {
            debug_assert_eq!(path.clip_id, clip_id);
            self.bind(path, sequence);
        }
        tracing::debug!(clip = %clip_id, count = self.binding_count(), "sequences loaded");
    }

    /// Drop every binding owned by a clip (clip left active state).
    pub fn unload_clip_bindings(&mut self, clip_id: ClipId) {
        self.bindings.retain(|b| b.path.clip_id != clip_id);
    }

    /// Evaluate every binding and write the results through `sink`.
    ///
    /// `dt` is the seconds elapsed since the previous tick. Unresolved
    /// targets are skipped and retried on later ticks; they log once
    /// per transition into the invalid state.
    pub fn tick(&mut self, dt: f64, sink: &dyn ParamSink) {
        self.time_s += dt.max(0.0);
        let features = self.analyzer.snapshot();

        for binding in &mut self.bindings {
            let value = binding.runtime.evaluate(self.time_s, &features);
            match sink.write_modulated(&binding.path, value) {
                Ok(()) => binding.invalid = false,
                Err(err) => {
                    if !binding.invalid {
                        tracing::warn!(
                            clip = %binding.path.clip_id,
                            parameter = %binding.path.parameter,
                            error = %err,
                            "sequence target unresolved, binding suspended"
                        );
                    }
                    binding.invalid = true;
                }
            }
        }
    }

    /// Engine clock in seconds.
    pub fn time_s(&self) -> f64 {
        self.time_s
    }
}
