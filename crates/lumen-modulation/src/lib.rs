//! Per-frame parameter modulation for the lumen LED video server.
//!
//! A [`Sequence`] is a time-varying value source: audio-reactive
//! (driven by the analyzer's feature snapshot), a low-frequency
//! oscillator, or a keyframed timeline. Each active sequence targets
//! one effect parameter addressed by [`BindingPath`]; every tick the
//! [`ModulationEngine`] evaluates all sequences and writes the mapped
//! values through a [`ParamSink`] (implemented by the clip registry).
//!
//! Bindings whose target no longer resolves become no-ops and resume
//! automatically when the target reappears.

mod engine;
mod sequence;

pub use engine::{BindingPath, ModulationEngine, ParamSink, PathUnresolved};
pub use sequence::{Interpolation, Keyframe, LfoWaveform, LoopMode, Sequence, SequenceRuntime};
