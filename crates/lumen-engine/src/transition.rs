//! Per-player transition state machine.
//!
//! `idle -> running -> idle`. A transition starts when a clip load
//! captures the outgoing frame; every subsequent render blends the
//! capture with the incoming clip's frame until the wall-clock duration
//! elapses. Time is passed in by the caller, which keeps the state
//! machine deterministic under test.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lumen_core::{Easing, Frame, Transition};
use lumen_registry::TransitionRegistry;

use crate::clip::TransitionSpec;

struct ActiveTransition {
    plugin: Box<dyn Transition>,
    captured: Frame,
    started: Instant,
    duration: Duration,
    easing: Easing,
}

/// Drives an in-progress cross-fade for one player.
pub struct TransitionManager {
    registry: Arc<TransitionRegistry>,
    default_spec: TransitionSpec,
    active: Option<ActiveTransition>,
}

impl TransitionManager {
    /// Create an idle manager with the stock fade default.
    pub fn new(registry: Arc<TransitionRegistry>) -> Self {
        Self {
            registry,
            default_spec: TransitionSpec::fade_default(),
            active: None,
        }
    }

    /// The playlist-default transition.
    pub fn default_spec(&self) -> &TransitionSpec {
        &self.default_spec
    }

    /// Replace the playlist-default transition.
    pub fn set_default_spec(&mut self, spec: TransitionSpec) {
        self.default_spec = spec;
    }

    /// Whether a transition is currently running.
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Start a transition from `captured` using `spec`, or the default
    /// when `spec` is `None`.
    ///
    /// A transition already running is aborted and replaced; the caller
    /// passes its current composited frame as the new capture, so
    /// cancellation restarts from what is actually on screen.
    pub fn begin(&mut self, captured: Frame, spec: Option<&TransitionSpec>, now: Instant) {
        let spec = spec.unwrap_or(&self.default_spec).clone();
        if spec.duration_s <= 0.0 {
            self.active = None;
            return;
        }
        let plugin = match self.registry.create(&spec.plugin_id) {
            Some(plugin) => plugin,
            None => {
                tracing::warn!(plugin = %spec.plugin_id, "unknown transition, using fade");
                match self.registry.create("fade") {
                    Some(fade) => fade,
                    None => {
                        self.active = None;
                        return;
                    }
                }
            }
        };
        if self.active.is_some() {
            tracing::debug!("transition aborted by new clip load");
        }
        self.active = Some(ActiveTransition {
            plugin,
            captured,
            started: now,
            duration: Duration::from_secs_f64(spec.duration_s),
            easing: spec.easing,
        });
    }

    /// Abort any running transition.
    pub fn cancel(&mut self) {
        self.active = None;
    }

    /// Blend the incoming frame against the capture at time `now`.
    ///
    /// Returns the incoming frame untouched once the transition has
    /// completed (and transitions back to idle).
    pub fn blend(&mut self, incoming: &Frame, now: Instant) -> Frame {
        let Some(active) = &self.active else {
            return incoming.clone();
        };

        let elapsed = now.saturating_duration_since(active.started);
        if elapsed >= active.duration {
            self.active = None;
            return incoming.clone();
        }

        let progress = elapsed.as_secs_f64() / active.duration.as_secs_f64();
        let eased = active.easing.apply(progress as f32);
        active.plugin.blend(&active.captured, incoming, eased)
    }
}
