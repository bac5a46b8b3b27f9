//! The clip data model.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use lumen_core::{BlendMode, ClipId, Easing, ParamMap};
use lumen_modulation::Sequence;

/// The two fixed players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerId {
    /// Operator preview player.
    Video,
    /// LED output player.
    Artnet,
}

impl PlayerId {
    /// The stable string form used in URLs and session files.
    pub const fn as_str(self) -> &'static str {
        match self {
            PlayerId::Video => "video",
            PlayerId::Artnet => "artnet",
        }
    }

    /// The other player.
    pub const fn other(self) -> Self {
        match self {
            PlayerId::Video => PlayerId::Artnet,
            PlayerId::Artnet => PlayerId::Video,
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlayerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(PlayerId::Video),
            "artnet" => Ok(PlayerId::Artnet),
            other => Err(format!("unknown player '{other}'")),
        }
    }
}

/// Where a clip's frames come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDescriptor {
    /// A video file on disk.
    Video {
        /// Resolved path used to open the file.
        absolute_path: PathBuf,
        /// Project-relative path kept for session portability.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relative_path: Option<String>,
    },
    /// A procedural generator plugin.
    Generator {
        /// Generator plugin id.
        plugin_id: String,
        /// Parameters installed at load.
        #[serde(default)]
        initial_params: ParamMap,
    },
}

/// A per-clip transition override, or the playlist default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    /// Transition plugin id.
    pub plugin_id: String,
    /// Transition length in seconds.
    pub duration_s: f64,
    /// Progress curve.
    #[serde(default)]
    pub easing: Easing,
}

impl TransitionSpec {
    /// The stock playlist default: a one-second linear fade.
    pub fn fade_default() -> Self {
        Self {
            plugin_id: "fade".to_owned(),
            duration_s: 1.0,
            easing: Easing::Linear,
        }
    }
}

/// One effect position in a clip's chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSlot {
    /// Effect plugin id.
    pub plugin_id: String,
    /// Current parameter values, schema-valid at all times.
    pub parameters: ParamMap,
    /// Disabled effects stay in the chain but are skipped.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Per-parameter modulation bindings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sequences: BTreeMap<String, Sequence>,
    /// Consecutive render failures; resets on success. Runtime state,
    /// not persisted.
    #[serde(skip)]
    pub consecutive_failures: u32,
}

fn default_enabled() -> bool {
    true
}

impl EffectSlot {
    /// A fresh slot with the given defaults.
    pub fn new(plugin_id: impl Into<String>, parameters: ParamMap) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            parameters,
            enabled: true,
            sequences: BTreeMap::new(),
            consecutive_failures: 0,
        }
    }
}

/// An overlay composited above the clip's base source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// The layer's own frame source.
    pub source: SourceDescriptor,
    /// The layer's own effect chain.
    #[serde(default)]
    pub effects: Vec<EffectSlot>,
    /// How the layer combines with the composite beneath it.
    #[serde(default)]
    pub blend_mode: BlendMode,
    /// Layer opacity in [0,1].
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_opacity() -> f32 {
    1.0
}

/// A registered clip: one source, its effect chain, overlay layers, and
/// an optional transition override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Registry identity.
    pub id: ClipId,
    /// The player this clip belongs to. Exactly one.
    pub owner: PlayerId,
    /// Base frame source.
    pub source: SourceDescriptor,
    /// Effect chain in processing order.
    #[serde(default)]
    pub effects: Vec<EffectSlot>,
    /// Overlay layers, bottom to top.
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// Governs the transition *into* this clip when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_override: Option<TransitionSpec>,
}
