//! The session snapshot document.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use lumen_core::ClipId;
use lumen_engine::{
    Clip, EffectSlot, Layer, PlayerId, PlayerManager, SourceDescriptor, TransitionSpec,
};

use crate::ConfigError;

/// Persisted state of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Playlist as clip ids.
    pub playlist: Vec<ClipId>,
    /// Index at save time; `-1` when nothing was loaded. Restore
    /// always re-opens at index 0, paused.
    pub current_index: i64,
    /// Whether the player feeds Art-Net.
    pub enable_artnet: bool,
}

/// A clip as stored in the session document, keyed externally by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ClipSnapshot {
    owner: PlayerId,
    source: SourceDescriptor,
    #[serde(default)]
    effects: Vec<EffectSlot>,
    #[serde(default)]
    layers: Vec<Layer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transition_override: Option<TransitionSpec>,
}

/// The per-project session document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Both players keyed by id string.
    players: BTreeMap<PlayerId, PlayerSnapshot>,
    /// Every registered clip keyed by id.
    clips: BTreeMap<ClipId, ClipSnapshot>,
    /// Selected master, if any.
    #[serde(default)]
    master_playlist: Option<PlayerId>,
}

impl SessionSnapshot {
    /// Capture the current state of the manager.
    pub fn capture(manager: &PlayerManager) -> Self {
        let mut players = BTreeMap::new();
        for id in [PlayerId::Video, PlayerId::Artnet] {
            let core = manager.core(id).lock();
            players.insert(
                id,
                PlayerSnapshot {
                    playlist: core.playlist().to_vec(),
                    current_index: core
                        .current_index()
                        .map(|i| i as i64)
                        .unwrap_or(-1),
                    enable_artnet: core.config().enable_artnet,
                },
            );
        }

        let registry = manager.registry();
        let clips = registry
            .clip_ids()
            .into_iter()
            .filter_map(|id| registry.get(id))
            .map(|clip| {
                (
                    clip.id,
                    ClipSnapshot {
                        owner: clip.owner,
                        source: clip.source,
                        effects: clip.effects,
                        layers: clip.layers,
                        transition_override: clip.transition_override,
                    },
                )
            })
            .collect();

        Self {
            players,
            clips,
            master_playlist: manager.master(),
        }
    }

    /// Check internal consistency: every playlist entry must be a clip
    /// the snapshot defines.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (player, snapshot) in &self.players {
            for clip in &snapshot.playlist {
                if !self.clips.contains_key(clip) {
                    return Err(ConfigError::DanglingClip {
                        player: player.to_string(),
                        clip: clip.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Restore into a manager: registry repopulated, playlists set,
    /// both players paused at index 0, master applied last.
    pub fn restore(&self, manager: &PlayerManager) -> Result<(), ConfigError> {
        self.validate()?;

        for (id, clip) in &self.clips {
            manager.registry().insert(Clip {
                id: *id,
                owner: clip.owner,
                source: clip.source.clone(),
                effects: clip.effects.clone(),
                layers: clip.layers.clone(),
                transition_override: clip.transition_override.clone(),
            });
        }

        for (player, snapshot) in &self.players {
            manager.set_playlist(*player, snapshot.playlist.clone());
            if !snapshot.playlist.is_empty() {
                if let Err(err) = manager.load_clip(*player, 0) {
                    tracing::warn!(player = %player, error = %err, "restore load failed");
                }
                manager.pause(*player);
            }
        }

        manager.set_master(self.master_playlist);
        tracing::info!(
            clips = self.clips.len(),
            master = ?self.master_playlist,
            "session restored"
        );
        Ok(())
    }

    /// Number of clips in the snapshot.
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// The saved master selection.
    pub fn master(&self) -> Option<PlayerId> {
        self.master_playlist
    }

    /// A player's saved state.
    pub fn player(&self, id: PlayerId) -> Option<&PlayerSnapshot> {
        self.players.get(&id)
    }

    /// Serialize to pretty JSON and write to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| ConfigError::write_file(path, e))?;
        tracing::info!(path = %path.display(), clips = self.clips.len(), "session saved");
        Ok(())
    }

    /// Read and parse a session document.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{ParamMap, ParamValue};
    use lumen_engine::{ClipRegistry, PlayerConfig};
    use lumen_modulation::{LfoWaveform, Sequence};
    use lumen_registry::{EffectRegistry, GeneratorRegistry, TransitionRegistry};
    use std::sync::Arc;

    fn manager() -> PlayerManager {
        PlayerManager::new(
            ClipRegistry::new(Arc::new(EffectRegistry::new())),
            Arc::new(GeneratorRegistry::new()),
            Arc::new(TransitionRegistry::new()),
            PlayerConfig::new(PlayerId::Video, (4, 4)),
            PlayerConfig::new(PlayerId::Artnet, (4, 4)),
        )
    }

    fn populated_manager() -> (PlayerManager, ClipId) {
        let m = manager();
        let mut params = ParamMap::new();
        params.insert("color".into(), ParamValue::Color([255, 0, 0]));
        let clip = m.register_clip(
            PlayerId::Video,
            SourceDescriptor::Generator {
                plugin_id: "solid".into(),
                initial_params: params,
            },
        );
        m.registry().add_effect(clip, "brightness").unwrap();
        m.registry()
            .update_parameter(clip, 0, "factor", ParamValue::Float(2.0))
            .unwrap();
        m.registry()
            .attach_sequence(
                clip,
                0,
                "factor",
                Sequence::Lfo {
                    waveform: LfoWaveform::Sine,
                    frequency_hz: 1.0,
                    phase: 0.0,
                    amplitude: 1.0,
                    offset: 0.0,
                    min_value: 0.5,
                    max_value: 1.5,
                },
            )
            .unwrap();
        m.set_playlist(PlayerId::Video, vec![clip]);
        (m, clip)
    }

    #[test]
    fn capture_restore_roundtrip() {
        let (m, clip) = populated_manager();
        let snapshot = SessionSnapshot::capture(&m);
        assert_eq!(snapshot.clip_count(), 1);

        let restored = manager();
        snapshot.restore(&restored).unwrap();

        // Clip record survives with effects, parameters, and sequences.
        let record = restored.registry().get(clip).unwrap();
        assert_eq!(record.effects.len(), 1);
        assert_eq!(
            record.effects[0].parameters["factor"],
            ParamValue::Float(2.0)
        );
        assert!(record.effects[0].sequences.contains_key("factor"));

        // Player is paused at index 0.
        let core = restored.core(PlayerId::Video).lock();
        assert_eq!(core.current_index(), Some(0));
        assert_eq!(core.state(), lumen_engine::PlaybackState::Paused);
    }

    #[test]
    fn file_roundtrip() {
        let (m, _clip) = populated_manager();
        let snapshot = SessionSnapshot::capture(&m);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        snapshot.save(&path).unwrap();

        let loaded = SessionSnapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn master_selection_is_persisted() {
        let (m, _clip) = populated_manager();
        m.set_master(Some(PlayerId::Video));
        let snapshot = SessionSnapshot::capture(&m);
        assert_eq!(snapshot.master(), Some(PlayerId::Video));

        let restored = manager();
        snapshot.restore(&restored).unwrap();
        assert_eq!(restored.master(), Some(PlayerId::Video));
    }

    #[test]
    fn dangling_playlist_entry_fails_validation() {
        let json = format!(
            r#"{{
                "players": {{
                    "video": {{"playlist": ["{}"], "current_index": -1, "enable_artnet": false}},
                    "artnet": {{"playlist": [], "current_index": -1, "enable_artnet": true}}
                }},
                "clips": {{}},
                "master_playlist": null
            }}"#,
            ClipId::new()
        );
        let snapshot: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            snapshot.validate(),
            Err(ConfigError::DanglingClip { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = SessionSnapshot::load(Path::new("/nonexistent/session.json")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
