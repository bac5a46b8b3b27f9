//! The clip registry.
//!
//! A UUID-keyed store owning every registered clip's effect chain and
//! modulation bindings. The registry is read on every rendered frame
//! and mutated by the control surface, so it sits behind a single
//! readers-writer lock: playback engines clone a snapshot per frame
//! under a read lock and release it before any CPU-heavy effect work;
//! control-plane mutations take the write lock.
//!
//! The registry is an explicit dependency threaded into the player
//! manager and handlers at startup. There is no process-wide global.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use lumen_core::{ClipId, ParamError, ParamMap, ParamValue, default_params};
use lumen_modulation::{BindingPath, ParamSink, PathUnresolved, Sequence};
use lumen_registry::EffectRegistry;

use crate::clip::{Clip, EffectSlot, Layer, PlayerId, SourceDescriptor, TransitionSpec};

/// Errors from registry operations. All are validation failures
/// rejected at the boundary; none change registry state.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No clip with the given id.
    #[error("unknown clip {0}")]
    UnknownClip(ClipId),

    /// The effect plugin id is not registered.
    #[error("unknown effect plugin '{0}'")]
    UnknownPlugin(String),

    /// The effect index is outside the clip's chain.
    #[error("clip {clip} has no effect at index {index}")]
    EffectIndex {
        /// Clip addressed.
        clip: ClipId,
        /// Offending index.
        index: usize,
    },

    /// The value failed the plugin's parameter schema.
    #[error(transparent)]
    Param(#[from] ParamError),
}

/// UUID-keyed store of clip records.
///
/// Cheap to clone; all clones share the same underlying state.
#[derive(Clone)]
pub struct ClipRegistry {
    clips: Arc<RwLock<HashMap<ClipId, Clip>>>,
    effects: Arc<EffectRegistry>,
    defaults: Arc<RwLock<HashMap<PlayerId, Vec<String>>>>,
}

impl ClipRegistry {
    /// Create an empty registry validating against the given plugins.
    pub fn new(effects: Arc<EffectRegistry>) -> Self {
        Self {
            clips: Arc::new(RwLock::new(HashMap::new())),
            effects,
            defaults: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The effect plugin registry used for validation.
    pub fn effect_plugins(&self) -> &EffectRegistry {
        &self.effects
    }

    /// Configure the effect chain installed on every clip registered
    /// for a player. Unknown ids are ignored with a warning.
    pub fn set_default_effects(&self, owner: PlayerId, plugin_ids: Vec<String>) {
        let valid = plugin_ids
            .into_iter()
            .filter(|id| {
                let known = self.effects.contains(id);
                if !known {
                    tracing::warn!(plugin = %id, "ignoring unknown default effect");
                }
                known
            })
            .collect();
        self.defaults.write().insert(owner, valid);
    }

    /// Register a new clip, returning its fresh id.
    ///
    /// The owner's configured default effects are installed with their
    /// schema defaults.
    pub fn register(&self, owner: PlayerId, source: SourceDescriptor) -> ClipId {
        let id = ClipId::new();
        let effects = self
            .defaults
            .read()
            .get(&owner)
            .map(|ids| {
                ids.iter()
                    .filter_map(|plugin_id| {
                        let desc = self.effects.get(plugin_id)?;
                        Some(EffectSlot::new(plugin_id.clone(), default_params(desc.params)))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let clip = Clip {
            id,
            owner,
            source,
            effects,
            layers: Vec::new(),
            transition_override: None,
        };
        self.clips.write().insert(id, clip);
        tracing::info!(clip = %id, player = %owner, "clip registered");
        id
    }

    /// Insert a fully-formed clip record, keeping its id.
    ///
    /// Used by session restore. Replaces any existing record.
    pub fn insert(&self, clip: Clip) {
        self.clips.write().insert(clip.id, clip);
    }

    /// Remove a clip, returning its record for cascade cleanup
    /// (sequence unloading, plugin instance teardown).
    pub fn unregister(&self, id: ClipId) -> Result<Clip, RegistryError> {
        let removed = self
            .clips
            .write()
            .remove(&id)
            .ok_or(RegistryError::UnknownClip(id))?;
        tracing::info!(clip = %id, "clip unregistered");
        Ok(removed)
    }

    /// Snapshot of one clip record.
    pub fn get(&self, id: ClipId) -> Option<Clip> {
        self.clips.read().get(&id).cloned()
    }

    /// Whether a clip is registered.
    pub fn contains(&self, id: ClipId) -> bool {
        self.clips.read().contains_key(&id)
    }

    /// All registered clip ids.
    pub fn clip_ids(&self) -> Vec<ClipId> {
        self.clips.read().keys().copied().collect()
    }

    /// Number of registered clips.
    pub fn len(&self) -> usize {
        self.clips.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.clips.read().is_empty()
    }

    /// Append an effect to a clip's chain, returning its index.
    pub fn add_effect(&self, id: ClipId, plugin_id: &str) -> Result<usize, RegistryError> {
        let desc = self
            .effects
            .get(plugin_id)
            .ok_or_else(|| RegistryError::UnknownPlugin(plugin_id.to_owned()))?;
        let params = default_params(desc.params);

        let mut clips = self.clips.write();
        let clip = clips.get_mut(&id).ok_or(RegistryError::UnknownClip(id))?;
        clip.effects.push(EffectSlot::new(plugin_id, params));
        Ok(clip.effects.len() - 1)
    }

    /// Remove the effect at an index; later effects shift down.
    pub fn remove_effect(&self, id: ClipId, index: usize) -> Result<(), RegistryError> {
        let mut clips = self.clips.write();
        let clip = clips.get_mut(&id).ok_or(RegistryError::UnknownClip(id))?;
        if index >= clip.effects.len() {
            return Err(RegistryError::EffectIndex { clip: id, index });
        }
        clip.effects.remove(index);
        Ok(())
    }

    /// Remove every effect from a clip.
    pub fn clear_effects(&self, id: ClipId) -> Result<(), RegistryError> {
        let mut clips = self.clips.write();
        let clip = clips.get_mut(&id).ok_or(RegistryError::UnknownClip(id))?;
        clip.effects.clear();
        Ok(())
    }

    /// Move the effect at `from` to position `to`.
    pub fn reorder_effects(&self, id: ClipId, from: usize, to: usize) -> Result<(), RegistryError> {
        let mut clips = self.clips.write();
        let clip = clips.get_mut(&id).ok_or(RegistryError::UnknownClip(id))?;
        if from >= clip.effects.len() {
            return Err(RegistryError::EffectIndex { clip: id, index: from });
        }
        if to >= clip.effects.len() {
            return Err(RegistryError::EffectIndex { clip: id, index: to });
        }
        let slot = clip.effects.remove(from);
        clip.effects.insert(to, slot);
        Ok(())
    }

    /// Update one parameter, validated against the plugin schema.
    ///
    /// Out-of-range and mistyped values are rejected without touching
    /// state.
    pub fn update_parameter(
        &self,
        id: ClipId,
        effect_index: usize,
        name: &str,
        value: ParamValue,
    ) -> Result<(), RegistryError> {
        let mut clips = self.clips.write();
        let clip = clips.get_mut(&id).ok_or(RegistryError::UnknownClip(id))?;
        let slot = clip
            .effects
            .get_mut(effect_index)
            .ok_or(RegistryError::EffectIndex {
                clip: id,
                index: effect_index,
            })?;
        let desc = self
            .effects
            .get(&slot.plugin_id)
            .ok_or_else(|| RegistryError::UnknownPlugin(slot.plugin_id.clone()))?;
        let param = desc
            .param(name)
            .ok_or_else(|| ParamError::UnknownParameter(name.to_owned()))?;
        param.validate(&value)?;
        slot.parameters.insert(name.to_owned(), value);
        Ok(())
    }

    /// Enable or disable an effect without removing it from the chain.
    ///
    /// `layer` selects a layer-local chain; `None` is the top-level
    /// chain.
    pub fn set_effect_enabled(
        &self,
        id: ClipId,
        layer: Option<usize>,
        effect_index: usize,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        let mut clips = self.clips.write();
        let clip = clips.get_mut(&id).ok_or(RegistryError::UnknownClip(id))?;
        let slot = chain_mut(clip, layer)
            .and_then(|chain| chain.get_mut(effect_index))
            .ok_or(RegistryError::EffectIndex {
                clip: id,
                index: effect_index,
            })?;
        slot.enabled = enabled;
        Ok(())
    }

    /// Record a render failure for an effect; returns the consecutive
    /// failure count.
    pub fn note_effect_failure(
        &self,
        id: ClipId,
        layer: Option<usize>,
        effect_index: usize,
    ) -> Result<u32, RegistryError> {
        let mut clips = self.clips.write();
        let clip = clips.get_mut(&id).ok_or(RegistryError::UnknownClip(id))?;
        let slot = chain_mut(clip, layer)
            .and_then(|chain| chain.get_mut(effect_index))
            .ok_or(RegistryError::EffectIndex {
                clip: id,
                index: effect_index,
            })?;
        slot.consecutive_failures += 1;
        Ok(slot.consecutive_failures)
    }

    /// Record a successful render, clearing the failure streak.
    pub fn note_effect_success(
        &self,
        id: ClipId,
        layer: Option<usize>,
        effect_index: usize,
    ) {
        let mut clips = self.clips.write();
        if let Some(slot) = clips
            .get_mut(&id)
            .and_then(|clip| chain_mut(clip, layer))
            .and_then(|chain| chain.get_mut(effect_index))
        {
            slot.consecutive_failures = 0;
        }
    }

    /// Attach a modulation binding to one effect parameter.
    pub fn attach_sequence(
        &self,
        id: ClipId,
        effect_index: usize,
        param_name: &str,
        sequence: Sequence,
    ) -> Result<(), RegistryError> {
        let mut clips = self.clips.write();
        let clip = clips.get_mut(&id).ok_or(RegistryError::UnknownClip(id))?;
        let slot = clip
            .effects
            .get_mut(effect_index)
            .ok_or(RegistryError::EffectIndex {
                clip: id,
                index: effect_index,
            })?;
        let desc = self
            .effects
            .get(&slot.plugin_id)
            .ok_or_else(|| RegistryError::UnknownPlugin(slot.plugin_id.clone()))?;
        if desc.param(param_name).is_none() {
            return Err(ParamError::UnknownParameter(param_name.to_owned()).into());
        }
        slot.sequences.insert(param_name.to_owned(), sequence);
        Ok(())
    }

    /// Remove the binding for one effect parameter, if any.
    pub fn detach_sequence(
        &self,
        id: ClipId,
        effect_index: usize,
        param_name: &str,
    ) -> Result<(), RegistryError> {
        let mut clips = self.clips.write();
        let clip = clips.get_mut(&id).ok_or(RegistryError::UnknownClip(id))?;
        let slot = clip
            .effects
            .get_mut(effect_index)
            .ok_or(RegistryError::EffectIndex {
                clip: id,
                index: effect_index,
            })?;
        slot.sequences.remove(param_name);
        Ok(())
    }

    /// Snapshot of a clip's effect chain.
    pub fn list_effects(&self, id: ClipId) -> Result<Vec<EffectSlot>, RegistryError> {
        self.get(id)
            .map(|c| c.effects)
            .ok_or(RegistryError::UnknownClip(id))
    }

    /// Snapshot of one effect's parameter map.
    pub fn get_parameters(
        &self,
        id: ClipId,
        effect_index: usize,
    ) -> Result<ParamMap, RegistryError> {
        let clips = self.clips.read();
        let clip = clips.get(&id).ok_or(RegistryError::UnknownClip(id))?;
        clip.effects
            .get(effect_index)
            .map(|s| s.parameters.clone())
            .ok_or(RegistryError::EffectIndex {
                clip: id,
                index: effect_index,
            })
    }

    /// Replace a clip's overlay layers.
    pub fn set_layers(&self, id: ClipId, layers: Vec<Layer>) -> Result<(), RegistryError> {
        let mut clips = self.clips.write();
        let clip = clips.get_mut(&id).ok_or(RegistryError::UnknownClip(id))?;
        clip.layers = layers;
        Ok(())
    }

    /// Set or clear a clip's transition override.
    pub fn set_transition_override(
        &self,
        id: ClipId,
        spec: Option<TransitionSpec>,
    ) -> Result<(), RegistryError> {
        let mut clips = self.clips.write();
        let clip = clips.get_mut(&id).ok_or(RegistryError::UnknownClip(id))?;
        clip.transition_override = spec;
        Ok(())
    }

    /// Every modulation binding carried by a clip, as `(path, sequence)`
    /// pairs ready for the modulation engine.
    pub fn bindings_for_clip(&self, id: ClipId) -> Vec<(BindingPath, Sequence)> {
        let clips = self.clips.read();
        let Some(clip) = clips.get(&id) else {
            return Vec::new();
        };
        let mut bindings = Vec::new();
        for (effect_index, slot) in clip.effects.iter().enumerate() {
            for (parameter, sequence) in &slot.sequences {
                bindings.push((
                    BindingPath {
                        clip_id: id,
                        layer: None,
                        effect_index,
                        parameter: parameter.clone(),
                    },
                    sequence.clone(),
                ));
            }
        }
        for (layer_index, layer) in clip.layers.iter().enumerate() {
            for (effect_index, slot) in layer.effects.iter().enumerate() {
                for (parameter, sequence) in &slot.sequences {
                    bindings.push((
                        BindingPath {
                            clip_id: id,
                            layer: Some(layer_index),
                            effect_index,
                            parameter: parameter.clone(),
                        },
                        sequence.clone(),
                    ));
                }
            }
        }
        bindings
    }
}

fn chain_mut(clip: &mut Clip, layer: Option<usize>) -> Option<&mut Vec<EffectSlot>> {
    match layer {
        None => Some(&mut clip.effects),
        Some(l) => clip.layers.get_mut(l).map(|layer| &mut layer.effects),
    }
}

impl ParamSink for ClipRegistry {
    /// Modulation write path: resolve the binding target and store the
    /// value clamped into the parameter's declared range. Unlike
    /// control-plane writes, out-of-range values are clamped rather
    /// than rejected.
    fn write_modulated(&self, path: &BindingPath, value: f64) -> Result<(), PathUnresolved> {
        let unresolved = || PathUnresolved(format!("{}#{}", path.clip_id, path.parameter));

        let mut clips = self.clips.write();
        let clip = clips.get_mut(&path.clip_id).ok_or_else(unresolved)?;
        let slot = chain_mut(clip, path.layer)
            .and_then(|chain| chain.get_mut(path.effect_index))
            .ok_or_else(unresolved)?;
        let desc = self.effects.get(&slot.plugin_id).ok_or_else(unresolved)?;
        let param = desc.param(&path.parameter).ok_or_else(unresolved)?;

        let clamped = param.clamp(ParamValue::Float(value));
        slot.parameters.insert(path.parameter.clone(), clamped);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::ParamMap;
    use lumen_modulation::{LfoWaveform, Sequence};

    fn registry() -> ClipRegistry {
        ClipRegistry::new(Arc::new(EffectRegistry::new()))
    }

    fn generator_source() -> SourceDescriptor {
        SourceDescriptor::Generator {
            plugin_id: "solid".into(),
            initial_params: ParamMap::new(),
        }
    }

    fn lfo() -> Sequence {
        Sequence::Lfo {
            waveform: LfoWaveform::Sine,
            frequency_hz: 1.0,
            phase: 0.0,
            amplitude: 1.0,
            offset: 0.0,
            min_value: 0.5,
            max_value: 1.5,
        }
    }

    #[test]
    fn register_unregister_restores_prior_state() {
        let reg = registry();
        let keeper = reg.register(PlayerId::Video, generator_source());
        let before_ids = {
            let mut ids = reg.clip_ids();
            ids.sort_unstable();
            ids
        };
        let before_keeper = reg.get(keeper).unwrap();

        let transient = reg.register(PlayerId::Artnet, generator_source());
        reg.add_effect(transient, "brightness").unwrap();
        reg.unregister(transient).unwrap();

        let mut after_ids = reg.clip_ids();
        after_ids.sort_unstable();
        assert_eq!(after_ids, before_ids);
        assert_eq!(reg.get(keeper).unwrap(), before_keeper);
    }

    #[test]
    fn default_effects_install_on_register() {
        let reg = registry();
        reg.set_default_effects(PlayerId::Artnet, vec!["brightness".into()]);
        let id = reg.register(PlayerId::Artnet, generator_source());
        let effects = reg.list_effects(id).unwrap();
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].plugin_id, "brightness");
        assert_eq!(
            effects[0].parameters["factor"],
            ParamValue::Float(1.0),
            "schema default installed"
        );
    }

    #[test]
    fn add_effect_validates_plugin() {
        let reg = registry();
        let id = reg.register(PlayerId::Video, generator_source());
        assert!(matches!(
            reg.add_effect(id, "warp_drive"),
            Err(RegistryError::UnknownPlugin(_))
        ));
        assert_eq!(reg.add_effect(id, "brightness").unwrap(), 0);
        assert_eq!(reg.add_effect(id, "contrast").unwrap(), 1);
    }

    #[test]
    fn parameter_write_read_is_bit_identical() {
        let reg = registry();
        let id = reg.register(PlayerId::Video, generator_source());
        reg.add_effect(id, "brightness").unwrap();

        for value in [0.0, 0.1, 1.0, 2.5, 4.999, 5.0] {
            reg.update_parameter(id, 0, "factor", ParamValue::Float(value))
                .unwrap();
            assert_eq!(
                reg.get_parameters(id, 0).unwrap()["factor"],
                ParamValue::Float(value)
            );
        }
    }

    #[test]
    fn out_of_range_parameter_is_rejected_without_state_change() {
        let reg = registry();
        let id = reg.register(PlayerId::Video, generator_source());
        reg.add_effect(id, "brightness").unwrap();
        reg.update_parameter(id, 0, "factor", ParamValue::Float(2.0))
            .unwrap();

        assert!(reg
            .update_parameter(id, 0, "factor", ParamValue::Float(99.0))
            .is_err());
        assert_eq!(
            reg.get_parameters(id, 0).unwrap()["factor"],
            ParamValue::Float(2.0)
        );
    }

    #[test]
    fn reorder_moves_effect() {
        let reg = registry();
        let id = reg.register(PlayerId::Video, generator_source());
        reg.add_effect(id, "brightness").unwrap();
        reg.add_effect(id, "contrast").unwrap();
        reg.add_effect(id, "invert").unwrap();
        reg.reorder_effects(id, 2, 0).unwrap();
        let order: Vec<_> = reg
            .list_effects(id)
            .unwrap()
            .into_iter()
            .map(|s| s.plugin_id)
            .collect();
        assert_eq!(order, ["invert", "brightness", "contrast"]);
    }

    #[test]
    fn attach_sequence_validates_parameter() {
        let reg = registry();
        let id = reg.register(PlayerId::Video, generator_source());
        reg.add_effect(id, "brightness").unwrap();

        assert!(reg.attach_sequence(id, 0, "unknown", lfo()).is_err());
        reg.attach_sequence(id, 0, "factor", lfo()).unwrap();
        assert_eq!(reg.bindings_for_clip(id).len(), 1);

        reg.detach_sequence(id, 0, "factor").unwrap();
        assert!(reg.bindings_for_clip(id).is_empty());
    }

    #[test]
    fn modulated_write_clamps_into_range() {
        let reg = registry();
        let id = reg.register(PlayerId::Video, generator_source());
        reg.add_effect(id, "brightness").unwrap();

        let path = BindingPath {
            clip_id: id,
            layer: None,
            effect_index: 0,
            parameter: "factor".into(),
        };
        reg.write_modulated(&path, 99.0).unwrap();
        assert_eq!(
            reg.get_parameters(id, 0).unwrap()["factor"],
            ParamValue::Float(5.0)
        );
    }

    #[test]
    fn modulated_write_fails_after_effect_removed() {
        let reg = registry();
        let id = reg.register(PlayerId::Video, generator_source());
        reg.add_effect(id, "brightness").unwrap();
        let path = BindingPath {
            clip_id: id,
            layer: None,
            effect_index: 0,
            parameter: "factor".into(),
        };
        assert!(reg.write_modulated(&path, 1.0).is_ok());
        reg.remove_effect(id, 0).unwrap();
        assert!(reg.write_modulated(&path, 1.0).is_err());
    }

    #[test]
    fn failure_streak_tracks_and_resets() {
        let reg = registry();
        let id = reg.register(PlayerId::Video, generator_source());
        reg.add_effect(id, "brightness").unwrap();

        assert_eq!(reg.note_effect_failure(id, None, 0).unwrap(), 1);
        assert_eq!(reg.note_effect_failure(id, None, 0).unwrap(), 2);
        reg.note_effect_success(id, None, 0);
        assert_eq!(reg.note_effect_failure(id, None, 0).unwrap(), 1);
    }
}
