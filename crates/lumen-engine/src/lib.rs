//! Playback engines, clip registry, and the dual-player manager.
//!
//! The engine renders clips: a clip's base source plus any overlay
//! layers are composited, run through the clip's effect chain, blended
//! through an in-progress transition, and published as the player's
//! last frame. Two players (`video` for the operator preview, `artnet`
//! for the LED output) share one [`ClipRegistry`] and are coordinated
//! by the [`PlayerManager`], which also implements master/slave
//! playlist synchronization and drives the modulation engine.
//!
//! Rendering logic lives in [`PlayerCore`], which is deterministic and
//! thread-free; [`Player`] wraps a core in its run-loop thread with an
//! FPS-capped tick and a command channel drained between frames.

mod clip;
mod manager;
mod player;
mod registry;
mod source;
mod transition;

pub use clip::{Clip, EffectSlot, Layer, PlayerId, SourceDescriptor, TransitionSpec};
pub use manager::PlayerManager;
pub use player::{
    ClipChange, PlaybackState, Player, PlayerCommand, PlayerConfig, PlayerCore, PlayerError,
    PlayerStatus,
};
pub use registry::{ClipRegistry, RegistryError};
pub use source::{GeneratorSource, VideoSource, make_source};
pub use transition::TransitionManager;
