//! The playback engine.
//!
//! [`PlayerCore`] holds all rendering logic and is driven one frame at
//! a time through [`PlayerCore::step`], with the clock passed in so
//! tests can run frame-accurate scenarios without sleeping. [`Player`]
//! wraps a core in its dedicated run-loop thread: an FPS-capped tick
//! that drops frames on overrun rather than bursting to catch up, and a
//! command channel drained between frames so external requests never
//! race the render path.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use thiserror::Error;

use lumen_core::{
    ClipId, Frame, FrameSource, PixelEffect, RenderContext, composite_into,
};
use lumen_registry::{EffectRegistry, GeneratorRegistry, TransitionRegistry};

use crate::clip::{EffectSlot, PlayerId};
use crate::registry::ClipRegistry;
use crate::source::make_source;
use crate::transition::TransitionManager;

/// Consecutive effect failures before the effect is demoted to
/// disabled.
pub const DEFAULT_DEMOTE_THRESHOLD: u32 = 30;

/// Errors from player control operations.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The playlist index does not exist.
    #[error("playlist index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Playlist length.
        len: usize,
    },

    /// The playlist references a clip the registry no longer holds.
    #[error("clip {0} is not registered")]
    UnknownClip(ClipId),
}

/// Playback state of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing loaded or explicitly stopped.
    #[default]
    Idle,
    /// Rendering frames.
    Playing,
    /// Holding the last frame.
    Paused,
}

/// Construction-time player settings.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Which player this is.
    pub id: PlayerId,
    /// Output frame size; every emitted frame has these dimensions.
    pub frame_size: (u32, u32),
    /// Maximum frames per second.
    pub fps_cap: f32,
    /// Whether this player feeds the Art-Net stage. Immutable.
    pub enable_artnet: bool,
    /// Wrap to playlist start when the last clip ends.
    pub loop_playlist: bool,
    /// Consecutive effect failures before demotion.
    pub demote_threshold: u32,
}

impl PlayerConfig {
    /// Defaults for a player id: 30 FPS, looping playlist, Art-Net
    /// enabled only on the `artnet` player.
    pub fn new(id: PlayerId, frame_size: (u32, u32)) -> Self {
        Self {
            id,
            frame_size,
            fps_cap: 30.0,
            enable_artnet: matches!(id, PlayerId::Artnet),
            loop_playlist: true,
            demote_threshold: DEFAULT_DEMOTE_THRESHOLD,
        }
    }
}

/// Point-in-time view of a player for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStatus {
    /// Player identity.
    pub id: PlayerId,
    /// Playback state.
    pub state: PlaybackState,
    /// Current playlist offset, `None` when nothing is loaded.
    pub current_index: Option<usize>,
    /// Playlist length.
    pub playlist_len: usize,
    /// Whether a transition is in progress.
    pub transition_running: bool,
    /// Most recent non-fatal fault, for the status surface.
    pub last_error: Option<String>,
}

/// Notification payload for clip-index changes.
#[derive(Debug, Clone, Copy)]
pub struct ClipChange {
    /// Player whose index changed.
    pub player: PlayerId,
    /// New playlist index.
    pub index: usize,
    /// Clip now loaded.
    pub clip_id: ClipId,
    /// Clip that was loaded before, if any.
    pub previous: Option<ClipId>,
}

type ClipChangedCallback = Box<dyn Fn(ClipChange) + Send + Sync>;
type FrameSink = Box<dyn FnMut(&Frame) + Send>;

/// One effect-chain position's plugin instance, kept aligned with the
/// registry's slot list and rebuilt when the chain shape changes.
struct EffectInstance {
    plugin_id: String,
    plugin: Option<Box<dyn PixelEffect>>,
}

struct LayerRuntime {
    source: Box<dyn FrameSource>,
    instances: Vec<EffectInstance>,
}

struct ActiveClip {
    clip_id: ClipId,
    base: LayerRuntime,
    overlays: Vec<LayerRuntime>,
    ctx: RenderContext,
    initialized: bool,
}

/// Deterministic per-player render engine.
pub struct PlayerCore {
    config: PlayerConfig,
    registry: ClipRegistry,
    generators: Arc<GeneratorRegistry>,
    transitions: TransitionManager,
    playlist: Vec<ClipId>,
    current_index: Option<usize>,
    state: PlaybackState,
    active: Option<ActiveClip>,
    last_frame: Arc<Mutex<Frame>>,
    has_rendered: bool,
    halted_by_sync: bool,
    on_clip_changed: Option<ClipChangedCallback>,
    frame_sink: Option<FrameSink>,
    last_error: Option<String>,
}

impl PlayerCore {
    /// Create an idle player.
    pub fn new(
        config: PlayerConfig,
        registry: ClipRegistry,
        generators: Arc<GeneratorRegistry>,
        transition_plugins: Arc<TransitionRegistry>,
    ) -> Self {
        let (w, h) = config.frame_size;
        Self {
            config,
            registry,
            generators,
            transitions: TransitionManager::new(transition_plugins),
            playlist: Vec::new(),
            current_index: None,
            state: PlaybackState::Idle,
            active: None,
            last_frame: Arc::new(Mutex::new(Frame::black(w, h))),
            has_rendered: false,
            halted_by_sync: false,
            on_clip_changed: None,
            frame_sink: None,
            last_error: None,
        }
    }

    /// Player settings.
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// The transition manager, for default-spec configuration.
    pub fn transitions_mut(&mut self) -> &mut TransitionManager {
        &mut self.transitions
    }

    /// Shared handle to the last emitted frame, read by preview
    /// streamers and the Art-Net stage.
    pub fn last_frame_handle(&self) -> Arc<Mutex<Frame>> {
        Arc::clone(&self.last_frame)
    }

    /// Copy of the last emitted frame.
    pub fn last_frame(&self) -> Frame {
        self.last_frame.lock().clone()
    }

    /// Install the clip-change callback (wired to the player manager).
    pub fn set_on_clip_changed(&mut self, callback: ClipChangedCallback) {
        self.on_clip_changed = Some(callback);
    }

    /// Install a downstream frame consumer invoked after every render.
    pub fn set_frame_sink(&mut self, sink: FrameSink) {
        self.frame_sink = Some(sink);
    }

    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Current playlist offset, `None` when nothing is loaded.
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// The playlist.
    pub fn playlist(&self) -> &[ClipId] {
        &self.playlist
    }

    /// Whether this player was stopped by master/slave sync rather than
    /// an operator.
    pub fn halted_by_sync(&self) -> bool {
        self.halted_by_sync
    }

    /// Status snapshot.
    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            id: self.config.id,
            state: self.state,
            current_index: self.current_index,
            playlist_len: self.playlist.len(),
            transition_running: self.transitions.is_running(),
            last_error: self.last_error.clone(),
        }
    }

    /// Replace the playlist. An active clip whose index no longer
    /// exists stops the player.
    pub fn set_playlist(&mut self, playlist: Vec<ClipId>) {
        self.playlist = playlist;
        if let Some(index) = self.current_index
            && index >= self.playlist.len()
        {
            self.stop();
        }
    }

    /// Start (or resume) playback.
    ///
    /// Frame sources initialize here, lazily, not at clip registration.
    pub fn play(&mut self, now: Instant) {
        if self.active.is_none() {
            if self.playlist.is_empty() {
                tracing::debug!(player = %self.config.id, "play with empty playlist ignored");
                return;
            }
            if let Err(err) = self.load_clip_by_index(0, now) {
                tracing::warn!(player = %self.config.id, error = %err, "play failed to load");
                return;
            }
        }
        self.state = PlaybackState::Playing;
        self.ensure_initialized();
    }

    /// Hold the current frame.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Halt playback and unload the current clip.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Idle;
        self.active = None;
        self.current_index = None;
        self.transitions.cancel();
    }

    /// Halt due to an out-of-range master index: emit black until the
    /// master returns in range.
    pub fn stop_for_sync(&mut self) {
        self.stop();
        self.halted_by_sync = true;
        let (w, h) = self.config.frame_size;
        *self.last_frame.lock() = Frame::black(w, h);
        tracing::info!(player = %self.config.id, "stopped by master sync, emitting black");
    }

    /// Load the clip at a playlist index, starting a transition when a
    /// rendered frame exists to fade from.
    pub fn load_clip_by_index(&mut self, index: usize, now: Instant) -> Result<(), PlayerError> {
        let clip_id = *self
            .playlist
            .get(index)
            .ok_or(PlayerError::IndexOutOfRange {
                index,
                len: self.playlist.len(),
            })?;
        let clip = self
            .registry
            .get(clip_id)
            .ok_or(PlayerError::UnknownClip(clip_id))?;

        // The override governs the transition *into* this clip, so it
        // is applied before the new clip starts rendering.
        if self.has_rendered {
            let captured = self.last_frame.lock().clone();
            self.transitions
                .begin(captured, clip.transition_override.as_ref(), now);
        }

        let base = LayerRuntime {
            source: make_source(&clip.source, self.config.frame_size, &self.generators),
            instances: Vec::new(),
        };
        let overlays = clip
            .layers
            .iter()
            .map(|layer| LayerRuntime {
                source: make_source(&layer.source, self.config.frame_size, &self.generators),
                instances: Vec::new(),
            })
            .collect();

        let previous = self.active.as_ref().map(|a| a.clip_id);
        self.active = Some(ActiveClip {
            clip_id,
            base,
            overlays,
            ctx: RenderContext::start(self.config.fps_cap),
            initialized: false,
        });
        self.current_index = Some(index);
        self.halted_by_sync = false;

        if self.state == PlaybackState::Playing {
            self.ensure_initialized();
        }

        tracing::info!(player = %self.config.id, index, clip = %clip_id, "clip loaded");
        if let Some(callback) = &self.on_clip_changed {
            callback(ClipChange {
                player: self.config.id,
                index,
                clip_id,
                previous,
            });
        }
        Ok(())
    }

    fn ensure_initialized(&mut self) {
        let Some(active) = &mut self.active else {
            return;
        };
        if active.initialized {
            return;
        }
        if let Err(err) = active.base.source.initialize() {
            self.last_error = Some(err);
        }
        for overlay in &mut active.overlays {
            if let Err(err) = overlay.source.initialize() {
                self.last_error = Some(err);
            }
        }
        active.initialized = true;
    }

    /// Render one frame at time `now`.
    ///
    /// Paused and idle players re-emit the last frame so the preview
    /// stream stays alive.
    pub fn step(&mut self, now: Instant) -> Frame {
        if self.state != PlaybackState::Playing {
            return self.last_frame.lock().clone();
        }
        let Some(clip_id) = self.active.as_ref().map(|a| a.clip_id) else {
            return self.last_frame.lock().clone();
        };
        let Some(snapshot) = self.registry.get(clip_id) else {
            tracing::warn!(player = %self.config.id, clip = %clip_id, "active clip evicted");
            self.stop();
            let (w, h) = self.config.frame_size;
            let black = Frame::black(w, h);
            *self.last_frame.lock() = black.clone();
            return black;
        };

        let (w, h) = self.config.frame_size;
        let Some(active) = self.active.as_mut() else {
            return self.last_frame.lock().clone();
        };
        let ctx = active.ctx;

        // Base layer: source frame plus the clip's effect chain.
        let base_out = active.base.source.next_frame();
        let end_of_stream = base_out.end_of_stream;
        let mut frame = base_out.frame.resized(w, h);
        apply_chain(
            &self.registry,
            clip_id,
            None,
            self.config.demote_threshold,
            &mut active.base.instances,
            &snapshot.effects,
            &mut frame,
            &ctx,
        );

        // Overlay layers, bottom to top. The runtime list is rebuilt
        // when the registry's layer count changes shape.
        if active.overlays.len() != snapshot.layers.len() {
            active.overlays = snapshot
                .layers
                .iter()
                .map(|layer| {
                    let mut runtime = LayerRuntime {
                        source: make_source(&layer.source, (w, h), &self.generators),
                        instances: Vec::new(),
                    };
                    if let Err(err) = runtime.source.initialize() {
                        tracing::error!(error = %err, "overlay source failed to initialize");
                    }
                    runtime
                })
                .collect();
        }
        for (layer_index, (runtime, layer)) in active
            .overlays
            .iter_mut()
            .zip(snapshot.layers.iter())
            .enumerate()
        {
            let mut layer_frame = runtime.source.next_frame().frame.resized(w, h);
            apply_chain(
                &self.registry,
                clip_id,
                Some(layer_index),
                self.config.demote_threshold,
                &mut runtime.instances,
                &layer.effects,
                &mut layer_frame,
                &ctx,
            );
            composite_into(&mut frame, &layer_frame, layer.blend_mode, layer.opacity);
        }

        active.ctx = ctx.advanced();

        // Blend through any running transition.
        let rendered = self.transitions.blend(&frame, now);

        *self.last_frame.lock() = rendered.clone();
        self.has_rendered = true;

        if let Some(sink) = &mut self.frame_sink {
            sink(&rendered);
        }

        if end_of_stream {
            self.advance_playlist(now);
        }

        rendered
    }

    /// End-of-stream playlist advance, wrapping under `loop_playlist`.
    fn advance_playlist(&mut self, now: Instant) {
        let Some(index) = self.current_index else {
            return;
        };
        let next = index + 1;
        let next = if next < self.playlist.len() {
            next
        } else if self.config.loop_playlist && !self.playlist.is_empty() {
            0
        } else {
            tracing::debug!(player = %self.config.id, "playlist finished");
            self.pause();
            return;
        };
        if let Err(err) = self.load_clip_by_index(next, now) {
            tracing::warn!(player = %self.config.id, error = %err, "playlist advance failed");
        }
    }
}

/// Run one frame through an effect chain, honoring enabled flags and
/// demoting effects that keep failing.
#[allow(clippy::too_many_arguments)]
fn apply_chain(
    registry: &ClipRegistry,
    clip_id: ClipId,
    layer: Option<usize>,
    demote_threshold: u32,
    instances: &mut Vec<EffectInstance>,
    slots: &[EffectSlot],
    frame: &mut Frame,
    ctx: &RenderContext,
) {
    reconcile_instances(instances, slots, registry.effect_plugins());

    for (index, (slot, instance)) in slots.iter().zip(instances.iter_mut()).enumerate() {
        if !slot.enabled {
            continue;
        }
        let Some(plugin) = &mut instance.plugin else {
            continue;
        };
        // A faulting plugin is bypassed for this frame; the frame
        // continues down the chain untouched by it.
        let mut scratch = frame.clone();
        match plugin.apply(&mut scratch, &slot.parameters, ctx) {
            Ok(()) if scratch.dimensions() == frame.dimensions() => {
                *frame = scratch;
                if slot.consecutive_failures > 0 {
                    registry.note_effect_success(clip_id, layer, index);
                }
            }
            outcome => {
                let reason = match outcome {
                    Err(message) => message,
                    Ok(()) => "effect returned a malformed frame".to_owned(),
                };
                tracing::error!(
                    clip = %clip_id,
                    effect = %slot.plugin_id,
                    index,
                    error = %reason,
                    "effect failed, bypassed for this frame"
                );
                if let Ok(count) = registry.note_effect_failure(clip_id, layer, index)
                    && count >= demote_threshold
                {
                    let _ = registry.set_effect_enabled(clip_id, layer, index, false);
                    tracing::warn!(
                        clip = %clip_id,
                        effect = %slot.plugin_id,
                        failures = count,
                        "effect demoted to disabled"
                    );
                }
            }
        }
    }
}

/// Rebuild plugin instances when the chain's plugin-id sequence no
/// longer matches.
fn reconcile_instances(
    instances: &mut Vec<EffectInstance>,
    slots: &[EffectSlot],
    plugins: &EffectRegistry,
) {
    let matches = instances.len() == slots.len()
        && instances
            .iter()
            .zip(slots)
            .all(|(instance, slot)| instance.plugin_id == slot.plugin_id);
    if matches {
        return;
    }
    *instances = slots
        .iter()
        .map(|slot| EffectInstance {
            plugin_id: slot.plugin_id.clone(),
            plugin: plugins.create(&slot.plugin_id),
        })
        .collect();
}

/// Control messages for a running player thread.
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    /// Start or resume playback.
    Play,
    /// Hold the current frame.
    Pause,
    /// Halt and unload.
    Stop,
    /// Load the clip at a playlist index.
    LoadClipByIndex(usize),
    /// Replace the playlist.
    SetPlaylist(Vec<ClipId>),
    /// Terminate the run loop.
    Shutdown,
}

/// A playback engine running in its own thread.
///
/// Commands are queued on a channel and drained between frames, so
/// external requests are serialized against the render path without
/// callers blocking on a frame in flight.
pub struct Player {
    id: PlayerId,
    core: Arc<Mutex<PlayerCore>>,
    tx: Sender<PlayerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl Player {
    /// Spawn the run-loop thread around a shared core.
    pub fn spawn(core: Arc<Mutex<PlayerCore>>) -> Self {
        let id = core.lock().config().id;
        let (tx, rx) = crossbeam_channel::unbounded();
        let thread_core = Arc::clone(&core);
        let handle = std::thread::Builder::new()
            .name(format!("player-{id}"))
            .spawn(move || run_loop(&thread_core, &rx))
            .expect("spawn player thread");
        Self {
            id,
            core,
            tx,
            handle: Some(handle),
        }
    }

    /// Player identity.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Direct access to the core, serialized with the render loop.
    pub fn core(&self) -> &Arc<Mutex<PlayerCore>> {
        &self.core
    }

    /// Queue a command for processing between frames.
    pub fn send(&self, command: PlayerCommand) {
        if self.tx.send(command).is_err() {
            tracing::warn!(player = %self.id, "player thread gone, command dropped");
        }
    }

    /// Copy of the last emitted frame.
    pub fn last_frame(&self) -> Frame {
        self.core.lock().last_frame()
    }

    /// Status snapshot.
    pub fn status(&self) -> PlayerStatus {
        self.core.lock().status()
    }

    /// Stop the thread and join it.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx.send(PlayerCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(core: &Arc<Mutex<PlayerCore>>, rx: &Receiver<PlayerCommand>) {
    let interval = {
        let fps = core.lock().config().fps_cap.max(1.0);
        Duration::from_secs_f64(1.0 / f64::from(fps))
    };
    let mut next_tick = Instant::now() + interval;

    loop {
        // Park until the tick, applying commands as they arrive.
        loop {
            let now = Instant::now();
            if now >= next_tick {
                break;
            }
            match rx.recv_timeout(next_tick - now) {
                Ok(PlayerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
                Ok(command) => apply_command(core, command),
                Err(RecvTimeoutError::Timeout) => break,
            }
        }
        while let Ok(command) = rx.try_recv() {
            match command {
                PlayerCommand::Shutdown => return,
                other => apply_command(core, other),
            }
        }

        let now = Instant::now();
        core.lock().step(now);

        // No catch-up burst: when a frame overran its slot, realign and
        // drop the missed ticks.
        next_tick += interval;
        if Instant::now() > next_tick {
            next_tick = Instant::now() + interval;
        }
    }
}

fn apply_command(core: &Arc<Mutex<PlayerCore>>, command: PlayerCommand) {
    let mut core = core.lock();
    let now = Instant::now();
    match command {
        PlayerCommand::Play => core.play(now),
        PlayerCommand::Pause => core.pause(),
        PlayerCommand::Stop => core.stop(),
        PlayerCommand::LoadClipByIndex(index) => {
            if let Err(err) = core.load_clip_by_index(index, now) {
                tracing::warn!(error = %err, "load command rejected");
            }
        }
        PlayerCommand::SetPlaylist(playlist) => core.set_playlist(playlist),
        PlayerCommand::Shutdown => {}
    }
}
