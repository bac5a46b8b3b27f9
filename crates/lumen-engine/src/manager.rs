//! The dual-player manager with master/slave sync.
//!
//! Owns both playback engines and the clip registry, mediates playlist
//! edits and clip loads, and drives the modulation engine. Master/slave
//! rules: at most one player is master; on every master clip change the
//! slave is loaded at the same index before the change callback
//! returns, so the slave never lags the master by more than one frame.
//! A master index past the end of the slave's playlist stops the slave
//! (black output) until the master returns to an in-range index.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use lumen_analysis::{AnalyzerError, AudioFeatures, CaptureDevice};
use lumen_core::ClipId;
use lumen_modulation::ModulationEngine;
use lumen_registry::{GeneratorRegistry, TransitionRegistry};

use crate::clip::{PlayerId, SourceDescriptor};
use crate::player::{ClipChange, Player, PlayerConfig, PlayerCore, PlayerError, PlayerStatus};
use crate::registry::ClipRegistry;

/// Modulation evaluation rate while the manager is started.
const MODULATION_TICK_HZ: f64 = 60.0;

struct ManagerInner {
    registry: ClipRegistry,
    modulation: Mutex<ModulationEngine>,
    master: Mutex<Option<PlayerId>>,
    video: Arc<Mutex<PlayerCore>>,
    artnet: Arc<Mutex<PlayerCore>>,
}

impl ManagerInner {
    fn core(&self, id: PlayerId) -> &Arc<Mutex<PlayerCore>> {
        match id {
            PlayerId::Video => &self.video,
            PlayerId::Artnet => &self.artnet,
        }
    }

    /// Reacts to a clip-index change on either player. Invoked from the
    /// player's own thread while that player's core lock is held, so it
    /// must never re-lock the changing core.
    fn handle_clip_changed(&self, change: ClipChange) {
        {
            let mut modulation = self.modulation.lock();
            if let Some(previous) = change.previous {
                modulation.unload_clip_bindings(previous);
            }
            modulation.load_clip_bindings(
                change.clip_id,
                self.registry.bindings_for_clip(change.clip_id),
            );
        }

        if *self.master.lock() == Some(change.player) {
            self.sync_slave(change.player.other(), change.index);
        }
    }

    /// Mirror a master index onto a slave. Dispatched synchronously so
    /// the slave's load lands before the master's next frame.
    fn sync_slave(&self, slave_id: PlayerId, index: usize) {
        let mut slave = self.core(slave_id).lock();
        if index < slave.playlist().len() {
            let resume = slave.halted_by_sync();
            let now = Instant::now();
            match slave.load_clip_by_index(index, now) {
                Ok(()) => {
                    if resume {
                        slave.play(now);
                    }
                }
                Err(err) => {
                    tracing::warn!(player = %slave_id, index, error = %err, "slave sync failed");
                }
            }
        } else {
            slave.stop_for_sync();
        }
    }
}

/// Owns the two playback engines and coordinates everything that spans
/// them: the registry, master/slave sync, and modulation.
pub struct PlayerManager {
    inner: Arc<ManagerInner>,
    players: Mutex<Vec<Player>>,
    modulation_thread: Mutex<Option<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
}

impl PlayerManager {
    /// Build the manager with both players idle.
    pub fn new(
        registry: ClipRegistry,
        generators: Arc<GeneratorRegistry>,
        transitions: Arc<TransitionRegistry>,
        video_config: PlayerConfig,
        artnet_config: PlayerConfig,
    ) -> Self {
        let video = Arc::new(Mutex::new(PlayerCore::new(
            video_config,
            registry.clone(),
            Arc::clone(&generators),
            Arc::clone(&transitions),
        )));
        let artnet = Arc::new(Mutex::new(PlayerCore::new(
            artnet_config,
            registry.clone(),
            generators,
            transitions,
        )));

        let inner = Arc::new(ManagerInner {
            registry,
            modulation: Mutex::new(ModulationEngine::new()),
            master: Mutex::new(None),
            video,
            artnet,
        });

        for id in [PlayerId::Video, PlayerId::Artnet] {
            let weak = Arc::downgrade(&inner);
            inner
                .core(id)
                .lock()
                .set_on_clip_changed(Box::new(move |change| {
                    if let Some(inner) = weak.upgrade() {
                        inner.handle_clip_changed(change);
                    }
                }));
        }

        Self {
            inner,
            players: Mutex::new(Vec::new()),
            modulation_thread: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The shared clip registry.
    pub fn registry(&self) -> &ClipRegistry {
        &self.inner.registry
    }

    /// Direct access to a player core, serialized with its render loop.
    pub fn core(&self, id: PlayerId) -> &Arc<Mutex<PlayerCore>> {
        self.inner.core(id)
    }

    /// Spawn both player threads and the modulation tick thread.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut players = self.players.lock();
        players.push(Player::spawn(Arc::clone(&self.inner.video)));
        players.push(Player::spawn(Arc::clone(&self.inner.artnet)));

        let inner = Arc::clone(&self.inner);
        let running = Arc::clone(&self.running);
        let handle = std::thread::Builder::new()
            .name("modulation".to_owned())
            .spawn(move || {
                let interval = Duration::from_secs_f64(1.0 / MODULATION_TICK_HZ);
                let mut last = Instant::now();
                while running.load(Ordering::SeqCst) {
                    std::thread::sleep(interval);
                    let now = Instant::now();
                    let dt = now.duration_since(last).as_secs_f64();
                    last = now;
                    inner.modulation.lock().tick(dt, &inner.registry);
                }
            })
            .expect("spawn modulation thread");
        *self.modulation_thread.lock() = Some(handle);
        tracing::info!("player manager started");
    }

    /// Stop both players and the modulation thread, joining all of
    /// them.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for mut player in self.players.lock().drain(..) {
            player.shutdown();
        }
        if let Some(handle) = self.modulation_thread.lock().take() {
            let _ = handle.join();
        }
        tracing::info!("player manager stopped");
    }

    /// Register a clip for a player, returning its id.
    pub fn register_clip(&self, owner: PlayerId, source: SourceDescriptor) -> ClipId {
        self.inner.registry.register(owner, source)
    }

    /// Unregister a clip, cascading to its modulation bindings.
    pub fn unregister_clip(&self, id: ClipId) {
        match self.inner.registry.unregister(id) {
            Ok(_) => self.inner.modulation.lock().unload_clip_bindings(id),
            Err(err) => tracing::warn!(error = %err, "unregister ignored"),
        }
    }

    /// Replace a player's playlist.
    pub fn set_playlist(&self, id: PlayerId, playlist: Vec<ClipId>) {
        self.inner.core(id).lock().set_playlist(playlist);
    }

    /// Load a clip by playlist index on a player.
    pub fn load_clip(&self, id: PlayerId, index: usize) -> Result<(), PlayerError> {
        self.inner
            .core(id)
            .lock()
            .load_clip_by_index(index, Instant::now())
    }

    /// Start playback on a player.
    pub fn play(&self, id: PlayerId) {
        self.inner.core(id).lock().play(Instant::now());
    }

    /// Pause a player.
    pub fn pause(&self, id: PlayerId) {
        self.inner.core(id).lock().pause();
    }

    /// Stop a player.
    pub fn stop_player(&self, id: PlayerId) {
        self.inner.core(id).lock().stop();
    }

    /// Current master, if any.
    pub fn master(&self) -> Option<PlayerId> {
        *self.inner.master.lock()
    }

    /// Select (or clear) the master player.
    ///
    /// On selection the slave is synchronized to the master's current
    /// index immediately.
    pub fn set_master(&self, master: Option<PlayerId>) {
        *self.inner.master.lock() = master;
        let Some(master_id) = master else {
            tracing::info!("master cleared");
            return;
        };
        tracing::info!(player = %master_id, "master selected");
        let master_index = self.inner.core(master_id).lock().current_index();
        if let Some(index) = master_index {
            self.inner.sync_slave(master_id.other(), index);
        }
    }

    /// Per-player status snapshots.
    pub fn status(&self) -> HashMap<PlayerId, PlayerStatus> {
        [PlayerId::Video, PlayerId::Artnet]
            .into_iter()
            .map(|id| (id, self.inner.core(id).lock().status()))
            .collect()
    }

    /// Evaluate all modulation sequences once with an explicit `dt`.
    ///
    /// The started manager drives this from its own thread; tests and
    /// embedders can call it directly.
    pub fn tick_modulation(&self, dt: f64) {
        self.inner.modulation.lock().tick(dt, &self.inner.registry);
    }

    /// Start the audio analyzer for audio-reactive sequences.
    pub fn start_audio(&self, device: CaptureDevice) -> Result<(), AnalyzerError> {
        self.inner.modulation.lock().start_audio(device)
    }

    /// Stop the audio analyzer.
    pub fn stop_audio(&self) {
        self.inner.modulation.lock().stop_audio();
    }

    /// Latest audio feature snapshot.
    pub fn audio_features(&self) -> AudioFeatures {
        self.inner.modulation.lock().audio_features()
    }

    /// Whether the analyzer is capturing.
    pub fn audio_running(&self) -> bool {
        self.inner.modulation.lock().audio_running()
    }
}

impl Drop for PlayerManager {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{ParamMap, ParamValue};
    use lumen_modulation::{LfoWaveform, Sequence};
    use lumen_registry::EffectRegistry;

    fn manager() -> PlayerManager {
        let registry = ClipRegistry::new(Arc::new(EffectRegistry::new()));
        PlayerManager::new(
            registry,
            Arc::new(GeneratorRegistry::new()),
            Arc::new(TransitionRegistry::new()),
            PlayerConfig::new(PlayerId::Video, (2, 1)),
            PlayerConfig::new(PlayerId::Artnet, (2, 1)),
        )
    }

    fn solid_clip(m: &PlayerManager, owner: PlayerId, rgb: [u8; 3]) -> ClipId {
        let mut params = ParamMap::new();
        params.insert("color".into(), ParamValue::Color(rgb));
        m.register_clip(
            owner,
            SourceDescriptor::Generator {
                plugin_id: "solid".into(),
                initial_params: params,
            },
        )
    }

    /// The master/slave walk from the end-to-end scenarios: master
    /// playlist of 4, slave playlist of 2. Indices 0 and 1 mirror;
    /// index 2 stops the slave; returning to 0 resumes it.
    #[test]
    fn master_slave_clip_walk() {
        let m = manager();
        let master_clips: Vec<_> = (0..4u8)
            .map(|i| solid_clip(&m, PlayerId::Video, [i * 10, 0, 0]))
            .collect();
        let slave_clips: Vec<_> = (0..2u8)
            .map(|i| solid_clip(&m, PlayerId::Artnet, [0, i * 10, 0]))
            .collect();
        m.set_playlist(PlayerId::Video, master_clips);
        m.set_playlist(PlayerId::Artnet, slave_clips);
        m.set_master(Some(PlayerId::Video));
        m.play(PlayerId::Artnet);

        m.load_clip(PlayerId::Video, 0).unwrap();
        assert_eq!(m.core(PlayerId::Artnet).lock().current_index(), Some(0));

        m.load_clip(PlayerId::Video, 1).unwrap();
        assert_eq!(m.core(PlayerId::Artnet).lock().current_index(), Some(1));

        // Out of the slave's range: it stops and emits black.
        m.load_clip(PlayerId::Video, 2).unwrap();
        {
            let slave = m.core(PlayerId::Artnet).lock();
            assert!(slave.halted_by_sync());
            assert_eq!(slave.last_frame().pixel(0, 0), [0, 0, 0]);
        }

        // Master back in range: slave resumes at 0.
        m.load_clip(PlayerId::Video, 0).unwrap();
        {
            let slave = m.core(PlayerId::Artnet).lock();
            assert_eq!(slave.current_index(), Some(0));
            assert!(!slave.halted_by_sync());
            assert_eq!(slave.state(), crate::player::PlaybackState::Playing);
        }
    }

    #[test]
    fn master_selection_syncs_immediately() {
        let m = manager();
        let a = solid_clip(&m, PlayerId::Video, [1, 0, 0]);
        let b = solid_clip(&m, PlayerId::Video, [2, 0, 0]);
        let s0 = solid_clip(&m, PlayerId::Artnet, [0, 1, 0]);
        let s1 = solid_clip(&m, PlayerId::Artnet, [0, 2, 0]);
        m.set_playlist(PlayerId::Video, vec![a, b]);
        m.set_playlist(PlayerId::Artnet, vec![s0, s1]);

        m.load_clip(PlayerId::Video, 1).unwrap();
        assert_eq!(m.core(PlayerId::Artnet).lock().current_index(), None);

        m.set_master(Some(PlayerId::Video));
        assert_eq!(m.core(PlayerId::Artnet).lock().current_index(), Some(1));
    }

    #[test]
    fn non_master_changes_do_not_sync() {
        let m = manager();
        let a = solid_clip(&m, PlayerId::Video, [1, 0, 0]);
        let s = solid_clip(&m, PlayerId::Artnet, [0, 1, 0]);
        m.set_playlist(PlayerId::Video, vec![a]);
        m.set_playlist(PlayerId::Artnet, vec![s]);
        m.set_master(Some(PlayerId::Video));

        // A slave-side load must not bounce back to the master.
        m.load_clip(PlayerId::Artnet, 0).unwrap();
        assert_eq!(m.core(PlayerId::Video).lock().current_index(), None);
    }

    #[test]
    fn clip_activation_loads_sequences() {
        let m = manager();
        let clip = solid_clip(&m, PlayerId::Video, [100, 100, 100]);
        m.registry().add_effect(clip, "brightness").unwrap();
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
        m.load_clip(PlayerId::Video, 0).unwrap();

        // Tick to the quarter-cycle sine peak and read the parameter
        // back from the registry.
        m.tick_modulation(0.25);
        let factor = m.registry().get_parameters(clip, 0).unwrap()["factor"]
            .as_f64()
            .unwrap();
        assert!((factor - 1.5).abs() < 1e-3, "got {factor}");
    }

    #[test]
    fn lfo_drives_rendered_brightness() {
        // Scenario: brightness factor bound to a 1 Hz sine in
        // [0.5, 1.5]; the rendered frame follows the modulated value.
        let m = manager();
        let clip = solid_clip(&m, PlayerId::Video, [100, 100, 100]);
        m.registry().add_effect(clip, "brightness").unwrap();
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
        m.load_clip(PlayerId::Video, 0).unwrap();
        m.play(PlayerId::Video);

        let start = Instant::now();
        m.tick_modulation(0.25); // sine peak: factor 1.5
        let frame = m.core(PlayerId::Video).lock().step(start);
        assert_eq!(frame.pixel(0, 0), [150, 150, 150]);

        m.tick_modulation(0.5); // three-quarter point: factor 0.5
        let frame = m
            .core(PlayerId::Video)
            .lock()
            .step(start + Duration::from_millis(33));
        assert_eq!(frame.pixel(0, 0), [50, 50, 50]);
    }

    #[test]
    fn unregister_cascades_bindings() {
        let m = manager();
        let clip = solid_clip(&m, PlayerId::Video, [1, 1, 1]);
        m.registry().add_effect(clip, "brightness").unwrap();
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
                    min_value: 0.0,
                    max_value: 1.0,
                },
            )
            .unwrap();
        m.set_playlist(PlayerId::Video, vec![clip]);
        m.load_clip(PlayerId::Video, 0).unwrap();

        m.unregister_clip(clip);
        assert!(!m.registry().contains(clip));
        // Ticking after the cascade must not resurrect the parameter.
        m.tick_modulation(0.25);
    }

    #[test]
    fn started_manager_stops_cleanly() {
        let m = manager();
        let clip = solid_clip(&m, PlayerId::Video, [5, 5, 5]);
        m.set_playlist(PlayerId::Video, vec![clip]);
        m.start();
        m.play(PlayerId::Video);
        std::thread::sleep(Duration::from_millis(120));
        m.stop();
        assert_ne!(
            m.core(PlayerId::Video).lock().last_frame().pixel(0, 0),
            [0, 0, 0],
            "player rendered while started"
        );
    }
}
