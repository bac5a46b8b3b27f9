//! The `serve` command: run both players and the Art-Net stage.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Args;

use lumen_analysis::CaptureDevice;
use lumen_artnet::{ArtNetOutput, BitDepth, DeltaConfig, PointSet};
use lumen_config::SessionSnapshot;
use lumen_engine::{ClipRegistry, PlayerConfig, PlayerId, PlayerManager};
use lumen_registry::{EffectRegistry, GeneratorRegistry, TransitionRegistry};

/// Arguments for `lumen serve`.
#[derive(Args)]
pub struct ServeArgs {
    /// Session file to restore on startup and save on shutdown
    #[arg(long)]
    session: Option<PathBuf>,

    /// Point-set file for the Art-Net stage
    #[arg(long)]
    points: Option<PathBuf>,

    /// Art-Net destination address
    #[arg(long, default_value = "127.0.0.1:6454")]
    target: SocketAddr,

    /// Output frame width
    #[arg(long, default_value_t = 320)]
    width: u32,

    /// Output frame height
    #[arg(long, default_value_t = 180)]
    height: u32,

    /// FPS cap for both players
    #[arg(long, default_value_t = 30.0)]
    fps: f32,

    /// Art-Net channel depth: 8 or 16 bits
    #[arg(long, default_value_t = 8)]
    bit_depth: u8,

    /// Disable delta encoding (send full frames every frame)
    #[arg(long)]
    no_delta: bool,

    /// Audio capture source for audio-reactive sequences
    #[arg(long, value_parser = parse_capture_device)]
    audio: Option<CaptureDevice>,

    /// Start playback immediately
    #[arg(long)]
    play: bool,
}

fn parse_capture_device(s: &str) -> Result<CaptureDevice, String> {
    match s {
        "microphone" | "mic" => Ok(CaptureDevice::Microphone),
        "line-in" => Ok(CaptureDevice::LineIn),
        "loopback" => Ok(CaptureDevice::Loopback),
        other => Err(format!(
            "unknown audio source '{other}' (microphone, line-in, loopback)"
        )),
    }
}

pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    let effects = Arc::new(EffectRegistry::new());
    let generators = Arc::new(GeneratorRegistry::new());
    let transitions = Arc::new(TransitionRegistry::new());
    let registry = ClipRegistry::new(effects);

    let mut video_config = PlayerConfig::new(PlayerId::Video, (args.width, args.height));
    video_config.fps_cap = args.fps;
    let mut artnet_config = PlayerConfig::new(PlayerId::Artnet, (args.width, args.height));
    artnet_config.fps_cap = args.fps;

    let manager = PlayerManager::new(registry, generators, transitions, video_config, artnet_config);

    if let Some(path) = &args.session {
        if path.exists() {
            let snapshot = SessionSnapshot::load(path)
                .with_context(|| format!("loading session {}", path.display()))?;
            snapshot.restore(&manager)?;
        } else {
            tracing::warn!(path = %path.display(), "session file missing, starting empty");
        }
    }

    if let Some(path) = &args.points {
        let point_set =
            PointSet::load(path).with_context(|| format!("loading points {}", path.display()))?;
        let bit_depth = match args.bit_depth {
            16 => BitDepth::Sixteen,
            _ => BitDepth::Eight,
        };
        let mut delta = DeltaConfig::for_depth(bit_depth);
        delta.enabled = !args.no_delta;

        let mut output = ArtNetOutput::new(args.target, point_set, delta)
            .context("binding Art-Net socket")?;
        manager
            .core(PlayerId::Artnet)
            .lock()
            .set_frame_sink(Box::new(move |frame| {
                // Send errors are logged inside; the frame is dropped
                // and the delta baseline stays put.
                let _ = output.send_frame(frame);
            }));
    } else {
        tracing::warn!("no point set given, Art-Net output disabled");
    }

    if let Some(device) = args.audio {
        if let Err(err) = manager.start_audio(device) {
            tracing::error!(error = %err, "audio analyzer unavailable, sequences read zero");
        }
    }

    manager.start();
    if args.play {
        manager.play(PlayerId::Video);
        manager.play(PlayerId::Artnet);
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .context("installing signal handler")?;

    tracing::info!(target = %args.target, "serving, ctrl-c to stop");
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    manager.stop();
    manager.stop_audio();

    if let Some(path) = &args.session {
        SessionSnapshot::capture(&manager)
            .save(path)
            .with_context(|| format!("saving session {}", path.display()))?;
    }
    Ok(())
}
