//! Frame-source implementations.
//!
//! Initialization is lazy: a source opens its decoder on the first
//! `initialize` call, which the playback engine issues when the player
//! actually starts. Two players may reference the same media file, and
//! opening a second decoder on an already-open file deadlocks in some
//! decoder libraries; deferring until play removes that race.
//!
//! A failed initialization never aborts playback: the source logs the
//! fault and produces solid-black frames of the player's configured
//! size.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use lumen_core::{
    Frame, FrameSource, Generator, ParamMap, RenderContext, SourceFrame, SourceInfo,
    default_params,
};
use lumen_registry::GeneratorRegistry;

use crate::clip::SourceDescriptor;

/// Build the frame source for a descriptor.
///
/// `frame_size` is the owning player's configured output size, used by
/// generators and by the black-frame fallback.
pub fn make_source(
    descriptor: &SourceDescriptor,
    frame_size: (u32, u32),
    generators: &Arc<GeneratorRegistry>,
) -> Box<dyn FrameSource> {
    match descriptor {
        SourceDescriptor::Video { absolute_path, .. } => {
            Box::new(VideoSource::new(absolute_path.clone(), frame_size))
        }
        SourceDescriptor::Generator {
            plugin_id,
            initial_params,
        } => Box::new(GeneratorSource::new(
            plugin_id.clone(),
            initial_params.clone(),
            frame_size,
            Arc::clone(generators),
        )),
    }
}

/// A procedural source wrapping a generator plugin.
///
/// Infinite and stateless across seeks; `seek` is a no-op and `reset`
/// rewinds the clip clock.
pub struct GeneratorSource {
    plugin_id: String,
    params: ParamMap,
    frame_size: (u32, u32),
    registry: Arc<GeneratorRegistry>,
    generator: Option<Box<dyn Generator>>,
    ctx: RenderContext,
    init_failed: bool,
}

impl GeneratorSource {
    /// Create an uninitialized generator source.
    pub fn new(
        plugin_id: String,
        initial_params: ParamMap,
        frame_size: (u32, u32),
        registry: Arc<GeneratorRegistry>,
    ) -> Self {
        let params = registry
            .get(&plugin_id)
            .map(|desc| {
                let mut params = default_params(desc.params);
                params.extend(initial_params.clone());
                params
            })
            .unwrap_or(initial_params);
        Self {
            plugin_id,
            params,
            frame_size,
            registry,
            generator: None,
            ctx: RenderContext::start(30.0),
            init_failed: false,
        }
    }
}

impl FrameSource for GeneratorSource {
    fn initialize(&mut self) -> Result<(), String> {
        if self.generator.is_some() {
            return Ok(());
        }
        match self.registry.create(&self.plugin_id) {
            Some(generator) => {
                self.generator = Some(generator);
                self.init_failed = false;
                Ok(())
            }
            None => {
                self.init_failed = true;
                let msg = format!("unknown generator plugin '{}'", self.plugin_id);
                tracing::error!(plugin = %self.plugin_id, "generator initialization failed");
                Err(msg)
            }
        }
    }

    fn next_frame(&mut self) -> SourceFrame {
        let (w, h) = self.frame_size;
        let started = Instant::now();
        let frame = match &mut self.generator {
            Some(generator) => generator.generate(w, h, &self.params, &self.ctx),
            None => Frame::black(w, h),
        };
        self.ctx = self.ctx.advanced();
        SourceFrame {
            frame,
            latency_ms: started.elapsed().as_secs_f64() * 1000.0,
            end_of_stream: false,
        }
    }

    fn seek(&mut self, _frame_index: u64) {
        // Generators are stateless across seeks.
    }

    fn reset(&mut self) {
        self.ctx = RenderContext::start(self.ctx.fps);
        if let Some(generator) = &mut self.generator {
            generator.reset();
        }
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            width: self.frame_size.0,
            height: self.frame_size.1,
            fps: None,
            frame_count: None,
            loopable: true,
        }
    }
}

/// Probed video metadata.
#[derive(Debug, Clone)]
struct VideoInfo {
    width: u32,
    height: u32,
    fps: f32,
    frame_count: u64,
}

enum VideoState {
    Uninitialized,
    Ready(Box<dyn VideoDecoder>),
    Failed,
}

/// Minimal decode interface shared by the container-probe and FFmpeg
/// backends.
trait VideoDecoder: Send {
    fn info(&self) -> &VideoInfo;
    fn decode_next(&mut self) -> Option<Frame>;
    fn seek(&mut self, frame_index: u64);
}

/// A seekable, finite file-backed source.
///
/// Without the `ffmpeg` feature the file is probed with the pure-Rust
/// `mp4` parser for real dimensions, frame rate, and duration, and
/// frames are synthesized placeholders; enable `ffmpeg` for actual
/// decoding.
pub struct VideoSource {
    path: PathBuf,
    fallback_size: (u32, u32),
    state: VideoState,
    position: u64,
    last_frame: Option<Frame>,
}

impl VideoSource {
    /// Create an unopened video source.
    pub fn new(path: PathBuf, fallback_size: (u32, u32)) -> Self {
        Self {
            path,
            fallback_size,
            state: VideoState::Uninitialized,
            position: 0,
            last_frame: None,
        }
    }

    fn open_decoder(path: &Path) -> Result<Box<dyn VideoDecoder>, String> {
        #[cfg(feature = "ffmpeg")]
        {
            ffmpeg_backend::FfmpegVideoDecoder::open(path)
                .map(|d| Box::new(d) as Box<dyn VideoDecoder>)
        }
        #[cfg(not(feature = "ffmpeg"))]
        {
            ProbeDecoder::open(path).map(|d| Box::new(d) as Box<dyn VideoDecoder>)
        }
    }
}

impl FrameSource for VideoSource {
    fn initialize(&mut self) -> Result<(), String> {
        if matches!(self.state, VideoState::Ready(_)) {
            return Ok(());
        }
        match Self::open_decoder(&self.path) {
            Ok(decoder) => {
                let info = decoder.info();
                tracing::info!(
                    path = %self.path.display(),
                    width = info.width,
                    height = info.height,
                    fps = info.fps,
                    frames = info.frame_count,
                    "video source opened"
                );
                self.state = VideoState::Ready(decoder);
                self.position = 0;
                Ok(())
            }
            Err(msg) => {
                tracing::error!(path = %self.path.display(), error = %msg, "video open failed");
                self.state = VideoState::Failed;
                Err(msg)
            }
        }
    }

    fn next_frame(&mut self) -> SourceFrame {
        let started = Instant::now();
        let (fw, fh) = self.fallback_size;

        let VideoState::Ready(decoder) = &mut self.state else {
            return SourceFrame {
                frame: Frame::black(fw, fh),
                latency_ms: started.elapsed().as_secs_f64() * 1000.0,
                end_of_stream: false,
            };
        };

        let frame_count = decoder.info().frame_count;
        if self.position >= frame_count {
            // End of stream: repeat the last frame and let the playback
            // engine decide whether to loop or advance.
            let frame = self
                .last_frame
                .clone()
                .unwrap_or_else(|| Frame::black(fw, fh));
            return SourceFrame {
                frame,
                latency_ms: started.elapsed().as_secs_f64() * 1000.0,
                end_of_stream: true,
            };
        }

        match decoder.decode_next() {
            Some(frame) => {
                self.position += 1;
                self.last_frame = Some(frame.clone());
                SourceFrame {
                    frame,
                    latency_ms: started.elapsed().as_secs_f64() * 1000.0,
                    end_of_stream: self.position >= frame_count,
                }
            }
            None => {
                let frame = self
                    .last_frame
                    .clone()
                    .unwrap_or_else(|| Frame::black(fw, fh));
                SourceFrame {
                    frame,
                    latency_ms: started.elapsed().as_secs_f64() * 1000.0,
                    end_of_stream: true,
                }
            }
        }
    }

    fn seek(&mut self, frame_index: u64) {
        if let VideoState::Ready(decoder) = &mut self.state {
            decoder.seek(frame_index);
            self.position = frame_index;
        }
    }

    fn reset(&mut self) {
        self.seek(0);
        self.last_frame = None;
    }

    fn info(&self) -> SourceInfo {
        match &self.state {
            VideoState::Ready(decoder) => {
                let info = decoder.info();
                SourceInfo {
                    width: info.width,
                    height: info.height,
                    fps: Some(info.fps),
                    frame_count: Some(info.frame_count),
                    loopable: true,
                }
            }
            _ => SourceInfo {
                width: self.fallback_size.0,
                height: self.fallback_size.1,
                fps: None,
                frame_count: None,
                loopable: true,
            },
        }
    }
}

/// Container-probe backend: real metadata, synthesized frames.
struct ProbeDecoder {
    info: VideoInfo,
    position: u64,
}

impl ProbeDecoder {
    fn open(path: &Path) -> Result<Self, String> {
        let file = File::open(path).map_err(|e| e.to_string())?;
        let size = file.metadata().map_err(|e| e.to_string())?.len();
        let reader = BufReader::new(file);
        let mp4 = mp4::Mp4Reader::read_header(reader, size).map_err(|e| e.to_string())?;

        let track = mp4
            .tracks()
            .values()
            .find(|t| {
                t.track_type()
                    .map(|tt| tt == mp4::TrackType::Video)
                    .unwrap_or(false)
            })
            .ok_or_else(|| "no video track".to_owned())?;

        let fps = if track.frame_rate() > 0.0 {
            track.frame_rate() as f32
        } else {
            25.0
        };
        let duration_s = track.duration().as_secs_f64();
        let frame_count = ((duration_s * f64::from(fps)) as u64).max(1);

        Ok(Self {
            info: VideoInfo {
                width: u32::from(track.width()),
                height: u32::from(track.height()),
                fps,
                frame_count,
            },
            position: 0,
        })
    }
}

impl VideoDecoder for ProbeDecoder {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn decode_next(&mut self) -> Option<Frame> {
        if self.position >= self.info.frame_count {
            return None;
        }
        // Placeholder content: a hue sweep keyed to the frame number so
        // downstream stages see motion.
        let hue = (self.position * 10 % 360) as f32;
        let rgb = hue_to_rgb(hue);
        self.position += 1;
        Some(Frame::solid(self.info.width, self.info.height, rgb))
    }

    fn seek(&mut self, frame_index: u64) {
        self.position = frame_index.min(self.info.frame_count);
    }
}

fn hue_to_rgb(hue: f32) -> [u8; 3] {
    let c = 0.6;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let (r, g, b) = match hue {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [
        (r * 255.0) as u8,
        (g * 255.0) as u8,
        (b * 255.0) as u8,
    ]
}

#[cfg(feature = "ffmpeg")]
mod ffmpeg_backend {
    //! Full decode backend over system FFmpeg.

    use super::{Frame, VideoDecoder, VideoInfo};
    use std::path::Path;

    pub struct FfmpegVideoDecoder {
        info: VideoInfo,
        input: ffmpeg_next::format::context::Input,
        stream_index: usize,
        decoder: ffmpeg_next::codec::decoder::Video,
        scaler: ffmpeg_next::software::scaling::Context,
    }

    impl FfmpegVideoDecoder {
        pub fn open(path: &Path) -> Result<Self, String> {
            ffmpeg_next::init().map_err(|e| e.to_string())?;
            let input = ffmpeg_next::format::input(path).map_err(|e| e.to_string())?;
            let stream = input
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or_else(|| "no video stream".to_owned())?;
            let stream_index = stream.index();

            let codec = ffmpeg_next::codec::Context::from_parameters(stream.parameters())
                .map_err(|e| e.to_string())?;
            let decoder = codec.decoder().video().map_err(|e| e.to_string())?;

            let (width, height) = (decoder.width(), decoder.height());
            let scaler = ffmpeg_next::software::scaling::Context::get(
                decoder.format(),
                width,
                height,
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )
            .map_err(|e| e.to_string())?;

            let rate = stream.rate();
            let fps = rate.0 as f32 / rate.1.max(1) as f32;
            let duration_s =
                input.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE);
            let frame_count = ((duration_s * f64::from(fps)) as u64).max(1);

            Ok(Self {
                info: VideoInfo {
                    width,
                    height,
                    fps,
                    frame_count,
                },
                input,
                stream_index,
                decoder,
                scaler,
            })
        }
    }

    impl VideoDecoder for FfmpegVideoDecoder {
        fn info(&self) -> &VideoInfo {
            &self.info
        }

        fn decode_next(&mut self) -> Option<Frame> {
            let mut decoded = ffmpeg_next::util::frame::Video::empty();
            let mut rgb = ffmpeg_next::util::frame::Video::empty();

            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                if self.decoder.send_packet(&packet).is_err() {
                    continue;
                }
                if self.decoder.receive_frame(&mut decoded).is_ok() {
                    if self.scaler.run(&decoded, &mut rgb).is_err() {
                        return None;
                    }
                    // The scaler may pad rows; copy row by row.
                    let stride = rgb.stride(0);
                    let width = rgb.width() as usize;
                    let data = rgb.data(0);
                    let mut out = Vec::with_capacity(width * rgb.height() as usize * 3);
                    for row in 0..rgb.height() as usize {
                        let start = row * stride;
                        out.extend_from_slice(&data[start..start + width * 3]);
                    }
                    return Frame::from_raw(rgb.width(), rgb.height(), out);
                }
            }
            None
        }

        fn seek(&mut self, frame_index: u64) {
            let fps = f64::from(self.info.fps).max(1.0);
            let timestamp =
                (frame_index as f64 / fps * f64::from(ffmpeg_next::ffi::AV_TIME_BASE)) as i64;
            if self.input.seek(timestamp, ..timestamp).is_err() {
                tracing::warn!(frame = frame_index, "video seek failed");
            }
            self.decoder.flush();
        }
    }
}
