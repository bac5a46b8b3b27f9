//! The frame-source interface.
//!
//! A frame source is owned by exactly one playback thread; nothing in
//! this contract is re-entrant. Many decoder libraries misbehave when a
//! file is opened twice concurrently, which is why [`initialize`]
//! happens lazily on first play rather than at registration time.
//!
//! [`initialize`]: FrameSource::initialize

use crate::Frame;

/// Static information about a source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    /// Native frame width in pixels.
    pub width: u32,
    /// Native frame height in pixels.
    pub height: u32,
    /// Native frame rate, when the source has one.
    pub fps: Option<f32>,
    /// Total frame count for finite sources.
    pub frame_count: Option<u64>,
    /// Whether the source can loop seamlessly.
    pub loopable: bool,
}

/// One frame pulled from a source.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    /// The decoded or generated image.
    pub frame: Frame,
    /// How long the source spent producing it.
    pub latency_ms: f64,
    /// Set when a finite source has reached its end; the frame carried
    /// alongside is the last valid frame, repeated.
    pub end_of_stream: bool,
}

/// A producer of timestamped RGB frames.
///
/// Callers serialize access; a source is never shared between threads.
pub trait FrameSource: Send {
    /// Open decoders or allocate generator state.
    ///
    /// Idempotent: the playback engine calls it lazily on first play
    /// and may call it again after a `reset`. A failed initialization
    /// leaves the source producing black frames; playback continues.
    fn initialize(&mut self) -> Result<(), String>;

    /// Produce the next frame.
    fn next_frame(&mut self) -> SourceFrame;

    /// Seek to an absolute frame index. Generators ignore seeks.
    fn seek(&mut self, frame_index: u64);

    /// Rewind to the beginning.
    fn reset(&mut self);

    /// Source metadata.
    fn info(&self) -> SourceInfo;
}
