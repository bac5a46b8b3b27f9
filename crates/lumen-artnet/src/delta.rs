//! Delta-encoded transmission decisions.
//!
//! Typical LED content is static or slow. Comparing each frame's flat
//! channel array against the last transmitted baseline and skipping
//! universes whose points moved less than a threshold cuts most
//! packets; a forced full-frame sync every N frames bounds how long a
//! receiver that lost a packet can stay stale.
//!
//! The baseline advances only through [`DeltaEncoder::commit`], which
//! the output stage calls after every packet of the frame went out.

use serde::{Deserialize, Serialize};

use crate::points::UniversePlan;

/// Fraction of changed points above which a full frame is cheaper.
const FULL_FRAME_RATIO: f64 = 0.8;

/// Output channel width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitDepth {
    /// 3 bytes per RGB point.
    #[default]
    Eight,
    /// 6 bytes per RGB point, big-endian channels.
    Sixteen,
}

impl BitDepth {
    /// Bytes per RGB point at this depth.
    pub fn bytes_per_point(self) -> usize {
        match self {
            BitDepth::Eight => 3,
            BitDepth::Sixteen => 6,
        }
    }

    /// Default change threshold in channel units.
    pub fn default_threshold(self) -> u32 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 2048,
        }
    }
}

/// Delta encoder settings. Reconfigurable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaConfig {
    /// Per-channel change threshold; a point counts as changed when any
    /// of its channels moved by more than this.
    pub threshold: u32,
    /// Every Nth frame transmits all universes regardless of changes.
    pub full_frame_interval: u64,
    /// Channel width.
    pub bit_depth: BitDepth,
    /// When false, every frame is a full frame.
    pub enabled: bool,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self::for_depth(BitDepth::Eight)
    }
}

impl DeltaConfig {
    /// Defaults for a bit depth: threshold 8 (8-bit) or 2048 (16-bit),
    /// sync every 30 frames, enabled.
    pub fn for_depth(bit_depth: BitDepth) -> Self {
        Self {
            threshold: bit_depth.default_threshold(),
            full_frame_interval: 30,
            bit_depth,
            enabled: true,
        }
    }
}

/// What to transmit for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Indices into the plan's slices that must be sent.
    pub slice_indices: Vec<usize>,
    /// Whether this is a full-frame sync.
    pub full_frame: bool,
}

/// Tracks the last transmitted channel array and decides per frame
/// which universes to send.
#[derive(Debug, Clone)]
pub struct DeltaEncoder {
    config: DeltaConfig,
    last_sent: Option<Vec<u8>>,
    /// 1-based number of the next frame to transmit.
    frame_counter: u64,
}

impl DeltaEncoder {
    /// Create an encoder with the given settings.
    pub fn new(config: DeltaConfig) -> Self {
        Self {
            config,
            last_sent: None,
            frame_counter: 1,
        }
    }

    /// Current settings.
    pub fn config(&self) -> DeltaConfig {
        self.config
    }

    /// Replace the settings.
    ///
    /// Changing bit depth invalidates the baseline: the next frame is a
    /// full frame.
    pub fn reconfigure(&mut self, config: DeltaConfig) {
        if config.bit_depth != self.config.bit_depth {
            self.last_sent = None;
        }
        self.config = config;
    }

    /// Decide which universes of `channels` need to be transmitted.
    ///
    /// `channels` is the flat point array at the configured bit depth.
    pub fn decide(&self, channels: &[u8], plan: &UniversePlan) -> Decision {
        let all = || Decision {
            slice_indices: (0..plan.slices.len()).collect(),
            full_frame: true,
        };

        if !self.config.enabled {
            return all();
        }
        if self.config.full_frame_interval > 0
            && self.frame_counter % self.config.full_frame_interval == 0
        {
            return all();
        }
        let Some(last) = &self.last_sent else {
            return all();
        };
        if last.len() != channels.len() {
            return all();
        }

        let bpp = self.config.bit_depth.bytes_per_point();
        let total_points = channels.len() / bpp.max(1);
        let changed_points = (0..total_points)
            .filter(|&p| self.point_changed(channels, last, p))
            .count();

        if total_points > 0 && changed_points as f64 / total_points as f64 >= FULL_FRAME_RATIO {
            return all();
        }

        let slice_indices = plan
            .slices
            .iter()
            .enumerate()
            .filter(|(_, slice)| {
                (slice.start..slice.start + slice.count)
                    .any(|p| self.point_changed(channels, last, p))
            })
            .map(|(i, _)| i)
            .collect();

        Decision {
            slice_indices,
            full_frame: false,
        }
    }

    /// Whether any channel of point `p` moved by more than the threshold.
    fn point_changed(&self, new: &[u8], last: &[u8], p: usize) -> bool {
        let bpp = self.config.bit_depth.bytes_per_point();
        let offset = p * bpp;
        match self.config.bit_depth {
            BitDepth::Eight => (0..3).any(|c| {
                let delta =
                    i32::from(new[offset + c]).abs_diff(i32::from(last[offset + c]));
                delta > self.config.threshold
            }),
            BitDepth::Sixteen => (0..3).any(|c| {
                let i = offset + c * 2;
                let n = u16::from_be_bytes([new[i], new[i + 1]]);
                let l = u16::from_be_bytes([last[i], last[i + 1]]);
                u32::from(n.abs_diff(l)) > self.config.threshold
            }),
        }
    }

    /// Record a successfully transmitted frame as the new baseline.
    ///
    /// Not called when a send fails, so the next successful frame
    /// re-transmits whatever the receiver missed.
    pub fn commit(&mut self, channels: &[u8]) {
        self.last_sent = Some(channels.to_vec());
        self.frame_counter += 1;
    }

    /// 1-based number of the next frame to transmit.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::{PointGroup, PointSet};

    fn two_point_plan() -> UniversePlan {
        let set = PointSet::new(
            10,
            10,
            vec![PointGroup {
                universe: None,
                points: (0..2)
                    .map(|i| crate::Point {
                        id: i,
                        x: i as f32,
                        y: 0.0,
                    })
                    .collect(),
            }],
        );
        set.plan(3)
    }

    fn encoder() -> DeltaEncoder {
        DeltaEncoder::new(DeltaConfig::default())
    }

    #[test]
    fn first_frame_is_full() {
        let plan = two_point_plan();
        let enc = encoder();
        let decision = enc.decide(&[100; 6], &plan);
        assert!(decision.full_frame);
        assert_eq!(decision.slice_indices, vec![0]);
    }

    #[test]
    fn static_scene_goes_silent_until_sync() {
        // Frames 1..30 of an unchanging scene: frame 1 full, 2..=29
        // nothing, frame 30 full sync.
        let plan = two_point_plan();
        let mut enc = encoder();
        let channels = [100u8; 6];

        let first = enc.decide(&channels, &plan);
        assert!(first.full_frame);
        enc.commit(&channels);

        for frame in 2..30 {
            let d = enc.decide(&channels, &plan);
            assert!(
                d.slice_indices.is_empty(),
                "frame {frame} should be silent"
            );
            enc.commit(&channels);
        }

        let sync = enc.decide(&channels, &plan);
        assert!(sync.full_frame, "frame 30 is a forced sync");
        assert_eq!(sync.slice_indices, vec![0]);
    }

    #[test]
    fn sub_threshold_change_is_silent() {
        let plan = two_point_plan();
        let mut enc = encoder();
        enc.commit(&[100; 6]);

        // Delta of 3 on one channel, below the threshold of 8.
        let nudged = [103, 100, 100, 100, 100, 100];
        let d = enc.decide(&nudged, &plan);
        assert!(d.slice_indices.is_empty());
    }

    #[test]
    fn above_threshold_change_sends_one_universe() {
        let plan = two_point_plan();
        let mut enc = encoder();
        enc.commit(&[100; 6]);

        let changed = [120, 100, 100, 100, 100, 100];
        let d = enc.decide(&changed, &plan);
        assert_eq!(d.slice_indices, vec![0]);
        assert!(!d.full_frame);
    }

    #[test]
    fn uncommitted_change_is_resent() {
        // A failed send skips commit; the same delta shows up again.
        let plan = two_point_plan();
        let mut enc = encoder();
        enc.commit(&[100; 6]);

        let changed = [200, 100, 100, 100, 100, 100];
        assert_eq!(enc.decide(&changed, &plan).slice_indices, vec![0]);
        // No commit (send failed). Same decision next frame.
        assert_eq!(enc.decide(&changed, &plan).slice_indices, vec![0]);
    }

    #[test]
    fn mostly_changed_frame_goes_full() {
        let plan = two_point_plan();
        let mut enc = encoder();
        enc.commit(&[0; 6]);
        let d = enc.decide(&[255; 6], &plan);
        assert!(d.full_frame);
    }

    #[test]
    fn disabled_delta_always_full() {
        let plan = two_point_plan();
        let mut enc = DeltaEncoder::new(DeltaConfig {
            enabled: false,
            ..DeltaConfig::default()
        });
        enc.commit(&[100; 6]);
        assert!(enc.decide(&[100; 6], &plan).full_frame);
    }

    #[test]
    fn sixteen_bit_threshold_compares_words() {
        let mut enc = DeltaEncoder::new(DeltaConfig::for_depth(BitDepth::Sixteen));
        let set = PointSet::new(
            10,
            10,
            vec![PointGroup {
                universe: None,
                points: vec![crate::Point {
                    id: 0,
                    x: 0.0,
                    y: 0.0,
                }],
            }],
        );
        let plan = set.plan(6);

        let base = 0x4000u16.to_be_bytes();
        let baseline = [base[0], base[1], base[0], base[1], base[0], base[1]];
        enc.commit(&baseline);

        // 0x4000 -> 0x4500 is a delta of 0x500 (1280), under 2048.
        let small = 0x4500u16.to_be_bytes();
        let nudged = [small[0], small[1], base[0], base[1], base[0], base[1]];
        assert!(enc.decide(&nudged, &plan).slice_indices.is_empty());

        // 0x4000 -> 0x5000 is a delta of 0x1000 (4096), over 2048.
        let big = 0x5000u16.to_be_bytes();
        let moved = [big[0], big[1], base[0], base[1], base[0], base[1]];
        assert_eq!(enc.decide(&moved, &plan).slice_indices, vec![0]);
    }

    #[test]
    fn depth_change_invalidates_baseline() {
        let plan = two_point_plan();
        let mut enc = encoder();
        enc.commit(&[100; 6]);
        enc.reconfigure(DeltaConfig::for_depth(BitDepth::Sixteen));
        assert!(enc.decide(&[100; 12], &plan).full_frame);
    }
}
