//! UDP output stage.
//!
//! Bound to the Art-Net player only. Per frame: sample the composited
//! image at the point set, widen to the configured bit depth, ask the
//! delta encoder which universes to send, and transmit one OpDmx packet
//! per dirty universe. The encoder baseline commits only when every
//! packet went out.

use std::net::{SocketAddr, UdpSocket};

use thiserror::Error;

use lumen_core::Frame;

use crate::delta::{BitDepth, DeltaConfig, DeltaEncoder};
use crate::packet::encode_dmx;
use crate::points::{PointSet, UniversePlan};

/// Errors from the output stage.
#[derive(Debug, Error)]
pub enum ArtNetError {
    /// Socket creation failed.
    #[error("failed to bind UDP socket: {0}")]
    Bind(#[source] std::io::Error),

    /// A packet could not be sent; the frame was dropped.
    #[error("failed to send universe {universe}: {source}")]
    Send {
        /// Universe whose packet failed.
        universe: u16,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// What one frame's transmission amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendSummary {
    /// Universes actually transmitted.
    pub universes_sent: usize,
    /// Whether this was a full-frame sync.
    pub full_frame: bool,
}

/// Samples frames at the point set and ships Art-Net DMX over UDP.
pub struct ArtNetOutput {
    socket: UdpSocket,
    target: SocketAddr,
    point_set: PointSet,
    plan: UniversePlan,
    encoder: DeltaEncoder,
    sequence: u8,
}

impl ArtNetOutput {
    /// Bind a socket and prepare the universe plan.
    pub fn new(
        target: SocketAddr,
        point_set: PointSet,
        config: DeltaConfig,
    ) -> Result<Self, ArtNetError> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(ArtNetError::Bind)?;
        let plan = point_set.plan(config.bit_depth.bytes_per_point());
        tracing::info!(
            %target,
            points = point_set.len(),
            universes = plan.slices.len(),
            ?config.bit_depth,
            "artnet output ready"
        );
        Ok(Self {
            socket,
            target,
            point_set,
            plan,
            encoder: DeltaEncoder::new(config),
            sequence: 0,
        })
    }

    /// Current delta settings.
    pub fn delta_config(&self) -> DeltaConfig {
        self.encoder.config()
    }

    /// Live-reconfigure the delta encoder.
    pub fn reconfigure_delta(&mut self, config: DeltaConfig) {
        if config.bit_depth != self.encoder.config().bit_depth {
            self.plan = self.point_set.plan(config.bit_depth.bytes_per_point());
        }
        self.encoder.reconfigure(config);
        tracing::info!(?config, "delta encoding reconfigured");
    }

    /// Sample the frame into the flat channel array.
    ///
    /// Point coordinates are in canvas space; frames of a different
    /// size are sampled through a proportional coordinate scale.
    /// Nearest-neighbor, out-of-canvas points read black.
    fn sample(&self, frame: &Frame) -> Vec<u8> {
        let (canvas_w, canvas_h) = self.point_set.canvas();
        let (frame_w, frame_h) = frame.dimensions();
        let scale_x = frame_w as f32 / canvas_w.max(1) as f32;
        let scale_y = frame_h as f32 / canvas_h.max(1) as f32;
        let depth = self.encoder.config().bit_depth;

        let points = self.point_set.flat_points();
        let mut channels = Vec::with_capacity(points.len() * depth.bytes_per_point());
        for point in points {
            let x = (point.x * scale_x).floor() as u32;
            let y = (point.y * scale_y).floor() as u32;
            let rgb = frame.pixel(x, y);
            match depth {
                BitDepth::Eight => channels.extend_from_slice(&rgb),
                BitDepth::Sixteen => {
                    for c in rgb {
                        // Widen 8-bit to 16-bit full scale (0xFF -> 0xFFFF).
                        channels.extend_from_slice(&(u16::from(c) * 257).to_be_bytes());
                    }
                }
            }
        }
        channels
    }

    /// Transmit one frame.
    ///
    /// On a send error the frame is dropped and the delta baseline is
    /// left untouched, so the next successful frame carries the missed
    /// changes.
    pub fn send_frame(&mut self, frame: &Frame) -> Result<SendSummary, ArtNetError> {
        let channels = self.sample(frame);
        let decision = self.encoder.decide(&channels, &self.plan);

        for &index in &decision.slice_indices {
            let slice = self.plan.slices[index];
            let data = &channels[self.plan.byte_range(&slice)];
            self.sequence = if self.sequence == u8::MAX {
                1
            } else {
                self.sequence + 1
            };
            let packet = encode_dmx(slice.universe, self.sequence, data);
            self.socket
                .send_to(&packet, self.target)
                .map_err(|source| {
                    tracing::error!(
                        universe = slice.universe,
                        error = %source,
                        "artnet send failed, frame dropped"
                    );
                    ArtNetError::Send {
                        universe: slice.universe,
                        source,
                    }
                })?;
        }

        self.encoder.commit(&channels);
        Ok(SendSummary {
            universes_sent: decision.slice_indices.len(),
            full_frame: decision.full_frame,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::ArtDmx;
    use crate::points::{Point, PointGroup};
    use std::time::Duration;

    fn receiver() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    fn two_point_set() -> PointSet {
        PointSet::new(
            2,
            1,
            vec![PointGroup {
                universe: None,
                points: vec![
                    Point {
                        id: 1,
                        x: 0.0,
                        y: 0.0,
                    },
                    Point {
                        id: 2,
                        x: 1.0,
                        y: 0.0,
                    },
                ],
            }],
        )
    }

    fn recv_packet(socket: &UdpSocket) -> Option<ArtDmx> {
        let mut buf = [0u8; 1024];
        match socket.recv_from(&mut buf) {
            Ok((len, _)) => ArtDmx::decode(&buf[..len]),
            Err(_) => None,
        }
    }

    #[test]
    fn first_frame_carries_point_samples() {
        let (rx, addr) = receiver();
        let mut output = ArtNetOutput::new(addr, two_point_set(), DeltaConfig::default()).unwrap();

        let frame = Frame::from_fn(2, 1, |x, _| if x == 0 { [255, 0, 0] } else { [0, 255, 0] });
        let summary = output.send_frame(&frame).unwrap();
        assert_eq!(summary.universes_sent, 1);
        assert!(summary.full_frame);

        let packet = recv_packet(&rx).unwrap();
        assert_eq!(packet.universe, 0);
        assert_eq!(packet.data, vec![255, 0, 0, 0, 255, 0]);
    }

    #[test]
    fn static_frames_transmit_nothing() {
        let (rx, addr) = receiver();
        let mut output = ArtNetOutput::new(addr, two_point_set(), DeltaConfig::default()).unwrap();

        let frame = Frame::solid(2, 1, [100, 100, 100]);
        output.send_frame(&frame).unwrap();
        assert!(recv_packet(&rx).is_some());

        for _ in 0..5 {
            let summary = output.send_frame(&frame).unwrap();
            assert_eq!(summary.universes_sent, 0);
        }
        assert!(recv_packet(&rx).is_none());
    }

    #[test]
    fn sixteen_bit_doubles_channel_bytes() {
        let (rx, addr) = receiver();
        let config = DeltaConfig::for_depth(BitDepth::Sixteen);
        let mut output = ArtNetOutput::new(addr, two_point_set(), config).unwrap();

        let frame = Frame::solid(2, 1, [255, 0, 0]);
        output.send_frame(&frame).unwrap();
        let packet = recv_packet(&rx).unwrap();
        assert_eq!(packet.data.len(), 12);
        assert_eq!(&packet.data[..2], &[0xFF, 0xFF]);
        assert_eq!(&packet.data[2..4], &[0x00, 0x00]);
    }

    #[test]
    fn sequence_increments_per_packet() {
        let (rx, addr) = receiver();
        let mut output = ArtNetOutput::new(addr, two_point_set(), DeltaConfig::default()).unwrap();

        output.send_frame(&Frame::solid(2, 1, [10, 10, 10])).unwrap();
        output
            .send_frame(&Frame::solid(2, 1, [200, 200, 200]))
            .unwrap();

        let first = recv_packet(&rx).unwrap();
        let second = recv_packet(&rx).unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
    }

    #[test]
    fn reconfigure_updates_plan_for_depth() {
        let (_rx, addr) = receiver();
        let mut output = ArtNetOutput::new(addr, two_point_set(), DeltaConfig::default()).unwrap();
        output.reconfigure_delta(DeltaConfig::for_depth(BitDepth::Sixteen));
        assert_eq!(output.plan.bytes_per_point, 6);
    }
}
