//! Art-Net output stage for the lumen LED video server.
//!
//! The pipeline per frame: sample the composited image at the point
//! set's coordinates, convert to the configured bit depth, consult the
//! [`DeltaEncoder`] for which universes actually need to go out, and
//! ship Art-Net DMX packets over UDP. The delta baseline is committed
//! only after every packet of a frame sends successfully, so a dropped
//! packet is re-sent with the next frame instead of being lost to the
//! baseline.

mod delta;
mod output;
mod packet;
mod points;

pub use delta::{BitDepth, DeltaConfig, DeltaEncoder};
pub use output::{ArtNetError, ArtNetOutput, SendSummary};
pub use packet::{ArtDmx, DMX_CHANNELS_PER_UNIVERSE, encode_dmx};
pub use points::{Point, PointSet, PointSetError, UniversePlan, UniverseSlice};
