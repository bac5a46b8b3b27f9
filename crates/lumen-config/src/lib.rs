//! Session persistence for the lumen LED video server.
//!
//! One JSON document per project captures both players (playlist,
//! index, Art-Net flag), every registered clip with its effect chains,
//! sequences, layers, and transition overrides, and the master
//! selection. Loading restores the clip registry and playlists and
//! leaves both players paused at index 0; sequences are wired into the
//! modulation engine when each clip first activates.

mod error;
mod session;

pub use error::ConfigError;
pub use session::{PlayerSnapshot, SessionSnapshot};
