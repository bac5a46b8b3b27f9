//! Built-in plugins for the lumen LED video server.
//!
//! Three plugin families live here:
//!
//! - Pixel effects ([`Brightness`], [`Contrast`], [`Saturation`], ...):
//!   in-place transforms applied along a clip's effect chain.
//! - Generators ([`Solid`], [`Gradient`], [`Plasma`], [`Scan`]):
//!   procedural frame sources.
//! - Transitions ([`Fade`], [`Wipe`], [`Slide`], [`Dissolve`]):
//!   cross-fades between the outgoing and incoming clip.
//!
//! Every plugin declares its parameter schema as a static
//! [`ParamDescriptor`](lumen_core::ParamDescriptor) slice next to its
//! type; `lumen-registry` pairs those schemas with factories.

mod brightness;
mod colorize;
mod contrast;
mod gamma;
mod generators;
mod hue_rotate;
mod invert;
mod mirror;
mod pixelate;
mod saturation;
mod strobe;
mod transitions;

pub use brightness::Brightness;
pub use colorize::Colorize;
pub use contrast::Contrast;
pub use gamma::Gamma;
pub use generators::{Gradient, Plasma, Scan, Solid};
pub use hue_rotate::HueRotate;
pub use invert::Invert;
pub use mirror::Mirror;
pub use pixelate::Pixelate;
pub use saturation::Saturation;
pub use strobe::Strobe;
pub use transitions::{Dissolve, Fade, Slide, Wipe};
