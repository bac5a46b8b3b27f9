//! Core primitives for the lumen LED video server.
//!
//! This crate defines the types every other lumen crate builds on:
//!
//! - [`Frame`]: an owned RGB24 image buffer, the unit of work of the
//!   whole render path.
//! - [`BlendMode`] and [`composite`]: layer compositing arithmetic.
//! - [`Easing`]: progress curves shared by transitions and timelines.
//! - [`ParamDescriptor`] / [`ParamValue`] / [`ParamMap`]: the typed
//!   parameter schema plugins declare and the control surface validates
//!   against.
//! - The plugin traits: [`PixelEffect`], [`Generator`], [`Transition`],
//!   and [`FrameSource`].
//!
//! The crate is deliberately free of I/O, sockets, and threads so that
//! plugin and compositing code stays trivially testable.

mod blend;
mod easing;
mod effect;
mod frame;
mod generator;
mod ids;
mod param;
mod source;
mod transition;

pub use blend::{BlendMode, composite, composite_into};
pub use easing::Easing;
pub use effect::{PixelEffect, RenderContext};
pub use frame::Frame;
pub use generator::Generator;
pub use ids::ClipId;
pub use param::{
    ParamDefault, ParamDescriptor, ParamError, ParamMap, ParamType, ParamValue, default_params,
};
pub use source::{FrameSource, SourceFrame, SourceInfo};
pub use transition::Transition;
