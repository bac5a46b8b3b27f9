//! CLI subcommands.

pub mod effects;
pub mod points;
pub mod serve;
pub mod session;
