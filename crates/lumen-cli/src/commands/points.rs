//! The `points` command: inspect a point-set file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use lumen_artnet::PointSet;

/// Arguments for `lumen points`.
#[derive(Args)]
pub struct PointsArgs {
    /// Point-set JSON file
    file: PathBuf,

    /// Channel depth to plan universes for: 8 or 16 bits
    #[arg(long, default_value_t = 8)]
    bit_depth: u8,
}

pub fn run(args: PointsArgs) -> anyhow::Result<()> {
    let set = PointSet::load(&args.file)
        .with_context(|| format!("loading {}", args.file.display()))?;
    let (w, h) = set.canvas();
    println!("canvas:    {w}x{h}");
    println!("points:    {}", set.len());

    let bytes_per_point = if args.bit_depth == 16 { 6 } else { 3 };
    let plan = set.plan(bytes_per_point);
    println!("universes: {}", plan.slices.len());
    for slice in &plan.slices {
        println!(
            "  universe {:<4} points {:<4} channels {}",
            slice.universe,
            slice.count,
            slice.count * bytes_per_point
        );
    }
    Ok(())
}
