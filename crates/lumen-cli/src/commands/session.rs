//! The `session` command: validate a session file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use lumen_config::SessionSnapshot;
use lumen_engine::PlayerId;

/// Arguments for `lumen session`.
#[derive(Args)]
pub struct SessionArgs {
    /// Session JSON file
    file: PathBuf,
}

pub fn run(args: SessionArgs) -> anyhow::Result<()> {
    let snapshot = SessionSnapshot::load(&args.file)
        .with_context(|| format!("loading {}", args.file.display()))?;
    snapshot.validate().context("session is inconsistent")?;

    println!("clips:  {}", snapshot.clip_count());
    for id in [PlayerId::Video, PlayerId::Artnet] {
        if let Some(player) = snapshot.player(id) {
            println!(
                "{id}: {} clips, index {}, artnet {}",
                player.playlist.len(),
                player.current_index,
                player.enable_artnet
            );
        }
    }
    match snapshot.master() {
        Some(master) => println!("master: {master}"),
        None => println!("master: none"),
    }
    println!("ok");
    Ok(())
}
