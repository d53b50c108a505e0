//! Plays a recording against a second one and pauses whenever too many body parts drift apart.
//!
//! cargo run --example playback --features visualize -- <control.csv> <user.csv> [skeleton.json]

use mocap_align::prelude::*;
use mocap_align::visualize::visualize_alignment;
use std::error::Error;
use tracing_subscriber::EnvFilter;

/// Vicon exports are usually captured at 100 Hz.
const FPS: f64 = 100.0;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(control), Some(user)) = (args.next(), args.next()) else {
        eprintln!("usage: playback <control.csv> <user.csv> [skeleton.json]");
        std::process::exit(2);
    };
    let skeleton = match args.next() {
        Some(path) => SkeletonConfig::from_file(path)?,
        None => SkeletonConfig::plug_in_gait(),
    };

    let control = load_dataset_from_file(&control)?;
    let user = load_dataset_from_file(&user)?;
    visualize_alignment(control, user, skeleton, AlignmentSettings::default(), FPS);
    Ok(())
}
