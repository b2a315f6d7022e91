use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use turntable_preview::{MAX_FEATURED_OBJECTS, SoftwareHost, TurntableBuilder, UpAxis};

const USAGE: &str =
    "Usage: turntable_preview [OPTIONS] -- <scene_file> <output_dir> <frame_count> <resolution>";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Axis {
    Y,
    Z,
}

impl From<Axis> for UpAxis {
    fn from(value: Axis) -> Self {
        match value {
            Axis::Y => UpAxis::Y,
            Axis::Z => UpAxis::Z,
        }
    }
}

/// Renders turntable preview frames of a scene's largest objects.
///
/// Positional arguments go after `--`.
#[derive(Parser, Debug)]
#[command(name = "turntable_preview", override_usage = USAGE)]
struct Cli {
    /// How many of the largest objects get their own turn
    #[arg(long, default_value_t = MAX_FEATURED_OBJECTS)]
    max_featured: usize,

    /// Up axis of the scene file
    #[arg(long, value_enum, default_value_t = Axis::Y)]
    up_axis: Axis,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = std::env::args().collect::<Vec<_>>();
    let Some(separator) = args.iter().position(|a| a == "--") else {
        println!("{}", USAGE);
        std::process::exit(1);
    };
    let cli = Cli::parse_from(&args[..separator]);
    let positional = &args[separator + 1..];
    if positional.len() < 4 {
        println!("{}", USAGE);
        std::process::exit(1);
    }

    let scene_file = PathBuf::from(&positional[0]);
    let output_dir = PathBuf::from(&positional[1]);
    let frame_count: usize = positional[2].parse()?;
    let resolution: u32 = positional[3].parse()?;

    let mut host = SoftwareHost::new().with_up_axis(cli.up_axis.into());
    let turntable = TurntableBuilder::new(output_dir)
        .with_frame_count(frame_count)
        .with_resolution(resolution)
        .with_max_featured(cli.max_featured)
        .build();

    let summary = turntable.render_file(&mut host, &scene_file)?;
    let failed = summary.failed().count();
    if failed > 0 {
        log::warn!("{} of {} frames failed to render", failed, summary.attempted());
    }
    Ok(())
}
