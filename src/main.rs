//! Terrain streaming toolbox
//!
//! Flies a headless viewer over the endless terrain, writes settings files
//! and renders single-chunk previews.

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use glam::Vec2;
use terrain_gen::render::{
    DrawMode, MapPreview, PreviewOutput, colour_map_from_height_map, default_bands, save_texture,
};
use terrain_gen::{
    DEFAULT_SETTINGS_FILE, Dispatch, TerrainGenerator, TerrainSettings, load_settings,
    save_settings,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file to load instead of the built-in defaults
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Override the noise seed
    #[arg(long, global = true)]
    seed: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Move the viewer in a straight line and report streaming statistics
    Simulate {
        /// Number of ticks to run
        #[arg(long, default_value_t = 600)]
        ticks: u32,

        /// World units travelled per tick
        #[arg(long, default_value_t = 4.0)]
        speed: f32,

        /// Travel direction in degrees, 0 is +X
        #[arg(long, default_value_t = 0.0)]
        heading: f32,

        /// Worker threads; 0 spawns a thread per job
        #[arg(long)]
        workers: Option<usize>,

        /// Log statistics every this many ticks
        #[arg(long, default_value_t = 60)]
        report_every: u32,
    },
    /// Render the origin chunk to an image
    Preview {
        #[arg(long, default_value = "preview.png")]
        output: PathBuf,

        #[arg(long, value_enum, default_value_t = PreviewStyle::Grey)]
        style: PreviewStyle,
    },
    /// Write the effective settings to a file
    Init {
        #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PreviewStyle {
    Grey,
    Colour,
}

fn load(args: &Args) -> io::Result<TerrainSettings> {
    let mut settings = match &args.settings {
        Some(path) => {
            tracing::info!("Loading settings from {}", path.display());
            load_settings(path)?
        }
        None => TerrainSettings::default(),
    };
    if let Some(seed) = args.seed {
        settings.height_map.noise_settings.seed = seed;
    }
    settings.validate();
    Ok(settings)
}

fn simulate(
    mut settings: TerrainSettings,
    ticks: u32,
    speed: f32,
    heading: f32,
    workers: Option<usize>,
    report_every: u32,
) {
    if let Some(workers) = workers {
        settings.dispatch = if workers == 0 {
            Dispatch::ThreadPerJob
        } else {
            Dispatch::Pool(workers)
        };
    }

    let direction = Vec2::from_angle(heading.to_radians());
    let mut generator = TerrainGenerator::new(settings);
    let start = Instant::now();
    let mut viewer = Vec2::ZERO;
    generator.start(viewer);

    for tick in 1..=ticks {
        viewer += direction * speed;
        generator.update(viewer);

        if report_every > 0 && tick % report_every == 0 {
            tracing::info!(
                "Tick {}: viewer ({:.1}, {:.1}), {} chunks, {} visible, {} jobs in flight",
                tick,
                viewer.x,
                viewer.y,
                generator.chunk_count(),
                generator.visible_chunks().len(),
                generator.jobs_in_flight()
            );
        }
    }

    let delivered = generator.settle();
    let changes = generator.drain_visibility_changes();
    tracing::info!(
        "Simulated {} ticks in {:.2?}: {} chunks created, {} visible, {} jobs submitted, {} delivered while settling, {} visibility changes",
        ticks,
        start.elapsed(),
        generator.chunk_count(),
        generator.visible_chunks().len(),
        generator.jobs_submitted(),
        delivered,
        changes.len()
    );
}

fn preview(settings: TerrainSettings, output: PathBuf, style: PreviewStyle) -> io::Result<()> {
    let mut preview = MapPreview::new(settings, DrawMode::NoiseMap);
    let PreviewOutput::Texture(image) = preview.draw_map_in_editor() else {
        return Err(io::Error::other("noise preview produced no texture"));
    };

    match (style, preview.height_map()) {
        (PreviewStyle::Colour, Some(height_map)) => {
            let colour = colour_map_from_height_map(height_map, &default_bands());
            colour
                .save(&output)
                .map_err(|e| io::Error::other(format!("Failed to save {}: {}", output.display(), e)))?;
            tracing::info!("Saved colour preview to {}", output.display());
            Ok(())
        }
        _ => save_texture(&output, &image),
    }
}

fn run(args: Args) -> io::Result<()> {
    let settings = load(&args)?;
    match args.command {
        Command::Simulate {
            ticks,
            speed,
            heading,
            workers,
            report_every,
        } => {
            simulate(settings, ticks, speed, heading, workers, report_every);
            Ok(())
        }
        Command::Preview { output, style } => preview(settings, output, style),
        Command::Init { output } => {
            save_settings(&output, &settings)?;
            tracing::info!("Wrote settings to {}", output.display());
            Ok(())
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::info!("Starting terrain-gen...");
    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
