use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

use hand_tracker::camera::SyntheticSource;
use hand_tracker::config::Config;
use hand_tracker::engine::{StubEngine, TrackingEngine};
use hand_tracker::export::{PipeChannel, PoseExporter};
use hand_tracker::input::{CommandSource, StdinCommands};
use hand_tracker::render::{NullViewer, Viewer};
use hand_tracker::tracker::{ExportStatus, FrameController, StopReason};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    /// Stop after this many frames (overrides app.max_frames).
    #[arg(long)]
    frames: Option<u64>,
    /// Never open the debug window; read s/p/q commands from stdin.
    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!("=== Hand Tracker ({}) ===", env!("GIT_VERSION"));

    let mut config = Config::load_or_default(&args.config);
    if let Some(frames) = args.frames {
        config.app.max_frames = Some(frames);
    }
    config.validate()?;

    let engine = StubEngine::new(config.engine_settings());
    let budget = engine.settings().budget;
    info!(
        "engine: {} ({} particles x {} generations)",
        engine.name(),
        budget.particles,
        budget.generations
    );
    info!("variances: {:?}", engine.settings().variances);
    info!(
        "camera: {:?} {}x{}, padding {}",
        config.camera.resolution, config.camera.width, config.camera.height, config.tracking.padding
    );
    info!("commands: s = start/reset, p = pause, q = quit");

    #[cfg(feature = "desktop")]
    if config.debug.view && !args.headless {
        use hand_tracker::input::CommandSlot;
        use hand_tracker::render::MinifbRenderer;

        let commands = CommandSlot::new();
        let renderer = MinifbRenderer::new(
            "hand_tracker",
            config.camera.width as usize,
            config.camera.height as usize,
            commands.clone(),
        )?;
        return run(&config, engine, renderer, commands);
    }

    run(&config, engine, NullViewer, StdinCommands::spawn())
}

fn run<V: Viewer, C: CommandSource>(
    config: &Config,
    engine: StubEngine,
    viewer: V,
    commands: C,
) -> Result<()> {
    let source = SyntheticSource::new(
        config.camera.resolution,
        &config.intrinsics(),
        config.camera.width,
        config.camera.height,
        config.app.max_frames,
    )?;

    let exporter = if config.export.enabled {
        let channel = PipeChannel::open(&config.export.path, true)
            .with_context(|| format!("failed to open {}", config.export.path.display()))?;
        if !channel.is_seekable() {
            warn!("export channel is not seekable; origin is tracked logically");
        }
        info!("export: {}", config.export.path.display());
        Some(PoseExporter::new(channel)?)
    } else {
        info!("export: disabled");
        None
    };

    let mut controller =
        FrameController::new(source, engine, viewer, commands, exporter, config.loop_settings()?);
    let summary = controller.run()?;

    if let StopReason::AcquisitionFailed(msg) = &summary.reason {
        warn!("stopped on acquisition failure: {}", msg);
    }
    if summary.export_status == ExportStatus::Failed {
        warn!("export stopped during the run");
    }
    info!(
        "{} frames tracked, {} points exported",
        summary.frames, summary.exported
    );
    info!("Shutting down...");
    Ok(())
}
