use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use figura_io::{AssetSource, FetchingSource, FileFetcher};
use figura_view::viewer::overlay::OverlayCollector;
use figura_view::{
    HeadlessBackend, RenderBackend, SoftwareBackend, ViewerCommand, ViewerConfig, ViewerEngine,
    ViewerEvent,
};

use crate::cli::{HeadlessCommand, RunArgs};

/// Real time granted to background fetches between frames while a load is outstanding.
const LOAD_POLL: Duration = Duration::from_millis(10);

pub fn run_headless(command: HeadlessCommand, config: Option<PathBuf>) -> Result<()> {
    match command {
        HeadlessCommand::Run(args) => run(args, load_config(config)?),
    }
}

pub(crate) fn load_config(path: Option<PathBuf>) -> Result<ViewerConfig> {
    let mut config = match path {
        Some(path) => ViewerConfig::load(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    config.apply_env().context("invalid FIGURA_* override")?;
    Ok(config)
}

pub(crate) fn asset_source() -> Box<dyn AssetSource> {
    #[cfg(feature = "http")]
    let source = FetchingSource::new(figura_io::HttpFetcher::new(FileFetcher::new()));
    #[cfg(not(feature = "http"))]
    let source = FetchingSource::new(FileFetcher::new());
    Box::new(source)
}

fn run(args: RunArgs, config: ViewerConfig) -> Result<()> {
    let headless = HeadlessBackend::new();
    let backend: Box<dyn RenderBackend> = if args.software {
        Box::new(SoftwareBackend::new())
    } else {
        Box::new(headless.clone())
    };
    let mut engine = ViewerEngine::initialize(config, asset_source(), backend, args.width, args.height)?;

    engine.dispatch(ViewerCommand::LoadModel(args.model.clone()))?;
    if let Some(url) = args.animation {
        engine.dispatch(ViewerCommand::LoadAnimation(url))?;
    }
    if let Some(url) = args.environment {
        engine.dispatch(ViewerCommand::SetEnvironment(url))?;
    }
    if args.wireframe {
        engine.dispatch(ViewerCommand::ToggleWireframe)?;
    }
    if args.skeleton {
        engine.dispatch(ViewerCommand::ToggleSkeleton)?;
    }
    if args.ruler {
        engine.dispatch(ViewerCommand::ToggleRuler)?;
    }

    let mut failed = false;
    while engine.is_loading() {
        std::thread::sleep(LOAD_POLL);
        engine.frame(LOAD_POLL.as_secs_f32())?;
        failed |= report(engine.drain_events())?;
    }
    for _ in 0..args.frames {
        engine.frame(args.dt)?;
        failed |= report(engine.drain_events())?;
    }

    let camera = engine.camera();
    println!(
        "camera: distance {:.3} (bounds {:.3}..{:.3}), target {:?}",
        camera.distance(),
        camera.distance_bounds().0,
        camera.distance_bounds().1,
        camera.target()
    );
    if let Some(player) = engine.player() {
        println!(
            "animation: {} at {:.2}s of {:.2}s",
            player.clip().name,
            player.local_time(),
            player.clip().duration
        );
    }
    if args.software {
        let mut shapes = OverlayCollector::default();
        engine.paint(&mut shapes);
        println!("frame: {} shapes", shapes.shapes.len());
    } else {
        let stats = headless.stats();
        println!(
            "frames: {} ({} meshes drawn, {} live meshes, {} live textures)",
            stats.frames,
            stats.last_draw_count,
            stats.live_meshes.len(),
            stats.live_textures.len()
        );
    }

    engine.teardown();
    if !args.software {
        let stats = headless.stats();
        if !stats.live_meshes.is_empty() || stats.double_releases > 0 {
            bail!(
                "teardown leaked {} meshes with {} double releases",
                stats.live_meshes.len(),
                stats.double_releases
            );
        }
    }
    if failed {
        bail!("viewer reported a failure");
    }
    Ok(())
}

/// Prints events; returns true when one of them is a failure.
fn report(events: Vec<ViewerEvent>) -> Result<bool> {
    let mut failed = false;
    for event in events {
        match event {
            ViewerEvent::ModelLoaded(metadata) => {
                println!("model: {}", serde_json::to_string(&metadata)?);
            }
            ViewerEvent::AnimationStarted {
                name,
                duration,
                dropped,
            } => {
                println!("animation started: {name} ({duration:.2}s)");
                if !dropped.is_empty() {
                    println!("  unbound joints: {}", dropped.join(", "));
                }
            }
            ViewerEvent::LoadFailed(err) | ViewerEvent::AnimationFailed(err) => {
                eprintln!("error: {err}");
                failed = true;
            }
            ViewerEvent::LoadingChanged(_) | ViewerEvent::ContextLost | ViewerEvent::ContextRestored => {}
        }
    }
    Ok(failed)
}
