use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use figura_anim::retarget;
use figura_io::procedural::{self, MANNEQUIN_URL, REFERENCE_ANIMATION_URL};
use figura_io::{
    AnimationAsset, FetchingSource, Fetcher, FileFetcher, ModelAsset, normalize, parse_animation,
    parse_model,
};
use figura_scene::SceneGraph;
use figura_scene::math::translation_of;
use figura_view::viewer::camera::{direction_from_angles, frame};
use figura_view::viewer::model::LoadedModel;
use figura_view::{HeadlessBackend, ViewerConfig, ViewerEngine, ViewerEvent};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "figura")]
#[command(about = "Figura avatar toolkit CLI")]
struct Cli {
    /// JSON viewer config; FIGURA_* variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prints model metadata as JSON.
    Inspect(InspectArgs),
    /// Binds an animation to a model and reports which joints map.
    Retarget(RetargetArgs),
    /// Prints where the viewer camera would frame a model.
    Frame(FrameArgs),
    /// Runs the headless viewer on the procedural mannequin.
    Demo(DemoArgs),
}

#[derive(Args)]
struct InspectArgs {
    model: String,
    #[arg(long)]
    compact: bool,
}

#[derive(Args)]
struct RetargetArgs {
    model: String,
    #[arg(default_value = REFERENCE_ANIMATION_URL)]
    animation: String,
    #[arg(long, default_value_t = 0)]
    clip: usize,
}

#[derive(Args)]
struct FrameArgs {
    model: String,
}

#[derive(Args)]
struct DemoArgs {
    #[arg(long, default_value_t = 1.7)]
    height: f32,
    #[arg(long, default_value_t = 180)]
    frames: usize,
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect(args) => inspect(args),
        Command::Retarget(args) => retarget_clip(args),
        Command::Frame(args) => frame_model(args, load_config(cli.config)?),
        Command::Demo(args) => demo(args, load_config(cli.config)?),
    }
}

fn inspect(args: InspectArgs) -> Result<()> {
    let asset = read_model(&args.model)?;
    let normalized = normalize(&asset.rest_points(), asset.facing());
    let metadata = asset.metadata(normalized.height);
    info!(
        url = %args.model,
        bones = asset.humanoid.len(),
        nodes = asset.nodes.len(),
        "model parsed"
    );
    let json = if args.compact {
        serde_json::to_string(&metadata)?
    } else {
        serde_json::to_string_pretty(&metadata)?
    };
    println!("{json}");
    Ok(())
}

fn retarget_clip(args: RetargetArgs) -> Result<()> {
    let asset = read_model(&args.model)?;
    let animation = read_animation(&args.animation)?;
    let mut graph = SceneGraph::new();
    let scene = graph.root();
    let model = LoadedModel::instantiate(&mut graph, scene, &asset)
        .context("failed to build the model scene")?;
    let clip = retarget(&animation.animation, args.clip, &model.rig)
        .with_context(|| format!("cannot bind {} to {}", args.animation, args.model))?;

    println!("clip: {} ({:.3} s)", clip.name, clip.duration);
    let mapped: Vec<String> = clip
        .rotations
        .iter()
        .map(|track| track.bone.to_string())
        .collect();
    println!("mapped ({}): {}", mapped.len(), mapped.join(", "));
    if clip.hips_translation.is_some() {
        println!("hips translation scaled by {:.4}", clip.position_scale);
    }
    if !clip.dropped.is_empty() {
        println!("skipped ({}): {}", clip.dropped.len(), clip.dropped.join(", "));
    }
    Ok(())
}

fn frame_model(args: FrameArgs, config: ViewerConfig) -> Result<()> {
    let asset = read_model(&args.model)?;
    let mut graph = SceneGraph::new();
    let scene = graph.root();
    let model = LoadedModel::instantiate(&mut graph, scene, &asset)
        .context("failed to build the model scene")?;
    let framed = frame(&model.bounds, &config);
    let direction = direction_from_angles(
        config.first_azimuth_deg.to_radians(),
        config.first_elevation_deg.to_radians(),
    );
    let eye = framed.target + direction * framed.distance;

    println!("height: {:.3} m", model.height);
    println!(
        "target: ({:.3}, {:.3}, {:.3})",
        framed.target.x, framed.target.y, framed.target.z
    );
    println!("eye: ({:.3}, {:.3}, {:.3})", eye.x, eye.y, eye.z);
    println!(
        "distance: {:.3} (limits {:.3}..{:.3})",
        framed.distance, framed.min_distance, framed.max_distance
    );
    if let Some(hips) = model
        .joints
        .get(&figura_base::HumanBone::Hips)
        .and_then(|id| graph.world_matrix(*id))
    {
        let hips = translation_of(&hips);
        println!("hips: ({:.3}, {:.3}, {:.3})", hips.x, hips.y, hips.z);
    }
    Ok(())
}

fn demo(args: DemoArgs, config: ViewerConfig) -> Result<()> {
    let backend = HeadlessBackend::new();
    let mut engine = ViewerEngine::initialize(
        config,
        Box::new(FetchingSource::new(FileFetcher::new())),
        Box::new(backend.clone()),
        960,
        640,
    )?;
    engine.load_model(&format!("{MANNEQUIN_URL}?height={}", args.height));
    engine.load_animation(REFERENCE_ANIMATION_URL);
    engine.toggle_skeleton()?;

    let poll = Duration::from_millis(5);
    while engine.is_loading() {
        std::thread::sleep(poll);
        engine.frame(poll.as_secs_f32())?;
    }
    let mut failures = 0;
    for event in engine.drain_events() {
        match event {
            ViewerEvent::ModelLoaded(metadata) => {
                println!(
                    "loaded {} ({} triangles, {:.2} m)",
                    metadata.url, metadata.triangle_count, metadata.height
                );
            }
            ViewerEvent::AnimationStarted { name, duration, .. } => {
                println!("playing {name} ({duration:.2} s)");
            }
            ViewerEvent::LoadFailed(err) | ViewerEvent::AnimationFailed(err) => {
                warn!(%err, "demo load failed");
                failures += 1;
            }
            _ => {}
        }
    }
    for _ in 0..args.frames {
        engine.frame(args.dt)?;
    }

    let camera = engine.camera();
    println!(
        "camera distance {:.3}, elapsed {:.2} s, {} frames drawn",
        camera.distance(),
        engine.elapsed(),
        backend.stats().frames
    );
    engine.teardown();
    let stats = backend.stats();
    info!(
        uploads = stats.mesh_uploads,
        releases = stats.mesh_releases,
        "demo finished"
    );
    if failures > 0 {
        bail!("{failures} load(s) failed");
    }
    if !stats.live_meshes.is_empty() || stats.double_releases > 0 {
        bail!("GPU bookkeeping is off after teardown");
    }
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<ViewerConfig> {
    let mut config = match path {
        Some(path) => ViewerConfig::load(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    config.apply_env().context("invalid FIGURA_* override")?;
    Ok(config)
}

fn fetcher() -> Box<dyn Fetcher> {
    #[cfg(feature = "http")]
    let fetcher = Box::new(figura_io::HttpFetcher::new(FileFetcher::new()));
    #[cfg(not(feature = "http"))]
    let fetcher = Box::new(FileFetcher::new());
    fetcher
}

fn read_model(url: &str) -> Result<ModelAsset> {
    if let Some(result) = procedural::model(url) {
        return Ok(result?);
    }
    let fetcher = fetcher();
    let bytes = fetcher.fetch(url)?;
    let base = fetcher.base_dir(url);
    Ok(parse_model(&bytes, base.as_deref(), url)?)
}

fn read_animation(url: &str) -> Result<AnimationAsset> {
    if let Some(result) = procedural::animation(url) {
        return Ok(result?);
    }
    let fetcher = fetcher();
    let bytes = fetcher.fetch(url)?;
    let base = fetcher.base_dir(url);
    Ok(parse_animation(&bytes, base.as_deref(), url)?)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
