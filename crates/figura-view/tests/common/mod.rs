#![allow(dead_code)]

use anyhow::{Result, anyhow};
use figura_anim::Facing;
use figura_io::procedural::{REFERENCE_ANIMATION_URL, mannequin, reference_animation};
use figura_io::{ScriptedSource, TextureAsset};
use figura_scene::math::{Vec3, translation_of};
use figura_scene::{NodeId, SceneGraph};
use figura_view::{HeadlessBackend, ManualClock, ViewerConfig, ViewerEngine, ViewerEvent};

pub const FRAME: f32 = 1.0 / 60.0;

/// An engine wired to a scripted source, a counting backend and a hand-driven clock, with
/// handles kept for asserts.
pub struct Harness {
    pub engine: ViewerEngine,
    pub source: ScriptedSource,
    pub backend: HeadlessBackend,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new(config: ViewerConfig) -> Result<Self> {
        let source = ScriptedSource::new();
        let backend = HeadlessBackend::new();
        let clock = ManualClock::new();
        let engine = ViewerEngine::initialize(
            config,
            Box::new(source.clone()),
            Box::new(backend.clone()),
            800,
            600,
        )?
        .with_clock(Box::new(clock.clone()));
        Ok(Self {
            engine,
            source,
            backend,
            clock,
        })
    }

    /// Default tuning without the particle field, so mesh counts are just the model's.
    pub fn quiet() -> Result<Self> {
        Self::new(ViewerConfig {
            particle_count: 0,
            ..ViewerConfig::default()
        })
    }

    pub fn add_mannequin(&self, url: &str, height: f32) {
        self.source.add_model(url, mannequin(url, height));
    }

    pub fn add_wave(&self) {
        self.source
            .add_animation(REFERENCE_ANIMATION_URL, reference_animation(Facing::PositiveZ));
    }

    pub fn add_texture(&self, url: &str) {
        self.source.add_texture(
            url,
            TextureAsset {
                url: url.to_string(),
                width: 2,
                height: 1,
                rgba: vec![128; 8],
            },
        );
    }

    /// Requests `url`, answers it and lets one frame pick it up.
    pub fn load_model(&mut self, url: &str) -> Result<()> {
        self.engine.load_model(url);
        if !self.source.resolve(url) {
            return Err(anyhow!("{url} was never requested"));
        }
        self.engine.frame(0.0)?;
        Ok(())
    }

    pub fn load_wave(&mut self) -> Result<()> {
        self.engine.load_animation(REFERENCE_ANIMATION_URL);
        self.source.resolve(REFERENCE_ANIMATION_URL);
        self.engine.frame(0.0)?;
        Ok(())
    }

    /// Runs `frames` frames, each `dt` seconds of host time apart.
    pub fn run(&mut self, frames: usize, dt: f32) -> Result<()> {
        for _ in 0..frames {
            self.clock.advance(dt);
            self.engine.frame(dt)?;
        }
        Ok(())
    }

    pub fn mesh_nodes(&self) -> usize {
        self.engine
            .graph()
            .iter()
            .filter(|(_, node)| node.as_mesh().is_some())
            .count()
    }
}

pub fn world(graph: &SceneGraph, id: NodeId) -> Result<Vec3> {
    graph
        .world_matrix(id)
        .map(|m| translation_of(&m))
        .ok_or_else(|| anyhow!("node {id:?} is not in the scene"))
}

pub fn loaded_urls(events: &[ViewerEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ViewerEvent::ModelLoaded(metadata) => Some(metadata.url.clone()),
            _ => None,
        })
        .collect()
}
