use std::rc::Rc;

use cgmath::InnerSpace;
use figura_anim::{AnimationPlayer, retarget};
use figura_base::{Guid, HumanBone, LengthUnit};
use figura_io::{AnimationAsset, AssetSource, LoadError, ModelAsset, ModelMetadata, TextureAsset};
use figura_scene::math::{Vec3, yaw};
use figura_scene::{
    GpuTextureId, Light, LightKind, Node, NodeId, NodeKind, Quat, SceneGraph, Transform,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use super::camera::{OrbitCamera, frame};
use super::clock::{Clock, SystemClock};
use super::events::{ViewerCommand, ViewerEvent};
use super::gpu;
use super::input::PointerEvent;
use super::interaction::{DragAction, InteractionMachine, InteractionMode};
use super::library::AnimationLibrary;
use super::loader::{Channel, Completion};
use super::model::LoadedModel;
use super::overlay::OverlayPainter;
use super::particles::ParticleField;
use super::ruler::Ruler;
use super::skeleton::SkeletonOverlay;
use super::ui::{Point2, Rect};
use super::wireframe::WireframeToggle;
use crate::backend::{FrameView, Label, RenderBackend};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};

/// Height the particle field is sized for before any model has loaded.
const DEFAULT_FIGURE_HEIGHT: f32 = 1.7;
/// Longest step one frame may advance the clock by.
const MAX_FRAME_STEP: f32 = 0.25;

pub type MetadataCallback = Box<dyn FnMut(&ModelMetadata)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Running,
    /// The render context is gone; nothing updates until it comes back.
    Paused,
    TornDown,
}

/// The avatar viewer. Owns the scene, the camera and every GPU resource it uploads.
///
/// All methods run on the host's frame/event thread. Asset requests go out through the
/// [`AssetSource`] and are collected once per [`ViewerEngine::frame`].
pub struct ViewerEngine {
    session: Guid,
    config: ViewerConfig,
    source: Box<dyn AssetSource>,
    backend: Box<dyn RenderBackend>,
    graph: SceneGraph,
    lights: Vec<NodeId>,
    camera: OrbitCamera,
    interaction: InteractionMachine,
    viewport: Rect,
    clock: f32,
    host_clock: Box<dyn Clock>,
    state: EngineState,
    models: Channel<ModelAsset>,
    animations: Channel<AnimationAsset>,
    environments: Channel<TextureAsset>,
    model: Option<LoadedModel>,
    animation: Option<Rc<AnimationAsset>>,
    player: Option<AnimationPlayer>,
    library: AnimationLibrary,
    wireframe: WireframeToggle,
    skeleton_enabled: bool,
    skeleton: Option<SkeletonOverlay>,
    ruler_enabled: bool,
    ruler: Option<Ruler>,
    particles: Option<ParticleField>,
    environment: Option<TextureAsset>,
    environment_gpu: Option<GpuTextureId>,
    rng: ChaCha8Rng,
    loading: bool,
    events: Vec<ViewerEvent>,
    on_metadata: Option<MetadataCallback>,
}

impl ViewerEngine {
    /// Creates the render context, lights and particle field. Fails with
    /// [`ViewerError::InitializationFailed`] when no context can be created.
    pub fn initialize(
        config: ViewerConfig,
        source: Box<dyn AssetSource>,
        mut backend: Box<dyn RenderBackend>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        config.validate()?;
        backend.create_context(width, height).map_err(|err| match err {
            ViewerError::InitializationFailed(_) => err,
            other => ViewerError::InitializationFailed(other.to_string()),
        })?;

        let mut graph = SceneGraph::new();
        let scene = graph.root();
        let ambient = graph.add_child(
            scene,
            Node::new(
                "ambient",
                NodeKind::Light(Light {
                    kind: LightKind::Ambient,
                    color: [1.0, 1.0, 1.0],
                    intensity: 0.6,
                }),
            ),
        )?;
        let key = graph.add_child(
            scene,
            Node::new(
                "key",
                NodeKind::Light(Light {
                    kind: LightKind::Directional,
                    color: [1.0, 0.97, 0.92],
                    intensity: 1.1,
                }),
            )
            .with_transform(Transform::from_rotation(key_light_rotation())),
        )?;

        let mut engine = Self {
            session: Guid::new(),
            camera: OrbitCamera::new(&config),
            library: AnimationLibrary::new(config.animations.clone()),
            rng: ChaCha8Rng::seed_from_u64(config.reframe_seed),
            config,
            source,
            backend,
            graph,
            lights: vec![ambient, key],
            interaction: InteractionMachine::new(),
            viewport: Rect::from_size(width, height),
            clock: 0.0,
            host_clock: Box::new(SystemClock::new()),
            state: EngineState::Running,
            models: Channel::new("model"),
            animations: Channel::new("animation"),
            environments: Channel::new("environment"),
            model: None,
            animation: None,
            player: None,
            wireframe: WireframeToggle::new(),
            skeleton_enabled: false,
            skeleton: None,
            ruler_enabled: false,
            ruler: None,
            particles: None,
            environment: None,
            environment_gpu: None,
            loading: false,
            events: Vec::new(),
            on_metadata: None,
        };
        engine.rebuild_particles(DEFAULT_FIGURE_HEIGHT)?;
        if let Some(url) = engine.config.environment_url.clone() {
            engine.set_environment(&url);
        }
        info!(session = %engine.session, width, height, "viewer initialized");
        Ok(engine)
    }

    /// Replaces the wall clock that load deadlines are measured against.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.host_clock = clock;
        self
    }

    /// Releases every GPU resource exactly once and stops accepting work. Safe to call twice.
    pub fn teardown(&mut self) {
        if self.state == EngineState::TornDown {
            return;
        }
        self.models.cancel();
        self.animations.cancel();
        self.environments.cancel();
        self.player = None;
        self.interaction.release();
        let released = self.dispose_overlays() + self.dispose_model() + self.dispose_particles();
        if let Some(id) = self.environment_gpu.take() {
            self.backend.release_texture(id);
        }
        self.environment = None;
        for light in std::mem::take(&mut self.lights) {
            gpu::remove_subtree(&mut self.graph, self.backend.as_mut(), light);
        }
        self.backend.destroy_context();
        self.on_metadata = None;
        self.state = EngineState::TornDown;
        self.set_loading(false);
        info!(session = %self.session, released, "viewer torn down");
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Rect::from_size(width, height);
        if self.state != EngineState::TornDown {
            self.backend.resize(width, height);
        }
        debug!(width, height, "viewport resized");
    }

    /// One tick of the loop: collect finished loads, advance camera and animation, draw.
    pub fn frame(&mut self, dt: f32) -> Result<()> {
        if self.state != EngineState::Running {
            return Ok(());
        }
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_FRAME_STEP) } else { 0.0 };
        self.clock += dt;

        self.poll_model();
        self.poll_animation();
        self.poll_environment();
        self.check_timeouts();
        self.refresh_loading();

        self.camera.update(dt);
        if let Some(player) = self.player.as_mut() {
            player.advance(dt);
            player.apply(&mut self.graph);
        }
        if let Some(particles) = self.particles.as_mut() {
            particles.update(&mut self.graph, dt);
        }

        let labels: Vec<Label> = self.ruler.iter().map(|ruler| ruler.label().clone()).collect();
        let view = FrameView {
            graph: &self.graph,
            camera: self.camera.view(),
            viewport: self.viewport,
            environment: self.environment_gpu,
            labels: &labels,
        };
        match self.backend.render(&view) {
            Ok(()) => Ok(()),
            Err(ViewerError::ContextLost) => {
                self.context_lost();
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Pauses the loop. Every GPU id the scene holds becomes meaningless and is forgotten.
    pub fn context_lost(&mut self) {
        if self.state != EngineState::Running {
            return;
        }
        warn!("render context lost; pausing");
        let scene = self.graph.root();
        gpu::forget_subtree(&mut self.graph, scene);
        self.environment_gpu = None;
        self.state = EngineState::Paused;
        self.events.push(ViewerEvent::ContextLost);
    }

    /// Recreates the context and re-uploads what the scene already holds. Nothing is fetched.
    pub fn context_restored(&mut self) -> Result<()> {
        if self.state != EngineState::Paused {
            return Ok(());
        }
        let width = self.viewport.width().round().max(1.0) as u32;
        let height = self.viewport.height().round().max(1.0) as u32;
        self.backend.create_context(width, height)?;
        let scene = self.graph.root();
        let uploaded = gpu::upload_subtree(&mut self.graph, self.backend.as_mut(), scene)?;
        if let Some(texture) = &self.environment {
            self.environment_gpu = Some(self.backend.upload_texture(texture)?);
        }
        self.state = EngineState::Running;
        if self.particles.is_none() {
            let height = self.model.as_ref().map_or(DEFAULT_FIGURE_HEIGHT, |model| model.height);
            self.rebuild_particles(height)?;
        }
        self.sync_overlays()?;
        self.events.push(ViewerEvent::ContextRestored);
        info!(uploaded, "render context restored");
        Ok(())
    }

    pub fn dispatch(&mut self, command: ViewerCommand) -> Result<()> {
        debug!(?command, "command");
        match command {
            ViewerCommand::ToggleWireframe => {
                self.toggle_wireframe();
                Ok(())
            }
            ViewerCommand::ToggleSkeleton => self.toggle_skeleton().map(|_| ()),
            ViewerCommand::ToggleRuler => self.toggle_ruler().map(|_| ()),
            ViewerCommand::SelectAnimation(index) => self.select_animation(index),
            ViewerCommand::RandomReframe => {
                self.random_reframe();
                Ok(())
            }
            ViewerCommand::LoadModel(url) => {
                self.load_model(&url);
                Ok(())
            }
            ViewerCommand::LoadAnimation(url) => {
                self.load_animation(&url);
                Ok(())
            }
            ViewerCommand::SetEnvironment(url) => {
                self.set_environment(&url);
                Ok(())
            }
        }
    }

    /// Requests `url`. Whatever is still in flight for an earlier URL will be discarded.
    pub fn load_model(&mut self, url: &str) -> u64 {
        let now = self.host_now();
        let pending = self.source.request_model(url);
        let ticket = self.models.begin(pending, now);
        info!(url, ticket, "loading model");
        self.refresh_loading();
        ticket
    }

    pub fn load_animation(&mut self, url: &str) {
        if let Some(asset) = self.library.cached(url) {
            // Anything still in flight is older than this selection.
            self.animations.cancel();
            self.start_animation(asset);
            self.refresh_loading();
            return;
        }
        let now = self.host_now();
        let pending = self.source.request_animation(url);
        let ticket = self.animations.begin(pending, now);
        info!(url, ticket, "loading animation");
        self.refresh_loading();
    }

    /// Plays library entry `index`. An index past the end reports an error and leaves the
    /// current playback alone.
    pub fn select_animation(&mut self, index: usize) -> Result<()> {
        let url = match self.library.entry(index) {
            Ok(entry) => entry.url.clone(),
            Err(err) => {
                warn!(%err, "animation selection rejected");
                self.events.push(ViewerEvent::AnimationFailed(err.clone()));
                return Err(err);
            }
        };
        self.load_animation(&url);
        Ok(())
    }

    pub fn set_environment(&mut self, url: &str) {
        let now = self.host_now();
        let pending = self.source.request_texture(url);
        self.environments.begin(pending, now);
        self.refresh_loading();
    }

    pub fn toggle_wireframe(&mut self) -> bool {
        self.wireframe.toggle(&mut self.graph, self.model.as_mut())
    }

    pub fn toggle_skeleton(&mut self) -> Result<bool> {
        self.skeleton_enabled = !self.skeleton_enabled;
        self.sync_overlays()?;
        Ok(self.skeleton_enabled)
    }

    pub fn toggle_ruler(&mut self) -> Result<bool> {
        self.ruler_enabled = !self.ruler_enabled;
        self.sync_overlays()?;
        Ok(self.ruler_enabled)
    }

    pub fn random_reframe(&mut self) {
        self.camera.random_reframe(&mut self.rng, &self.config);
    }

    pub fn pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Up { .. } | PointerEvent::Leave => {
                self.interaction.release();
                return;
            }
            _ if self.state != EngineState::Running => return,
            _ => {}
        }
        match event {
            PointerEvent::Down { pos, button } => {
                let graph = &self.graph;
                let model = self.model.as_ref();
                let view = self.camera.view();
                let viewport = self.viewport;
                let mode = self.interaction.pointer_down(pos, button, |pos| {
                    model.is_some_and(|model| {
                        view.screen_ray(pos, viewport)
                            .and_then(|ray| model.hit_test(graph, &ray))
                            .is_some()
                    })
                });
                debug!(?mode, "pointer down");
            }
            PointerEvent::Move { pos } => self.drag(pos),
            PointerEvent::Wheel { delta } => {
                if self.interaction.orbit_enabled() {
                    self.camera.zoom(delta * self.config.zoom_sensitivity);
                }
            }
            PointerEvent::Up { .. } | PointerEvent::Leave => {}
        }
    }

    fn drag(&mut self, pos: Point2) {
        match self.interaction.pointer_move(pos) {
            DragAction::None => {}
            DragAction::Spin(dx) => {
                let Some(root) = self.model.as_ref().map(|model| model.root) else {
                    return;
                };
                if let Some(node) = self.graph.get_mut(root) {
                    node.local.rotation = yaw(dx * self.config.spin_sensitivity) * node.local.rotation;
                }
            }
            DragAction::Orbit(delta) => {
                let s = self.config.orbit_sensitivity;
                self.camera.orbit(-delta.x * s, delta.y * s);
            }
            DragAction::Pan(delta) => {
                self.camera.pan(delta.x, delta.y, self.config.pan_sensitivity);
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<ViewerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Called once per successful model load, after the model is on screen.
    pub fn on_metadata(&mut self, callback: impl FnMut(&ModelMetadata) + 'static) {
        self.on_metadata = Some(Box::new(callback));
    }

    /// Replays the last frame's 2D shapes, for backends that produce them.
    pub fn paint(&self, painter: &mut dyn OverlayPainter) {
        self.backend.paint(painter);
    }

    /// Identifies this engine instance in logs.
    pub fn session(&self) -> Guid {
        self.session
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn interaction_mode(&self) -> InteractionMode {
        self.interaction.mode()
    }

    pub fn orbit_enabled(&self) -> bool {
        self.interaction.orbit_enabled()
    }

    pub fn model(&self) -> Option<&LoadedModel> {
        self.model.as_ref()
    }

    pub fn player(&self) -> Option<&AnimationPlayer> {
        self.player.as_ref()
    }

    pub fn library(&self) -> &AnimationLibrary {
        &self.library
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn requested_model(&self) -> Option<&str> {
        self.models.current_url()
    }

    pub fn wireframe_enabled(&self) -> bool {
        self.wireframe.is_enabled()
    }

    pub fn wireframe(&self) -> &WireframeToggle {
        &self.wireframe
    }

    pub fn skeleton(&self) -> Option<&SkeletonOverlay> {
        self.skeleton.as_ref()
    }

    pub fn ruler(&self) -> Option<&Ruler> {
        self.ruler.as_ref()
    }

    pub fn particles(&self) -> Option<&ParticleField> {
        self.particles.as_ref()
    }

    pub fn environment(&self) -> Option<(&TextureAsset, Option<GpuTextureId>)> {
        self.environment.as_ref().map(|texture| (texture, self.environment_gpu))
    }

    /// Animation time: the sum of clamped frame steps while running.
    pub fn elapsed(&self) -> f32 {
        self.clock
    }

    fn host_now(&self) -> f32 {
        self.host_clock.now().as_secs_f32()
    }

    fn poll_model(&mut self) {
        let Some(Completion { url, result, late, .. }) = self.models.poll() else {
            return;
        };
        if late {
            info!(url = %url, "model arrived after the timeout");
        }
        match result.map_err(ViewerError::from).and_then(|asset| self.attach_model(asset)) {
            Ok(()) => {}
            Err(err) => {
                warn!(url = %url, %err, "model load failed");
                self.events.push(ViewerEvent::LoadFailed(err));
            }
        }
    }

    fn poll_animation(&mut self) {
        let Some(Completion { url, result, .. }) = self.animations.poll() else {
            return;
        };
        match result {
            Ok(asset) => {
                let asset = self.library.insert(asset);
                self.start_animation(asset);
            }
            Err(err) => {
                warn!(url = %url, %err, "animation load failed");
                self.events.push(ViewerEvent::AnimationFailed(err.into()));
            }
        }
    }

    fn poll_environment(&mut self) {
        let Some(Completion { url, result, .. }) = self.environments.poll() else {
            return;
        };
        let texture = match result {
            Ok(texture) => texture,
            Err(err) => {
                warn!(url = %url, %err, "environment load failed");
                self.events.push(ViewerEvent::LoadFailed(err.into()));
                return;
            }
        };
        match self.backend.upload_texture(&texture) {
            Ok(id) => {
                if let Some(old) = self.environment_gpu.replace(id) {
                    self.backend.release_texture(old);
                }
                info!(url = %url, width = texture.width, height = texture.height, "environment set");
                self.environment = Some(texture);
            }
            Err(err) => {
                warn!(url = %url, %err, "environment upload failed");
                self.events.push(ViewerEvent::LoadFailed(err));
            }
        }
    }

    fn check_timeouts(&mut self) {
        let limit = self.config.load_timeout_secs;
        let now = self.host_now();
        let timeout = |url: String| ViewerError::LoadTimeout { url, seconds: limit };
        if let Some(url) = self.models.check_timeout(now, limit) {
            warn!(url = %url, "model load timed out");
            self.events.push(ViewerEvent::LoadFailed(timeout(url)));
        }
        if let Some(url) = self.animations.check_timeout(now, limit) {
            warn!(url = %url, "animation load timed out");
            self.events.push(ViewerEvent::AnimationFailed(timeout(url)));
        }
        if let Some(url) = self.environments.check_timeout(now, limit) {
            warn!(url = %url, "environment load timed out");
            self.events.push(ViewerEvent::LoadFailed(timeout(url)));
        }
    }

    fn refresh_loading(&mut self) {
        let loading = self.models.is_loading()
            || self.animations.is_loading()
            || self.environments.is_loading();
        self.set_loading(loading);
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.events.push(ViewerEvent::LoadingChanged(loading));
        }
    }

    /// Replaces the current model. The old one is gone, GPU memory included, before the new one
    /// enters the scene. A context lost during the upload keeps the new model for the restore to
    /// upload; any other upload failure leaves the scene without a model.
    fn attach_model(&mut self, asset: ModelAsset) -> Result<()> {
        if !asset.humanoid.contains_key(&HumanBone::Hips) {
            return Err(LoadError::NoSkeletonData { url: asset.url }.into());
        }
        let first_load = self.model.is_none();
        self.dispose_overlays();
        self.dispose_model();

        let scene = self.graph.root();
        let mut model = LoadedModel::instantiate(&mut self.graph, scene, &asset)?;
        match gpu::upload_subtree(&mut self.graph, self.backend.as_mut(), model.root) {
            Ok(_) => {}
            Err(ViewerError::ContextLost) => self.context_lost(),
            Err(err) => {
                gpu::remove_subtree(&mut self.graph, self.backend.as_mut(), model.root);
                return Err(err);
            }
        }
        self.wireframe.apply(&mut self.graph, &mut model);
        let bounds = model.bounds;
        let height = model.height;
        let metadata = model.metadata.clone();
        self.model = Some(model);

        self.camera.apply_frame(frame(&bounds, &self.config), first_load, &self.config);
        self.rebuild_particles(height)?;
        self.sync_overlays()?;
        if let Some(animation) = self.animation.clone() {
            self.start_animation(animation);
        }

        info!(
            url = %metadata.url,
            triangles = metadata.triangle_count,
            materials = metadata.material_count,
            height,
            first_load,
            "model loaded"
        );
        if let Some(callback) = self.on_metadata.as_mut() {
            callback(&metadata);
        }
        self.events.push(ViewerEvent::ModelLoaded(metadata));
        Ok(())
    }

    /// Binds `asset` to the current model. Without a model it is remembered and bound on the
    /// next load; a failed bind leaves the model in its rest pose.
    fn start_animation(&mut self, asset: Rc<AnimationAsset>) {
        self.animation = Some(Rc::clone(&asset));
        let Some(model) = self.model.as_ref() else {
            debug!(url = %asset.url, "animation waiting for a model");
            return;
        };
        self.player = None;
        model.restore_rest_pose(&mut self.graph);
        match retarget(&asset.animation, 0, &model.rig) {
            Ok(clip) => {
                info!(
                    url = %asset.url,
                    clip = %clip.name,
                    duration = clip.duration,
                    bound = clip.rotations.len(),
                    dropped = clip.dropped.len(),
                    "animation started"
                );
                self.events.push(ViewerEvent::AnimationStarted {
                    name: clip.name.clone(),
                    duration: clip.duration,
                    dropped: clip.dropped.clone(),
                });
                self.player = Some(AnimationPlayer::new(clip, self.config.loop_mode));
            }
            Err(err) => {
                warn!(url = %asset.url, %err, "animation could not be bound");
                self.events.push(ViewerEvent::AnimationFailed(err.into()));
            }
        }
    }

    /// Builds or disposes the skeleton and ruler to match their toggles.
    fn sync_overlays(&mut self) -> Result<()> {
        let ready = self.state == EngineState::Running;
        if !self.skeleton_enabled || self.model.is_none() {
            if let Some(skeleton) = self.skeleton.take() {
                skeleton.dispose(&mut self.graph, self.backend.as_mut());
            }
        }
        if !self.ruler_enabled || self.model.is_none() {
            if let Some(ruler) = self.ruler.take() {
                ruler.dispose(&mut self.graph, self.backend.as_mut());
            }
        }
        let Some(model) = self.model.as_ref().filter(|_| ready) else {
            return Ok(());
        };
        if self.skeleton_enabled && self.skeleton.is_none() {
            self.skeleton = Some(SkeletonOverlay::build(
                &mut self.graph,
                self.backend.as_mut(),
                model,
            )?);
        }
        if self.ruler_enabled && self.ruler.is_none() {
            let scene = self.graph.root();
            self.ruler = Some(Ruler::build(
                &mut self.graph,
                self.backend.as_mut(),
                scene,
                &model.bounds,
                model.height,
                LengthUnit::Meter,
            )?);
        }
        Ok(())
    }

    fn rebuild_particles(&mut self, height: f32) -> Result<()> {
        self.dispose_particles();
        if self.config.particle_count == 0 || self.state != EngineState::Running {
            return Ok(());
        }
        let scene = self.graph.root();
        self.particles = Some(ParticleField::build(
            &mut self.graph,
            self.backend.as_mut(),
            scene,
            height,
            self.config.particle_count,
            self.config.particle_seed,
        )?);
        Ok(())
    }

    fn dispose_overlays(&mut self) -> usize {
        let mut released = 0;
        if let Some(skeleton) = self.skeleton.take() {
            released += skeleton.dispose(&mut self.graph, self.backend.as_mut());
        }
        if let Some(ruler) = self.ruler.take() {
            released += ruler.dispose(&mut self.graph, self.backend.as_mut());
        }
        released
    }

    fn dispose_model(&mut self) -> usize {
        self.player = None;
        let Some(model) = self.model.take() else {
            return 0;
        };
        let released = gpu::remove_subtree(&mut self.graph, self.backend.as_mut(), model.root);
        debug!(url = %model.url, released, "model disposed");
        released
    }

    fn dispose_particles(&mut self) -> usize {
        self.particles
            .take()
            .map_or(0, |particles| particles.dispose(&mut self.graph, self.backend.as_mut()))
    }
}

impl Drop for ViewerEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for ViewerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerEngine")
            .field("state", &self.state)
            .field("model", &self.model.as_ref().map(|model| model.url.as_str()))
            .field("mode", &self.interaction.mode())
            .field("nodes", &self.graph.len())
            .finish_non_exhaustive()
    }
}

/// Key light from above, slightly in front and to the right of the model.
fn key_light_rotation() -> Quat {
    let direction = Vec3::new(-0.4, -0.8, -0.45).normalize();
    Quat::from_arc(Vec3::new(0.0, 0.0, -1.0), direction, None)
}
