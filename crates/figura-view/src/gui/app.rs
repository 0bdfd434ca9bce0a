use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use egui::{self, FontId};
use egui_wgpu::winit::Painter;
use egui_wgpu::{RendererOptions, WgpuConfiguration, WgpuSetup, WgpuSetupCreateNew};
use egui_winit::State as EguiWinitState;
use figura_io::ModelMetadata;
use figura_io::procedural::{MANNEQUIN_URL, REFERENCE_ANIMATION_URL};
use figura_view::viewer::overlay::OverlayPainter;
use figura_view::viewer::ui::{Align2 as ViewerAlign2, Color32, Stroke};
use figura_view::{
    AnimationEntry, InteractionMode, Point2, PointerButton, PointerEvent, SoftwareBackend,
    ViewerCommand, ViewerEngine, ViewerEvent,
};
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};

use crate::headless::{asset_source, load_config};

const LOG_LINES: usize = 8;

pub fn run_gui(config: Option<PathBuf>) -> Result<()> {
    let mut config = load_config(config)?;
    if config.animations.is_empty() {
        config.animations.push(AnimationEntry {
            name: "Wave".to_string(),
            url: REFERENCE_ANIMATION_URL.to_string(),
        });
    }

    let event_loop = EventLoop::new().map_err(|err| anyhow::anyhow!(err.to_string()))?;
    let window = event_loop
        .create_window(
            winit::window::Window::default_attributes()
                .with_title("Figura")
                .with_min_inner_size(LogicalSize::new(960.0, 640.0)),
        )
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    let window = Arc::new(window);

    let egui_ctx = egui::Context::default();
    let mut painter = create_painter(egui_ctx.clone())?;
    pollster::block_on(painter.set_window(egui::ViewportId::ROOT, Some(window.clone())))
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;

    let mut egui_state = EguiWinitState::new(
        egui_ctx.clone(),
        egui::ViewportId::ROOT,
        &event_loop,
        Some(window.scale_factor() as f32),
        window.theme(),
        painter.max_texture_side(),
    );

    let size = window.inner_size();
    let engine = ViewerEngine::initialize(
        config,
        asset_source(),
        Box::new(SoftwareBackend::new()),
        size.width.max(1),
        size.height.max(1),
    )?;
    let mut app = FiguraApp::new(engine);
    app.engine.dispatch(ViewerCommand::LoadModel(app.model_url.clone()))?;
    app.engine.dispatch(ViewerCommand::SelectAnimation(0))?;

    let clear_color = egui_ctx.style().visuals.window_fill;
    let [r, g, b, a] = clear_color.to_array();
    let clear_color = [
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        a as f32 / 255.0,
    ];

    #[allow(deprecated)]
    event_loop
        .run(move |event, event_loop| {
            event_loop.set_control_flow(ControlFlow::Poll);
            match event {
                Event::WindowEvent { event, window_id } if window_id == window.id() => {
                    if matches!(event, WindowEvent::CloseRequested) {
                        app.engine.teardown();
                        event_loop.exit();
                        return;
                    }

                    let response = egui_state.on_window_event(&window, &event);
                    if response.repaint {
                        window.request_redraw();
                    }

                    match event {
                        WindowEvent::Resized(size) => {
                            if let (Some(width), Some(height)) =
                                (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
                            {
                                painter.on_window_resized(egui::ViewportId::ROOT, width, height);
                            }
                        }
                        WindowEvent::ScaleFactorChanged { .. } => {
                            let size = window.inner_size();
                            if let (Some(width), Some(height)) =
                                (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
                            {
                                painter.on_window_resized(egui::ViewportId::ROOT, width, height);
                            }
                        }
                        WindowEvent::RedrawRequested => {
                            let raw_input = egui_state.take_egui_input(&window);
                            let full_output = egui_ctx.run(raw_input, |ctx| {
                                app.ui(ctx);
                            });

                            egui_state.handle_platform_output(&window, full_output.platform_output);

                            let clipped_primitives = egui_ctx
                                .tessellate(full_output.shapes, full_output.pixels_per_point);
                            let _ = painter.paint_and_update_textures(
                                egui::ViewportId::ROOT,
                                full_output.pixels_per_point,
                                clear_color,
                                &clipped_primitives,
                                &full_output.textures_delta,
                                Vec::new(),
                            );
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => {
                    window.request_redraw();
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;

    Ok(())
}

fn create_painter(ctx: egui::Context) -> Result<Painter> {
    let mut configuration = WgpuConfiguration::default();
    let power_preference = match std::env::var("FIGURA_POWER_PREF") {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "high" | "high_performance" | "high-performance" => {
                wgpu::PowerPreference::HighPerformance
            }
            "default" => wgpu::PowerPreference::default(),
            _ => wgpu::PowerPreference::LowPower,
        },
        Err(_) => wgpu::PowerPreference::LowPower,
    };
    configuration.wgpu_setup = WgpuSetup::CreateNew(WgpuSetupCreateNew {
        power_preference,
        device_descriptor: Arc::new(|adapter| {
            let required_limits =
                wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits());
            wgpu::DeviceDescriptor {
                label: Some("figura-view"),
                required_features: wgpu::Features::empty(),
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::default(),
            }
        }),
        ..Default::default()
    });

    let painter = pollster::block_on(Painter::new(
        ctx,
        configuration,
        false,
        RendererOptions::default(),
    ));
    Ok(painter)
}

struct FiguraApp {
    engine: ViewerEngine,
    model_url: String,
    animation_url: String,
    environment_url: String,
    selected_animation: usize,
    metadata: Option<ModelMetadata>,
    now_playing: Option<String>,
    log: Vec<String>,
    viewport_size: (u32, u32),
    pointer_inside: bool,
    last_pointer: Option<Point2>,
    last_frame: Instant,
}

impl FiguraApp {
    fn new(engine: ViewerEngine) -> Self {
        let environment_url = engine.config().environment_url.clone().unwrap_or_default();
        Self {
            engine,
            model_url: MANNEQUIN_URL.to_string(),
            animation_url: String::new(),
            environment_url,
            selected_animation: 0,
            metadata: None,
            now_playing: None,
            log: Vec::new(),
            viewport_size: (0, 0),
            pointer_inside: false,
            last_pointer: None,
            last_frame: Instant::now(),
        }
    }

    fn ui(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.spacing_mut().item_spacing = egui::vec2(10.0, 0.0);
                ui.heading("Figura");
                ui.add(egui::Separator::default().vertical());

                if ui
                    .selectable_label(self.engine.wireframe_enabled(), "Wireframe")
                    .clicked()
                {
                    self.command(ViewerCommand::ToggleWireframe);
                }
                if ui
                    .selectable_label(self.engine.skeleton().is_some(), "Skeleton")
                    .clicked()
                {
                    self.command(ViewerCommand::ToggleSkeleton);
                }
                if ui
                    .selectable_label(self.engine.ruler().is_some(), "Ruler")
                    .clicked()
                {
                    self.command(ViewerCommand::ToggleRuler);
                }
                if ui.button("Reframe").clicked() {
                    self.command(ViewerCommand::RandomReframe);
                }
                if self.engine.is_loading() {
                    ui.add(egui::Spinner::new());
                    ui.label("Loading");
                }
            });
        });

        egui::SidePanel::left("side_panel")
            .resizable(false)
            .exact_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
                    ui.spacing_mut().item_spacing = egui::vec2(8.0, 8.0);
                    ui.add_space(12.0);
                    ui.group(|ui| self.assets_panel(ui));
                    ui.group(|ui| self.model_panel(ui));
                    ui.group(|ui| self.log_panel(ui));
                    ui.add_space(20.0);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let (rect, response) = ui.allocate_exact_size(available, egui::Sense::click_and_drag());
            if response.clicked() {
                response.request_focus();
            }
            self.draw_viewport(ctx, ui, rect);
        });

        self.collect_events();
    }

    fn assets_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Model");
        ui.add(egui::TextEdit::singleline(&mut self.model_url));
        if ui.button("Load Model").clicked() {
            self.command(ViewerCommand::LoadModel(self.model_url.trim().to_string()));
        }

        ui.add_space(4.0);
        ui.label("Animation");
        let entries: Vec<String> = self
            .engine
            .library()
            .entries()
            .iter()
            .map(|entry| entry.name.clone())
            .collect();
        let current = entries
            .get(self.selected_animation)
            .cloned()
            .unwrap_or_default();
        let mut chosen = None;
        egui::ComboBox::from_id_salt("animation_combo")
            .selected_text(current)
            .show_ui(ui, |ui| {
                for (index, name) in entries.iter().enumerate() {
                    if ui
                        .selectable_label(index == self.selected_animation, name)
                        .clicked()
                    {
                        chosen = Some(index);
                    }
                }
            });
        if let Some(index) = chosen {
            self.selected_animation = index;
            self.command(ViewerCommand::SelectAnimation(index));
        }
        ui.add(egui::TextEdit::singleline(&mut self.animation_url).hint_text("animation URL"));
        if ui.button("Load Animation").clicked() && !self.animation_url.trim().is_empty() {
            self.command(ViewerCommand::LoadAnimation(self.animation_url.trim().to_string()));
        }

        ui.add_space(4.0);
        ui.label("Environment");
        ui.add(egui::TextEdit::singleline(&mut self.environment_url).hint_text("image URL"));
        if ui.button("Set Environment").clicked() && !self.environment_url.trim().is_empty() {
            self.command(ViewerCommand::SetEnvironment(self.environment_url.trim().to_string()));
        }
    }

    fn model_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Details");
        let Some(metadata) = &self.metadata else {
            ui.label("No model loaded");
            return;
        };
        let mut rows = vec![
            ("Format", metadata.detected_spec_version.clone()),
            ("Height", format!("{:.2} m", metadata.height)),
            ("Triangles", metadata.triangle_count.to_string()),
            ("Materials", metadata.material_count.to_string()),
        ];
        let optional = [
            ("Title", &metadata.title),
            ("Author", &metadata.author),
            ("License", &metadata.license),
            ("Allowed users", &metadata.allowed_users),
        ];
        rows.extend(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.clone().map(|value| (key, value))),
        );
        for (key, value) in rows {
            ui.horizontal(|ui| {
                ui.label(format!("{key}:"));
                ui.label(value);
            });
        }
        if let Some(name) = &self.now_playing {
            ui.label(format!("Playing: {name}"));
        }
        let mode = match self.engine.interaction_mode() {
            InteractionMode::Idle => "idle",
            InteractionMode::Orbiting => "orbit camera",
            InteractionMode::RotatingModel => "turning model",
        };
        ui.label(format!("Pointer: {mode}"));
    }

    fn log_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Log");
        for line in &self.log {
            ui.label(line);
        }
    }

    fn draw_viewport(&mut self, ctx: &egui::Context, ui: &mut egui::Ui, rect: egui::Rect) {
        let bg = ui.visuals().extreme_bg_color;
        ui.painter().rect_filled(rect, 0.0, bg);

        let size = (
            rect.width().round().max(1.0) as u32,
            rect.height().round().max(1.0) as u32,
        );
        if size != self.viewport_size {
            self.viewport_size = size;
            self.engine.resize(size.0, size.1);
        }
        self.forward_pointer(ctx, rect);

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        if let Err(err) = self.engine.frame(dt) {
            self.push_log(format!("Frame failed: {err}"));
        }

        let overlay_painter = ui.painter().with_clip_rect(rect);
        let mut overlay = EguiOverlayPainter::new(&overlay_painter, rect.min.to_vec2());
        self.engine.paint(&mut overlay);
        ctx.request_repaint();
    }

    /// Turns egui pointer state into viewer pointer events, in viewport pixels.
    fn forward_pointer(&mut self, ctx: &egui::Context, rect: egui::Rect) {
        let (hover, pressed, released, scroll) = ctx.input(|i| {
            let buttons = [
                (egui::PointerButton::Primary, PointerButton::Primary),
                (egui::PointerButton::Secondary, PointerButton::Secondary),
                (egui::PointerButton::Middle, PointerButton::Middle),
            ];
            let pressed: Vec<PointerButton> = buttons
                .iter()
                .filter(|(egui_button, _)| i.pointer.button_pressed(*egui_button))
                .map(|(_, button)| *button)
                .collect();
            let released: Vec<PointerButton> = buttons
                .iter()
                .filter(|(egui_button, _)| i.pointer.button_released(*egui_button))
                .map(|(_, button)| *button)
                .collect();
            (i.pointer.hover_pos(), pressed, released, i.raw_scroll_delta.y)
        });

        let local = hover.map(|pos| Point2::new(pos.x - rect.min.x, pos.y - rect.min.y));
        let inside = hover.is_some_and(|pos| rect.contains(pos));

        if let Some(pos) = local {
            if self.last_pointer != Some(pos) {
                self.engine.pointer(PointerEvent::Move { pos });
            }
            for button in released {
                self.engine.pointer(PointerEvent::Up { pos, button });
            }
            if inside {
                for button in pressed {
                    self.engine.pointer(PointerEvent::Down { pos, button });
                }
            }
        }
        if self.pointer_inside && !inside {
            self.engine.pointer(PointerEvent::Leave);
        }
        if inside && scroll != 0.0 {
            self.engine.pointer(PointerEvent::Wheel { delta: scroll });
        }
        self.pointer_inside = inside;
        self.last_pointer = local;
    }

    fn command(&mut self, command: ViewerCommand) {
        if let Err(err) = self.engine.dispatch(command) {
            self.push_log(format!("Error: {err}"));
        }
    }

    fn collect_events(&mut self) {
        for event in self.engine.drain_events() {
            match event {
                ViewerEvent::ModelLoaded(metadata) => {
                    self.push_log(format!("Loaded {}", metadata.url));
                    self.metadata = Some(metadata);
                }
                ViewerEvent::AnimationStarted { name, dropped, .. } => {
                    if !dropped.is_empty() {
                        self.push_log(format!("{name}: {} joints unbound", dropped.len()));
                    }
                    self.now_playing = Some(name);
                }
                ViewerEvent::LoadFailed(err) | ViewerEvent::AnimationFailed(err) => {
                    self.push_log(format!("Error: {err}"));
                }
                ViewerEvent::ContextLost => self.push_log("Render context lost".to_string()),
                ViewerEvent::ContextRestored => {
                    self.push_log("Render context restored".to_string());
                }
                ViewerEvent::LoadingChanged(_) => {}
            }
        }
    }

    fn push_log(&mut self, line: String) {
        self.log.push(line);
        if self.log.len() > LOG_LINES {
            let excess = self.log.len() - LOG_LINES;
            self.log.drain(0..excess);
        }
    }
}

struct EguiOverlayPainter<'a> {
    painter: &'a egui::Painter,
    offset: egui::Vec2,
}

impl<'a> EguiOverlayPainter<'a> {
    fn new(painter: &'a egui::Painter, offset: egui::Vec2) -> Self {
        Self { painter, offset }
    }
}

impl OverlayPainter for EguiOverlayPainter<'_> {
    fn line_segment(&mut self, start: Point2, end: Point2, stroke: Stroke) {
        let points = [
            to_egui_pos(start, self.offset),
            to_egui_pos(end, self.offset),
        ];
        self.painter.line_segment(points, to_egui_stroke(stroke));
    }

    fn circle_filled(&mut self, center: Point2, radius: f32, fill: Color32) {
        let center = to_egui_pos(center, self.offset);
        self.painter
            .circle_filled(center, radius, to_egui_color(fill));
    }

    fn polygon(&mut self, points: Vec<Point2>, fill: Color32, stroke: Option<Stroke>) {
        let points: Vec<egui::Pos2> =
            points.into_iter().map(|p| to_egui_pos(p, self.offset)).collect();
        let stroke = stroke.map_or(egui::Stroke::NONE, to_egui_stroke);
        self.painter.add(egui::Shape::convex_polygon(
            points,
            to_egui_color(fill),
            stroke,
        ));
    }

    fn text(&mut self, pos: Point2, align: ViewerAlign2, text: String, size: f32, color: Color32) {
        let pos = to_egui_pos(pos, self.offset);
        let align = match align {
            ViewerAlign2::LeftTop => egui::Align2::LEFT_TOP,
            ViewerAlign2::CenterCenter => egui::Align2::CENTER_CENTER,
            ViewerAlign2::CenterBottom => egui::Align2::CENTER_BOTTOM,
        };
        self.painter.text(
            pos,
            align,
            text,
            FontId::proportional(size),
            to_egui_color(color),
        );
    }
}

fn to_egui_pos(pos: Point2, offset: egui::Vec2) -> egui::Pos2 {
    egui::pos2(pos.x + offset.x, pos.y + offset.y)
}

fn to_egui_stroke(stroke: Stroke) -> egui::Stroke {
    egui::Stroke::new(stroke.width, to_egui_color(stroke.color))
}

fn to_egui_color(color: Color32) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}
