mod common;

use anyhow::Result;
use common::{FRAME, Harness, loaded_urls};
use figura_io::LoadError;
use figura_io::procedural::{REFERENCE_ANIMATION_URL, mannequin};
use figura_view::{
    AnimationEntry, EngineState, HeadlessBackend, ViewerCommand, ViewerConfig, ViewerEngine,
    ViewerError, ViewerEvent,
};

#[test]
fn a_slow_first_request_never_replaces_a_newer_one() -> Result<()> {
    let mut h = Harness::quiet()?;
    h.add_mannequin("a.vrm", 1.0);
    h.add_mannequin("b.vrm", 2.0);
    h.engine.load_model("a.vrm");
    h.engine.load_model("b.vrm");

    h.source.resolve("b.vrm");
    h.engine.frame(FRAME)?;
    assert_eq!(h.engine.model().map(|m| m.url.as_str()), Some("b.vrm"));

    h.source.resolve("a.vrm");
    h.run(3, FRAME)?;
    assert_eq!(h.engine.model().map(|m| m.url.as_str()), Some("b.vrm"));
    assert_eq!(loaded_urls(&h.engine.drain_events()), vec!["b.vrm"]);
    assert_eq!(h.backend.stats().live_meshes.len(), 1);
    Ok(())
}

#[test]
fn an_early_answer_for_a_superseded_request_is_dropped() -> Result<()> {
    let mut h = Harness::quiet()?;
    h.add_mannequin("a.vrm", 1.0);
    h.add_mannequin("b.vrm", 2.0);
    h.engine.load_model("a.vrm");
    h.engine.load_model("b.vrm");

    h.source.resolve("a.vrm");
    h.engine.frame(FRAME)?;
    assert!(h.engine.model().is_none());
    assert!(h.engine.is_loading());

    h.source.resolve("b.vrm");
    h.engine.frame(FRAME)?;
    assert_eq!(loaded_urls(&h.engine.drain_events()), vec!["b.vrm"]);
    assert!(!h.engine.is_loading());
    Ok(())
}

#[test]
fn loading_flag_follows_outstanding_requests() -> Result<()> {
    let mut h = Harness::quiet()?;
    h.add_mannequin("a.vrm", 1.0);
    h.load_model("a.vrm")?;
    let changes: Vec<bool> = h
        .engine
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            ViewerEvent::LoadingChanged(loading) => Some(loading),
            _ => None,
        })
        .collect();
    assert_eq!(changes, vec![true, false]);
    Ok(())
}

#[test]
fn a_stuck_load_times_out_once_and_a_late_answer_still_lands() -> Result<()> {
    let mut h = Harness::quiet()?;
    h.add_mannequin("slow.vrm", 1.0);
    h.engine.load_model("slow.vrm");
    h.run(130, 0.25)?;

    let events = h.engine.drain_events();
    let timeouts: Vec<&ViewerEvent> = events
        .iter()
        .filter(|event| matches!(event, ViewerEvent::LoadFailed(ViewerError::LoadTimeout { .. })))
        .collect();
    assert_eq!(
        timeouts,
        vec![&ViewerEvent::LoadFailed(ViewerError::LoadTimeout {
            url: "slow.vrm".to_string(),
            seconds: 30.0,
        })]
    );
    assert!(!h.engine.is_loading());
    assert_eq!(events.last(), Some(&ViewerEvent::LoadingChanged(false)));

    h.source.resolve("slow.vrm");
    h.engine.frame(FRAME)?;
    assert_eq!(h.engine.model().map(|m| m.url.as_str()), Some("slow.vrm"));
    Ok(())
}

#[test]
fn the_load_deadline_follows_host_time_on_a_slow_host() -> Result<()> {
    let mut h = Harness::quiet()?;
    h.add_mannequin("slow.vrm", 1.0);
    h.engine.load_model("slow.vrm");

    // One frame per second: the animation clock crawls at the clamped step.
    h.run(29, 1.0)?;
    assert!(h.engine.is_loading());
    h.run(2, 1.0)?;
    assert!(h.engine.elapsed() < 10.0);

    let timeouts = h
        .engine
        .drain_events()
        .into_iter()
        .filter(|event| matches!(event, ViewerEvent::LoadFailed(ViewerError::LoadTimeout { .. })))
        .count();
    assert_eq!(timeouts, 1);
    assert!(!h.engine.is_loading());
    Ok(())
}

#[test]
fn a_model_without_a_skeleton_keeps_the_previous_one() -> Result<()> {
    let mut h = Harness::quiet()?;
    h.add_mannequin("a.vrm", 1.0);
    let mut broken = mannequin("statue.glb", 1.0);
    broken.humanoid.clear();
    h.source.add_model("statue.glb", broken);

    h.load_model("a.vrm")?;
    h.engine.drain_events();
    h.load_model("statue.glb")?;

    let events = h.engine.drain_events();
    assert!(events.contains(&ViewerEvent::LoadFailed(ViewerError::Load(
        LoadError::NoSkeletonData {
            url: "statue.glb".to_string(),
        }
    ))));
    assert_eq!(h.engine.model().map(|m| m.url.as_str()), Some("a.vrm"));
    assert_eq!(h.backend.stats().live_meshes.len(), 1);
    Ok(())
}

#[test]
fn fetch_failures_are_reported_and_the_viewer_keeps_running() -> Result<()> {
    let mut h = Harness::quiet()?;
    h.engine.load_model("missing.vrm");
    h.source.resolve_all();
    h.engine.frame(FRAME)?;
    let failed = h
        .engine
        .drain_events()
        .into_iter()
        .any(|event| {
            matches!(
                event,
                ViewerEvent::LoadFailed(ViewerError::Load(LoadError::FetchFailed { .. }))
            )
        });
    assert!(failed);
    assert_eq!(h.engine.state(), EngineState::Running);
    Ok(())
}

#[test]
fn initialization_failure_is_reported() {
    let result = ViewerEngine::initialize(
        ViewerConfig::default(),
        Box::new(figura_io::ScriptedSource::new()),
        Box::new(HeadlessBackend::failing("webgl unavailable")),
        640,
        480,
    );
    match result {
        Err(ViewerError::InitializationFailed(reason)) => assert!(reason.contains("webgl")),
        other => panic!("expected an initialization failure, got {other:?}"),
    }
}

#[test]
fn invalid_config_is_rejected_before_any_context_exists() {
    let backend = HeadlessBackend::new();
    let result = ViewerEngine::initialize(
        ViewerConfig {
            fov_deg: 0.0,
            ..ViewerConfig::default()
        },
        Box::new(figura_io::ScriptedSource::new()),
        Box::new(backend.clone()),
        640,
        480,
    );
    assert!(matches!(result, Err(ViewerError::Config(_))));
    assert_eq!(backend.stats().contexts_created, 0);
}

#[test]
fn a_context_lost_while_uploading_a_swap_keeps_the_new_model() -> Result<()> {
    let mut h = Harness::new(ViewerConfig::default())?;
    h.add_mannequin("a.vrm", 1.0);
    h.add_mannequin("b.vrm", 1.8);
    h.load_model("a.vrm")?;
    assert!(h.engine.toggle_skeleton()?);
    h.engine.drain_events();

    h.engine.load_model("b.vrm");
    h.source.resolve("b.vrm");
    h.backend.drop_context();
    h.engine.frame(FRAME)?;

    assert_eq!(h.engine.state(), EngineState::Paused);
    assert_eq!(h.engine.model().map(|m| m.url.as_str()), Some("b.vrm"));
    let events = h.engine.drain_events();
    assert!(events.contains(&ViewerEvent::ContextLost));
    assert!(!events.iter().any(|event| matches!(event, ViewerEvent::LoadFailed(_))));

    h.engine.context_restored()?;
    h.engine.frame(FRAME)?;
    assert!(h.engine.skeleton().is_some());
    assert!(h.engine.particles().is_some());
    let stats = h.backend.stats();
    assert_eq!(stats.live_meshes.len(), h.mesh_nodes());
    assert_eq!(stats.stale_draws, 0);
    assert_eq!(stats.double_releases, 0);
    Ok(())
}

#[test]
fn context_loss_pauses_and_restore_reuploads_without_refetching() -> Result<()> {
    let mut h = Harness::new(ViewerConfig::default())?;
    h.add_mannequin("a.vrm", 1.7);
    h.add_texture("sky.png");
    h.load_model("a.vrm")?;
    h.engine.set_environment("sky.png");
    h.source.resolve("sky.png");
    h.run(2, FRAME)?;
    let requested = h.source.requested();

    h.backend.lose_context();
    h.engine.frame(FRAME)?;
    assert_eq!(h.engine.state(), EngineState::Paused);
    assert!(h.engine.drain_events().contains(&ViewerEvent::ContextLost));
    let paused_at = h.engine.elapsed();
    h.run(10, FRAME)?;
    assert_eq!(h.engine.elapsed(), paused_at);

    h.engine.context_restored()?;
    assert_eq!(h.engine.state(), EngineState::Running);
    assert!(h.engine.drain_events().contains(&ViewerEvent::ContextRestored));
    assert_eq!(h.source.requested(), requested);

    h.engine.frame(FRAME)?;
    let stats = h.backend.stats();
    assert_eq!(stats.live_meshes.len(), h.mesh_nodes());
    assert_eq!(stats.last_draw_count, h.mesh_nodes());
    assert_eq!(stats.stale_draws, 0);
    assert_eq!(stats.live_textures.len(), 1);
    assert!(matches!(h.engine.environment(), Some((_, Some(_)))));
    Ok(())
}

#[test]
fn teardown_releases_everything_exactly_once() -> Result<()> {
    let mut h = Harness::new(ViewerConfig::default())?;
    h.add_mannequin("a.vrm", 1.7);
    h.add_mannequin("b.vrm", 1.2);
    h.add_texture("sky.png");
    h.add_wave();
    h.engine.dispatch(ViewerCommand::ToggleSkeleton)?;
    h.engine.dispatch(ViewerCommand::ToggleRuler)?;
    h.engine.dispatch(ViewerCommand::ToggleWireframe)?;
    h.load_model("a.vrm")?;
    h.load_wave()?;
    h.load_model("b.vrm")?;
    h.engine.set_environment("sky.png");
    h.source.resolve("sky.png");
    h.run(5, FRAME)?;
    assert!(h.backend.stats().live_meshes.len() > 2);

    h.engine.teardown();
    let stats = h.backend.stats();
    assert!(stats.live_meshes.is_empty());
    assert!(stats.live_textures.is_empty());
    assert_eq!(stats.double_releases, 0);
    assert!(!stats.context_live);
    assert_eq!(h.engine.state(), EngineState::TornDown);

    h.engine.teardown();
    h.engine.frame(FRAME)?;
    drop(h.engine);
    let after = h.backend.stats();
    assert_eq!(after.double_releases, 0);
    assert_eq!(after.mesh_releases, stats.mesh_releases);
    Ok(())
}

#[test]
fn swapping_models_frees_the_old_one_first() -> Result<()> {
    let mut h = Harness::quiet()?;
    h.add_mannequin("a.vrm", 1.0);
    h.add_mannequin("b.vrm", 2.0);
    h.engine.dispatch(ViewerCommand::ToggleSkeleton)?;
    h.load_model("a.vrm")?;
    let with_a = (h.backend.stats().live_meshes.len(), h.engine.graph().len());
    let old_root = h.engine.model().map(|m| m.root);
    h.load_model("b.vrm")?;
    let stats = h.backend.stats();
    assert_eq!((stats.live_meshes.len(), h.engine.graph().len()), with_a);
    assert_eq!(stats.double_releases, 0);
    assert!(old_root.is_some_and(|root| !h.engine.graph().contains(root)));
    Ok(())
}

#[test]
fn metadata_callback_fires_once_per_load() -> Result<()> {
    let mut h = Harness::quiet()?;
    h.add_mannequin("a.vrm", 1.6);
    let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&seen);
    h.engine.on_metadata(move |metadata| {
        sink.borrow_mut()
            .push((metadata.url.clone(), metadata.triangle_count));
    });
    h.load_model("a.vrm")?;
    assert_eq!(*seen.borrow(), vec![("a.vrm".to_string(), 180)]);
    Ok(())
}

#[test]
fn animation_selection_out_of_range_is_an_error() -> Result<()> {
    let mut h = Harness::new(ViewerConfig {
        particle_count: 0,
        animations: vec![AnimationEntry {
            name: "wave".to_string(),
            url: REFERENCE_ANIMATION_URL.to_string(),
        }],
        ..ViewerConfig::default()
    })?;
    h.add_mannequin("a.vrm", 1.0);
    h.add_wave();
    h.load_model("a.vrm")?;
    h.engine.select_animation(0)?;
    h.source.resolve(REFERENCE_ANIMATION_URL);
    h.engine.frame(FRAME)?;
    assert!(h.engine.player().is_some());
    h.engine.drain_events();

    let err = h.engine.dispatch(ViewerCommand::SelectAnimation(3));
    assert_eq!(err, Err(ViewerError::AnimationIndex { index: 3, len: 1 }));
    assert_eq!(
        h.engine.drain_events(),
        vec![ViewerEvent::AnimationFailed(ViewerError::AnimationIndex {
            index: 3,
            len: 1
        })]
    );
    assert!(h.engine.player().is_some());
    Ok(())
}

#[test]
fn a_parsed_animation_is_fetched_once() -> Result<()> {
    let mut h = Harness::quiet()?;
    h.add_mannequin("a.vrm", 1.0);
    h.add_wave();
    h.load_model("a.vrm")?;
    h.load_wave()?;
    h.engine.load_animation(REFERENCE_ANIMATION_URL);
    h.engine.frame(FRAME)?;

    let fetched = h
        .source
        .requested()
        .iter()
        .filter(|url| url.as_str() == REFERENCE_ANIMATION_URL)
        .count();
    assert_eq!(fetched, 1);
    let started = h
        .engine
        .drain_events()
        .into_iter()
        .filter(|event| matches!(event, ViewerEvent::AnimationStarted { .. }))
        .count();
    assert_eq!(started, 2);
    Ok(())
}

#[test]
fn an_animation_chosen_before_any_model_binds_on_load() -> Result<()> {
    let mut h = Harness::quiet()?;
    h.add_mannequin("a.vrm", 1.0);
    h.add_wave();
    h.load_wave()?;
    assert!(h.engine.player().is_none());

    h.load_model("a.vrm")?;
    assert!(h.engine.player().is_some());
    assert!(
        h.engine
            .drain_events()
            .iter()
            .any(|event| matches!(event, ViewerEvent::AnimationStarted { name, .. } if name == "wave"))
    );
    Ok(())
}
