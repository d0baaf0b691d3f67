//! Headless application tests.
//!
//! Runs the full visualization loop on the dummy device and checks the
//! journal for lifetime violations and leaks.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vista-app --test headless
//! ```

use rstest::rstest;

use vista_app::scene::LightEdit;
use vista_app::{DefaultAppArgs, TickOutcome, VisualizationApp};
use vista_graphics::{DummyEvent, Extent2d, TargetState};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[rstest]
#[case::single(1, 1)]
#[case::double(2, 1)]
#[case::triple(3, 1)]
#[case::double_msaa(2, 4)]
#[case::triple_msaa(3, 4)]
fn test_scripted_session(#[case] frames_in_flight: usize, #[case] sample_count: u32) {
    init_logging();
    let args = DefaultAppArgs::default()
        .with_frames_in_flight(frames_in_flight)
        .with_sample_count(sample_count)
        .with_resize_debounce(2)
        .with_resize(1024, 768, 5)
        .with_resize(1000, 700, 6)
        .with_resize(800, 600, 7)
        .with_resize(0, 0, 20)
        .with_resize(640, 480, 30)
        .with_surface_loss(25)
        .with_surface_loss(26)
        .with_reload(12)
        .with_reload(13);

    let mut app = VisualizationApp::new(&args).unwrap();
    app.run(60).unwrap();

    assert_eq!(app.targets().extent(), Extent2d::new(640, 480));
    assert_eq!(app.targets().current().state(), TargetState::Current);
    let backend = std::sync::Arc::clone(app.backend());
    assert!(backend.hazards().is_empty(), "{:?}", backend.hazards());

    let stats = app.shutdown().unwrap();
    assert_eq!(stats.frames, 58);
    assert_eq!(stats.skipped_frames, 2);
    assert_eq!(stats.rebuilds, 2);
    assert_eq!(stats.skipped_rebuilds, 1);
    assert_eq!(stats.reloads, 2);

    assert_eq!(backend.live_count(), 0, "{:?}", backend.live_resources());
    assert!(backend.hazards().is_empty());
}

#[test]
fn test_skipped_tick_submits_nothing() {
    init_logging();
    let args = DefaultAppArgs::default().with_surface_loss(1);
    let mut app = VisualizationApp::new(&args).unwrap();

    assert!(matches!(app.tick().unwrap(), TickOutcome::Rendered(_)));
    assert_eq!(app.tick().unwrap(), TickOutcome::Skipped);
    assert_eq!(app.backend().submission_count(), 1);

    match app.tick().unwrap() {
        TickOutcome::Rendered(tick) => assert_eq!(tick.slot.index(), 1),
        TickOutcome::Skipped => panic!("surface should be back"),
    }
}

#[test]
fn test_reload_retires_old_pipeline() {
    init_logging();
    let mut app = VisualizationApp::new(&DefaultAppArgs::default()).unwrap();
    let old = app.shape_pipeline().unwrap();

    app.tick().unwrap();
    let new = app.reload_pipeline().unwrap();
    assert_ne!(old, new);
    assert!(app.backend().is_live(old));

    for _ in 0..3 {
        app.tick().unwrap();
    }
    assert!(!app.backend().is_live(old));
    assert!(app.backend().is_live(new));

    let last = app.backend().last_submission().unwrap();
    assert!(last.referenced_resources().contains(&new.into()));
}

#[test]
fn test_light_edit_reaches_every_slot() {
    init_logging();
    let args = DefaultAppArgs::default().with_frames_in_flight(3);
    let mut app = VisualizationApp::new(&args).unwrap();
    app.edit_light(LightEdit::Ambient(0.75));

    for _ in 0..3 {
        app.tick().unwrap();
    }

    let replicas = app.light_uniform().resource().replicas().to_vec();
    for replica in replicas {
        let bytes = app.backend().buffer_contents(replica).unwrap();
        let light: vista_app::scene::LightUniform = bytemuck::pod_read_unaligned(&bytes);
        assert_eq!(light.ambient_strength, 0.75);
    }
}

#[test]
fn test_drop_without_shutdown_leaks_nothing() {
    init_logging();
    let args = DefaultAppArgs::default().with_resize(300, 200, 0).with_reload(1);
    let mut app = VisualizationApp::new(&args).unwrap();
    app.run(4).unwrap();
    let backend = std::sync::Arc::clone(app.backend());
    drop(app);

    assert_eq!(backend.live_count(), 0);
    assert!(backend.hazards().is_empty());
    assert!(backend.journal().contains(&DummyEvent::WaitIdle));
}
