//! Integration tests for backend selection, fallback and toggling.

mod common;

use common::{gl_host, RefusingHost};
use trimode_core::{Mode, PointerEvent, SurfaceEvent, Translation};
use trimode_renderer::{
    Engine, EngineConfig, EngineError, HeadlessConfig, HeadlessHost, RenderBackend, RenderError,
};

fn config(initial_mode: Mode) -> EngineConfig {
    EngineConfig {
        initial_mode,
        ..EngineConfig::default()
    }
}

// ==========================================================================
// Selection and fallback
// ==========================================================================

#[tokio::test]
async fn test_absent_accelerated_selects_rasterized() {
    let (host, gl) = gl_host(false);
    let mut engine = Engine::new(host, EngineConfig::default());

    assert_eq!(engine.init_engine().await.unwrap(), Mode::Rasterized);
    assert!(engine.fallback_active());
    assert_eq!(gl.contexts(), 1);
    assert_eq!(engine.host().surfaces_created(), 1);

    assert!(engine.frame());
    assert_eq!(gl.draws(), 1);
}

#[tokio::test]
async fn test_accelerated_failure_falls_back_on_fresh_surface() {
    let (host, _gl) = gl_host(true);
    let mut engine = Engine::new(host, EngineConfig::default());
    assert_eq!(engine.mode(), Mode::Accelerated);
    assert!(!engine.fallback_active());

    // Headless surfaces never offer an accelerated context.
    assert_eq!(engine.init_engine().await.unwrap(), Mode::Rasterized);
    assert!(engine.fallback_active());
    assert_eq!(engine.host().surfaces_created(), 2);
    assert_eq!(
        engine.host().current().claimed_context(),
        Some(Mode::Rasterized)
    );
}

#[tokio::test]
async fn test_fallback_chain_reaches_software() {
    let host = HeadlessHost::new(HeadlessConfig {
        accelerated_present: true,
        ..HeadlessConfig::default()
    });
    let mut engine = Engine::new(host, EngineConfig::default());

    assert_eq!(engine.init_engine().await.unwrap(), Mode::Software);
    assert!(engine.fallback_active());
    assert_eq!(engine.host().surfaces_created(), 3);
    assert!(engine.frame());
    assert!(engine.host().current().last_frame().is_some());
}

#[tokio::test]
async fn test_exhausted_chain_reports_attempts() {
    let mut engine = Engine::new(RefusingHost::new(true), EngineConfig::default());
    let err = engine.init_engine().await.unwrap_err();

    assert!(matches!(err, EngineError::Exhausted { attempts: 3, .. }));
    assert!(engine.active_backend().is_none());
    assert_eq!(engine.host().recreated, 2);
    assert!(!engine.frame());
}

#[tokio::test]
async fn test_exhausted_from_rasterized_start() {
    let mut engine = Engine::new(RefusingHost::new(false), EngineConfig::default());
    let err = engine.init_engine().await.unwrap_err();
    assert!(matches!(err, EngineError::Exhausted { attempts: 2, .. }));
}

#[tokio::test]
async fn test_resource_failure_does_not_fall_back() {
    let (host, gl) = gl_host(false);
    gl.fail_compile.set(true);
    let mut engine = Engine::new(host, config(Mode::Rasterized));

    let err = engine.init_engine().await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Render(RenderError::ResourceCreationFailed(_))
    ));
    assert_eq!(engine.mode(), Mode::Rasterized);
    assert!(engine.active_backend().is_none());
    assert_eq!(engine.host().surfaces_created(), 1);
}

// ==========================================================================
// Toggling
// ==========================================================================

#[tokio::test]
async fn test_toggle_cycle_closes_with_absent_accelerated() {
    let (host, gl) = gl_host(false);
    let mut engine = Engine::new(host, config(Mode::Rasterized));
    engine.init_engine().await.unwrap();

    let first = engine.host().current();
    // The accelerated slot builds rasterized without an accelerated attempt.
    assert_eq!(engine.toggle_mode().await.unwrap(), Mode::Rasterized);
    assert_eq!(engine.selected_mode(), Mode::Accelerated);
    assert!(engine.fallback_active());
    assert_eq!(first.listener_count(), 0);
    assert_eq!(engine.host().surfaces_created(), 2);
    assert_eq!(gl.contexts(), 2);

    let second = engine.host().current();
    assert_ne!(first.generation(), second.generation());
    assert_eq!(second.claimed_context(), Some(Mode::Rasterized));

    assert_eq!(engine.toggle_mode().await.unwrap(), Mode::Software);
    assert_eq!(engine.selected_mode(), Mode::Software);
    assert_eq!(second.listener_count(), 0);

    assert_eq!(engine.toggle_mode().await.unwrap(), Mode::Rasterized);
    assert_eq!(engine.selected_mode(), Mode::Rasterized);
    // One fresh surface per toggle, none spent on accelerated attempts.
    assert_eq!(engine.host().surfaces_created(), 4);
    assert_eq!(
        engine.host().current().claimed_context(),
        Some(Mode::Rasterized)
    );
}

#[tokio::test]
async fn test_toggle_to_failing_accelerated_falls_back() {
    let (host, _gl) = gl_host(true);
    let mut engine = Engine::new(host, config(Mode::Rasterized));
    engine.init_engine().await.unwrap();
    assert!(!engine.fallback_active());

    assert_eq!(engine.toggle_mode().await.unwrap(), Mode::Rasterized);
    assert_eq!(engine.selected_mode(), Mode::Accelerated);
    assert!(engine.fallback_active());

    // The next toggle leaves the accelerated slot instead of retrying it.
    assert_eq!(engine.toggle_mode().await.unwrap(), Mode::Software);
}

#[tokio::test]
async fn test_toggle_resets_translation() {
    let (host, _gl) = gl_host(false);
    let mut engine = Engine::new(host, config(Mode::Software));
    engine.init_engine().await.unwrap();

    let surface = engine.host().current();
    surface.dispatch(&SurfaceEvent::Pointer(PointerEvent::down(320.0, 200.0)));
    surface.dispatch(&SurfaceEvent::Pointer(PointerEvent::moved(400.0, 250.0)));
    assert_eq!(
        engine.translation(),
        Some(Translation { x: 0.25, y: -0.25 })
    );

    engine.toggle_mode().await.unwrap();
    assert_eq!(engine.translation(), Some(Translation::default()));
}

#[tokio::test]
async fn test_toggle_option_rebuilds_backend() {
    let (host, gl) = gl_host(false);
    let mut engine = Engine::new(host, config(Mode::Rasterized));
    engine.init_engine().await.unwrap();
    engine.frame();

    assert!(!engine.toggle_option("antialias").await.unwrap());
    assert!(!engine.config().options.antialias);
    assert_eq!(engine.mode(), Mode::Rasterized);
    assert_eq!(engine.host().surfaces_created(), 2);
    assert_eq!(gl.contexts(), 2);

    let backend = engine.active_backend().unwrap();
    assert!(backend.is_running());
    assert_eq!(backend.frames_rendered(), 0);

    assert!(engine.toggle_option("highPerformance").await.unwrap());
    assert!(engine.config().options.high_performance);
}

#[tokio::test]
async fn test_unknown_option_leaves_backend_running() {
    let (host, gl) = gl_host(false);
    let mut engine = Engine::new(host, config(Mode::Rasterized));
    engine.init_engine().await.unwrap();

    assert!(matches!(
        engine.toggle_option("stencil").await,
        Err(EngineError::UnknownOption(_))
    ));
    assert!(engine.status().running);
    assert!(engine.frame());
    assert_eq!(gl.contexts(), 1);
}

#[tokio::test]
async fn test_dispose_before_create_on_toggle() {
    let (host, gl) = gl_host(false);
    let mut engine = Engine::new(host, config(Mode::Rasterized));
    engine.init_engine().await.unwrap();
    engine.frame();

    // Rasterized again from the accelerated slot, then software.
    engine.toggle_mode().await.unwrap();
    engine.frame();
    engine.toggle_mode().await.unwrap();
    // Every GL object of both rasterized backends was released.
    assert_eq!(gl.live_objects(), 0);
    assert_eq!(engine.mode(), Mode::Software);
}
