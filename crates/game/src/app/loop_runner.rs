use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use super::bootstrap::AppWiring;
use super::demo_scene::DemoScene;
use super::input::InputCollector;
use super::metrics::FrameMetricsAccumulator;
use super::presenter::FramePresenter;

const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);
const METRICS_LOG_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_demo(app) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run_demo(app: AppWiring) -> Result<(), AppError> {
    let window_config = &app.config.window;
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(window_config.title.clone())
            .with_inner_size(LogicalSize::new(
                window_config.width as f64,
                window_config.height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut presenter =
        FramePresenter::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    let mut scene = DemoScene::new(&app.config, presenter.viewport());
    scene.load();

    event_loop.set_control_flow(ControlFlow::Poll);

    let render_frame_target = target_frame_duration(window_config.target_fps);
    info!(
        width = presenter.viewport().width,
        height = presenter.viewport().height,
        target_fps = window_config.target_fps,
        max_frame_delta_ms = MAX_FRAME_DELTA.as_millis() as u64,
        "loop_config"
    );

    let mut input_collector = InputCollector::default();
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics = FrameMetricsAccumulator::new(METRICS_LOG_INTERVAL, Instant::now());

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = presenter.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                        return;
                    }
                    scene.resize(presenter.viewport());
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;
                    let frame_dt = clamp_frame_delta(raw_frame_dt, MAX_FRAME_DELTA);
                    metrics.record_frame(frame_dt);

                    if input_collector.take_lighting_toggle_pressed() {
                        scene.toggle_lighting();
                    }
                    let work = scene.update(frame_dt.as_secs_f32(), input_collector.actions());
                    metrics.record_scene_work(work.lighting_recomputed, work.fog_updated);

                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    if let Err(error) = presenter.present(scene.render()) {
                        warn!(error = %error, "render_failed");
                        window_target.exit();
                        return;
                    }
                    last_present_instant = Instant::now();

                    if let Some(snapshot) = metrics.maybe_snapshot(last_present_instant) {
                        let timings = scene.lighting().timings();
                        info!(
                            fps = snapshot.fps,
                            frame_time_ms = snapshot.frame_time_ms,
                            lighting_recomputes = snapshot.lighting_recomputes,
                            fog_updates = snapshot.fog_updates,
                            lighting_avg_ms = timings.avg_ms,
                            lighting_max_ms = timings.max_ms,
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            Event::LoopExiting => {
                scene.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn target_frame_duration(target_fps: u32) -> Option<Duration> {
    (target_fps > 0).then(|| Duration::from_secs_f64(1.0 / target_fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let raw_frame_dt = Duration::from_millis(600);
        assert_eq!(clamp_frame_delta(raw_frame_dt, MAX_FRAME_DELTA), MAX_FRAME_DELTA);
    }

    #[test]
    fn zero_target_fps_disables_the_cap() {
        assert_eq!(target_frame_duration(0), None);
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(1), target_frame_duration(0)),
            Duration::ZERO
        );
    }

    #[test]
    fn compute_cap_sleep_zero_when_over_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(20), target_frame_duration(60));
        assert_eq!(sleep, Duration::ZERO);
    }

    #[test]
    fn compute_cap_sleep_positive_when_under_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(5), target_frame_duration(60));
        assert!(sleep > Duration::ZERO);
    }
}
