mod config;
mod device;
mod metrics;
mod scene;

use crate::config::Config;
use crate::device::SimulatedDevice;
use crate::metrics::SimMetrics;
use crate::scene::SphereScene;
use clap::Parser;
use glam::{Quat, Vec3};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stereo_core::{
    CameraNavigator, CameraRig, CoordinateSpace, StereoCore, StylusInput, StylusManipulator,
    TargetType, TickMode, TrackerEvent,
};
use tracing_subscriber::{fmt, EnvFilter};

/// Buttons 0 and 1 grab; the third one recenters the view on the stylus.
const FOCUS_BUTTON: usize = 2;
/// Each tap alternately zooms in and back out by this factor.
const ZOOM_FACTOR: f32 = 1.25;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Initialization ---
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();
    let config = Config::parse();
    config.validate()?;
    tracing::info!(config = ?config, "Stereo simulator starting with configuration");

    let session_id = uuid::Uuid::new_v4().to_string();
    let seed = config.seed.unwrap_or_else(rand::random);
    let mode = TickMode::from(config.mode);

    let mut device = SimulatedDevice::new(
        seed,
        config.head_present_secs,
        config.head_absent_secs,
        config.failure_rate,
    );
    let mut core = StereoCore::new(config.core_config(), &device)?;
    tracing::info!(session_id, seed, ?mode, "Core initialized");

    let mut navigator = CameraNavigator::new(*core.geometry());
    let mut rig =
        CameraRig::looking_at(core.geometry(), Vec3::ZERO, Quat::IDENTITY, config.viewer_scale);
    core.set_reference_camera(Some(rig.camera));
    let mut zoomed_in = false;

    let mut manipulator = StylusManipulator::new();
    let mut scene: Option<SphereScene> = None;

    let metrics = Arc::new(SimMetrics::new(&session_id)?);

    // --- 2. Start Metrics Server ---
    if let Some(addr) = &config.metrics_listen_addr {
        let metrics_addr: std::net::SocketAddr = addr.parse()?;
        let listener = tokio::net::TcpListener::bind(metrics_addr).await?;
        let metrics_router = metrics.router();
        tokio::spawn(async move {
            tracing::info!(addr = %metrics_addr, "Metrics server started");
            if let Err(e) = axum::serve(listener, metrics_router.into_make_service()).await {
                tracing::error!(error = %e, "Metrics server exited with an error");
            }
        });
    }

    // --- 3. Main Render Loop ---
    let deadline = config
        .duration_secs
        .map(|secs| tokio::time::Instant::now() + Duration::from_secs_f64(secs));
    let run_limit = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(run_limit);

    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / config.tick_hz as f64));
    let mut last_tick = Instant::now();

    tracing::info!("Starting render loop...");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received.");
                break;
            },
            _ = &mut run_limit => {
                tracing::info!("Run duration elapsed.");
                break;
            },
            _ = interval.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last_tick).as_secs_f32();
                last_tick = now;

                device.advance(dt as f64);
                navigator.tick(dt, &mut rig);
                core.set_reference_camera(Some(rig.camera));

                let report = match core.tick(dt, mode, &device) {
                    Ok(report) => report,
                    Err(e) => {
                        metrics.frame_errors_total.inc();
                        tracing::warn!(error = %e, frame = core.frame(), "Skipping frame");
                        continue;
                    }
                };

                if let Some(change) = report.transition {
                    tracing::debug!(
                        from = %change.from,
                        to = %change.to,
                        head_in_volume = device.head_visible(),
                        "Frustum transition"
                    );
                }
                metrics.record_tick(
                    &report,
                    core.auto_stereo_state(),
                    core.frustum().ipd,
                    core.is_target_visible(TargetType::Head),
                );

                for event in &report.events {
                    tracing::debug!(
                        kind = event.kind(),
                        target = %event.target(),
                        position = ?event.world_pose().position(),
                        "Tracker event"
                    );
                    let navigated =
                        navigate_on(event, &core, &mut navigator, &rig, &mut zoomed_in);
                    if let Err(e) = navigated {
                        tracing::warn!(error = %e, "Ignoring navigation request");
                    }
                }

                let stylus = StylusInput::of(core.target(TargetType::Primary));
                let scene = scene.get_or_insert_with(|| {
                    SphereScene::in_front_of(&stylus.pose, rig.viewer_scale)
                });
                if let Some(change) = manipulator.update(&stylus, rig.viewer_scale, scene) {
                    tracing::info!(?change, beam_end = ?manipulator.beam().end, "Stylus grab");
                    metrics.record_grab(&change);
                }
            }
        }
    }

    tracing::info!(frames = core.frame(), "Stereo simulator shutting down.");
    Ok(())
}

/// Maps stylus taps and the focus button onto camera navigation.
fn navigate_on(
    event: &TrackerEvent,
    core: &StereoCore,
    navigator: &mut CameraNavigator,
    rig: &CameraRig,
    zoomed_in: &mut bool,
) -> stereo_core::Result<()> {
    match *event {
        TrackerEvent::TapPress { target: TargetType::Primary, .. } => {
            navigator.set_geometry(*core.geometry());
            let factor = if *zoomed_in { 1.0 / ZOOM_FACTOR } else { ZOOM_FACTOR };
            *zoomed_in = !*zoomed_in;
            navigator.zoom(rig, factor)
        }
        TrackerEvent::ButtonPress {
            target: TargetType::Primary,
            button: FOCUS_BUTTON,
            world_pose,
        } => {
            navigator.set_geometry(*core.geometry());
            tracing::info!(
                focus = ?world_pose.position(),
                stale = core.registry().is_stale(CoordinateSpace::Tracker, CoordinateSpace::World),
                "Focusing on stylus"
            );
            navigator.focus_on(rig, world_pose.position())
        }
        _ => Ok(()),
    }
}
