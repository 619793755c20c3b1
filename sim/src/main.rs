//! Simulated device loop.
//!
//! A dedicated thread plays the part of the haptic scheduler: every
//! millisecond it samples a synthetic stylus position and runs one tick of
//! the constraint controller. The main thread arms and clears constraints
//! on a fixed script, the way an application thread would.

use serde::Serialize;
use snap_core::{channel, Constraint, ConstraintResult, ControlHandle, Point3, SnapConfig, TickHandle, Vector3};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TICK: Duration = Duration::from_millis(1);
const STEP: Duration = Duration::from_millis(400);

/// Counters written by the tick thread and read by the main thread.
#[derive(Default)]
struct TickStats {
    ticks: AtomicU64,
    engaged: AtomicU64,
    late: AtomicU64,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    ticks: u64,
    engaged_ticks: u64,
    late_ticks: u64,
    final_proxy: [f64; 3],
}

fn load_config() -> SnapConfig {
    let Some(path) = std::env::args().nth(1) else {
        return SnapConfig::default();
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => match SnapConfig::from_json(&text) {
            Ok(config) => {
                info!("Loaded config from {}", path);
                config
            }
            Err(e) => {
                warn!("Invalid config {}: {}; using defaults", path, e);
                SnapConfig::default()
            }
        },
        Err(e) => {
            warn!("Could not read {}: {}; using defaults", path, e);
            SnapConfig::default()
        }
    }
}

/// Stylus position at time `t` seconds: a slow circle in the XY plane
/// with a small vertical wobble.
fn stylus(t: f64) -> Point3 {
    Point3::new(3.0 * t.cos(), 3.0 * t.sin(), 0.5 * (3.0 * t).sin())
}

fn run_device(mut tick: TickHandle, stats: Arc<TickStats>, stop: Arc<AtomicBool>) -> TickHandle {
    let start = Instant::now();
    let mut deadline = start + TICK;
    while !stop.load(Ordering::Acquire) {
        let t = start.elapsed().as_secs_f64();
        if tick.update_constraint(stylus(t)) {
            stats.engaged.fetch_add(1, Ordering::Relaxed);
        }
        stats.ticks.fetch_add(1, Ordering::Relaxed);

        let now = Instant::now();
        if now > deadline {
            stats.late.fetch_add(1, Ordering::Relaxed);
        } else {
            thread::sleep(deadline - now);
        }
        deadline += TICK;
    }
    tick
}

fn script(config: &SnapConfig) -> ConstraintResult<Vec<Constraint>> {
    Ok(vec![
        Constraint::point(Point3::new(3.0, 0.0, 0.0), config)?,
        Constraint::line(Point3::origin(), Point3::new(0.0, 1.0, 0.0), config)?,
        Constraint::plane(Point3::origin(), Vector3::z(), config)?.with_snap_distance(1.0)?,
        Constraint::point(Point3::origin(), config)?.with_anti(true).with_snap_distance(4.0)?,
    ])
}

fn drive(control: &mut ControlHandle, constraints: Vec<Constraint>, stats: &TickStats) {
    for constraint in constraints {
        control.set_constraint(constraint);
        thread::sleep(STEP);
        let reclaimed = control.collect();
        info!(
            "state={:?} ticks={} engaged={} reclaimed={}",
            control.state(),
            stats.ticks.load(Ordering::Relaxed),
            stats.engaged.load(Ordering::Relaxed),
            reclaimed
        );
    }
    control.clear_constraint();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config();
    let constraints = match script(&config) {
        Ok(constraints) => constraints,
        Err(e) => {
            warn!("Could not build constraints: {}", e);
            return;
        }
    };

    let (mut control, tick) = channel();
    let stats = Arc::new(TickStats::default());
    let stop = Arc::new(AtomicBool::new(false));

    let device = {
        let stats = Arc::clone(&stats);
        let stop = Arc::clone(&stop);
        thread::Builder::new()
            .name("device-loop".into())
            .spawn(move || run_device(tick, stats, stop))
    };
    let device = match device {
        Ok(handle) => handle,
        Err(e) => {
            warn!("Could not start device loop: {}", e);
            return;
        }
    };

    info!("snap-core {} running at 1 kHz", snap_core::version());
    drive(&mut control, constraints, &stats);

    stop.store(true, Ordering::Release);
    let mut tick = match device.join() {
        Ok(tick) => tick,
        Err(_) => {
            warn!("Device loop panicked");
            return;
        }
    };
    tick.poll();
    control.collect();

    let proxy = tick.constrained_proxy();
    let summary = RunSummary {
        ticks: stats.ticks.load(Ordering::Relaxed),
        engaged_ticks: stats.engaged.load(Ordering::Relaxed),
        late_ticks: stats.late.load(Ordering::Relaxed),
        final_proxy: [proxy.x, proxy.y, proxy.z],
    };
    match serde_json::to_string(&summary) {
        Ok(json) => info!("summary {}", json),
        Err(e) => warn!("Could not serialize summary: {}", e),
    }
}
