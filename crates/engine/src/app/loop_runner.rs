use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::metrics::MetricsAccumulator;
use super::{MetricsHandle, SessionHandle};

pub const SLOW_FRAME_ENV_VAR: &str = "MOONWALK_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_fps: u32,
    /// Real frame intervals above this are reported as stalls.
    pub max_frame_delta: Duration,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            max_frame_delta: Duration::from_millis(250),
            metrics_log_interval: Duration::from_secs(5),
            simulated_slow_frame_ms: 0,
        }
    }
}

/// Ticks `session` at the configured rate until `stop` is set.
///
/// Runs on the calling thread. Returns the number of frames executed.
pub fn run_frame_loop(
    session: &SessionHandle,
    config: &LoopConfig,
    stop: &AtomicBool,
    metrics_handle: &MetricsHandle,
) -> u64 {
    let target_fps = config.target_fps.max(1);
    let frame_target = target_frame_duration(target_fps);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(5));
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    info!(
        target_fps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        "loop_config"
    );

    let mut frames = 0u64;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval, last_frame_instant);

    while !stop.load(Ordering::Relaxed) {
        let frame_start = Instant::now();
        let raw_frame_dt = frame_start.saturating_duration_since(last_frame_instant);
        last_frame_instant = frame_start;

        if slow_frame_delay > Duration::ZERO {
            // Debug perturbation only; the machine clamps its own step.
            thread::sleep(slow_frame_delay);
        }

        let stalled = clamp_frame_delta(raw_frame_dt, max_frame_delta) < raw_frame_dt;
        if stalled {
            warn!(
                frame_dt_ms = raw_frame_dt.as_millis() as u64,
                max_frame_delta_ms = max_frame_delta.as_millis() as u64,
                "frame_stall"
            );
        }

        let tick_start = Instant::now();
        session.tick();
        let tick_time = tick_start.elapsed();
        frames = frames.saturating_add(1);
        metrics_accumulator.record_frame(tick_time, stalled);

        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(Instant::now()) {
            metrics_handle.publish(snapshot);
            info!(
                fps = snapshot.fps,
                tick_time_ms = snapshot.tick_time_ms,
                max_tick_time_ms = snapshot.max_tick_time_ms,
                stalled_frames = snapshot.stalled_frames,
                "loop_metrics"
            );
        }

        let cap_sleep = compute_cap_sleep(frame_start.elapsed(), frame_target);
        if cap_sleep > Duration::ZERO {
            thread::sleep(cap_sleep);
        }
    }

    info!(frames, "frame_loop_stopped");
    frames
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn target_frame_duration(target_fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1)))
}

fn compute_cap_sleep(elapsed: Duration, target: Duration) -> Duration {
    target.saturating_sub(elapsed)
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}
