use std::sync::mpsc::{self, Receiver, Sender};

use rhythm_engine::{LoopConfig, MetricsHandle, MonotonicClock, RunMachine, SessionHandle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::admin::AdminStore;
use super::config::{load_game_config_from_env, resolve_target_fps, ConfigResult, GameConfig};
use super::executor::AdminExecutor;

/// Messages from the stdin reader and the frame loop to the main thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FrontEndEvent {
    Line(String),
    Eof,
    RunEnded,
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) session: SessionHandle,
    pub(crate) metrics: MetricsHandle,
    pub(crate) executor: AdminExecutor,
    pub(crate) events_tx: Sender<FrontEndEvent>,
    pub(crate) events_rx: Receiver<FrontEndEvent>,
}

pub(crate) fn build_app() -> ConfigResult<AppWiring> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "=== Moonwalk Mania Startup ===");

    let game_config = load_game_config_from_env()?;
    let (events_tx, events_rx) = mpsc::channel();
    let machine = build_machine(&game_config, events_tx.clone())?;
    let admin = AdminStore::new(machine.catalog(), game_config.admin_access_code());
    let session = SessionHandle::new(machine);
    let metrics = MetricsHandle::default();
    let executor = AdminExecutor::new(
        session.clone(),
        metrics.clone(),
        admin,
        game_config.validated_tuning()?,
    );
    let config = LoopConfig {
        target_fps: resolve_target_fps(),
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        session,
        metrics,
        executor,
        events_tx,
        events_rx,
    })
}

fn build_machine(
    game_config: &GameConfig,
    events_tx: Sender<FrontEndEvent>,
) -> ConfigResult<RunMachine> {
    let catalog = game_config.build_catalog()?;
    let tuning = game_config.validated_tuning()?;
    let mut machine = RunMachine::new(catalog, tuning, MonotonicClock::new());

    if let Some(level_id) = game_config.start_level_id {
        machine
            .select_level(level_id)
            .map_err(|error| format!("start_level_id: {error}"))?;
    }
    if let Some(track_id) = game_config.start_track_id.as_deref() {
        machine
            .select_track(track_id)
            .map_err(|error| format!("start_track_id: {error}"))?;
    }

    // Runs under the session lock; only forwards a message.
    machine.on_end(move || {
        let _ = events_tx.send(FrontEndEvent::RunEnded);
    });

    info!(
        levels = machine.catalog().levels().len(),
        tracks = machine.catalog().tracks().len(),
        level_id = machine.selected_level_id(),
        track_id = machine.selected_track_id(),
        "machine_ready"
    );
    Ok(machine)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
