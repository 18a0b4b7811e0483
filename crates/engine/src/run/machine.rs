use std::fmt;

use tracing::{debug, info};

use crate::content::{Catalog, Direction, LevelConfig, SelectionError, TrackProfile};

use super::clock::Clock;
use super::cue::{expire_cues, CueView};
use super::judgment::{judge_input, record_cue_miss, record_phantom_miss, JudgeContext, Judgment};
use super::spawner::CueSpawner;
use super::state::{Grade, RunPhase, RunSnapshot, RunState};
use super::tuning::TuningConfig;

pub type EndCallback = Box<dyn FnMut() + Send>;

/// Level and track captured at `start()`; selection changes apply to the next run.
#[derive(Debug, Clone)]
struct ActiveRun {
    level: LevelConfig,
    track: TrackProfile,
}

/// Orchestrates run transitions and the per-frame tick.
///
/// All mutation of the run state goes through this type. It is not
/// internally synchronized; hosts that tick from one thread and feed input
/// from another wrap it in a `SessionHandle`.
pub struct RunMachine {
    catalog: Catalog,
    tuning: TuningConfig,
    clock: Box<dyn Clock>,
    state: RunState,
    spawner: CueSpawner,
    selected_level_id: u32,
    selected_track_id: String,
    active: Option<ActiveRun>,
    cooldown_until_ms: f64,
    last_result: Option<RunSnapshot>,
    on_end: Option<EndCallback>,
}

impl fmt::Debug for RunMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunMachine")
            .field("phase", &self.state.phase)
            .field("selected_level_id", &self.selected_level_id)
            .field("selected_track_id", &self.selected_track_id)
            .field("sim_time_ms", &self.state.sim_time_ms)
            .field("active_cues", &self.state.cues.len())
            .finish_non_exhaustive()
    }
}

impl RunMachine {
    /// Builds an idle machine with the catalog's first level and track selected.
    pub fn new(catalog: Catalog, tuning: TuningConfig, clock: impl Clock + 'static) -> Self {
        let selected_level_id = catalog.first_level_id();
        let selected_track_id = catalog.first_track_id().to_string();
        let time_left_sec = catalog
            .level(selected_level_id)
            .map(|level| level.time_sec)
            .unwrap_or(0.0);
        Self {
            catalog,
            tuning: tuning.sanitized(),
            clock: Box::new(clock),
            state: RunState::new(time_left_sec),
            spawner: CueSpawner::new(),
            selected_level_id,
            selected_track_id,
            active: None,
            cooldown_until_ms: f64::NEG_INFINITY,
            last_result: None,
            on_end: None,
        }
    }

    pub fn select_level(&mut self, level_id: u32) -> Result<(), SelectionError> {
        let time_sec = self.catalog.level(level_id)?.time_sec;
        self.selected_level_id = level_id;
        if self.state.phase == RunPhase::Idle {
            self.state.time_left_sec = time_sec;
        }
        info!(level_id, phase = %self.state.phase, "level_selected");
        Ok(())
    }

    pub fn select_track(&mut self, track_id: &str) -> Result<(), SelectionError> {
        let track = self.catalog.track(track_id)?;
        self.selected_track_id = track.id.clone();
        info!(track_id, phase = %self.state.phase, "track_selected");
        Ok(())
    }

    pub fn on_end(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_end = Some(Box::new(callback));
    }

    pub fn start(&mut self) {
        if self.state.phase != RunPhase::Idle {
            return;
        }
        let now = self.clock.now_ms();
        if now < self.cooldown_until_ms {
            debug!(
                remaining_ms = self.cooldown_until_ms - now,
                "start_ignored_reset_cooldown"
            );
            return;
        }
        let (Ok(level), Ok(track)) = (
            self.catalog.level(self.selected_level_id),
            self.catalog.track(&self.selected_track_id),
        ) else {
            return;
        };
        let active = ActiveRun {
            level: level.clone(),
            track: track.clone(),
        };

        self.state.clear(active.level.time_sec);
        self.spawner.rewind(&active.track, active.level.density, 0.0);
        self.state.last_frame_ms = now;
        self.state.sim_time_ms = 0.0;
        self.state.phase = RunPhase::Running;
        info!(
            level_id = active.level.id,
            track_id = %active.track.id,
            time_sec = active.level.time_sec,
            "run_started"
        );
        self.active = Some(active);
    }

    /// Toggles Running and Paused. Does nothing while Idle.
    pub fn pause(&mut self) {
        self.state.phase = match self.state.phase {
            RunPhase::Idle => return,
            RunPhase::Running => RunPhase::Paused,
            RunPhase::Paused => RunPhase::Running,
        };
        info!(phase = %self.state.phase, "run_pause_toggled");
    }

    /// Abandons the run without firing the end callback.
    pub fn reset(&mut self) {
        if self.state.phase == RunPhase::Idle {
            return;
        }
        let time_sec = self
            .catalog
            .level(self.selected_level_id)
            .map(|level| level.time_sec)
            .unwrap_or(0.0);
        self.state.clear(time_sec);
        self.state.phase = RunPhase::Idle;
        self.active = None;
        self.cooldown_until_ms = self.clock.now_ms() + self.tuning.reset_cooldown_ms;
        info!(
            level_id = self.selected_level_id,
            cooldown_ms = self.tuning.reset_cooldown_ms,
            "run_reset"
        );
    }

    /// Reset followed by start as one operation. The cooldown armed by the
    /// reset does not apply to its own restart.
    pub fn restart(&mut self) {
        self.reset();
        self.cooldown_until_ms = f64::NEG_INFINITY;
        self.start();
    }

    /// Finishes the run, keeps its final snapshot, and fires the end callback once.
    pub fn end(&mut self) {
        if self.state.phase == RunPhase::Idle {
            return;
        }
        self.state.cleared_at_end = self.state.cues.len() as u32;
        self.state.cues.clear();
        self.state.phase = RunPhase::Idle;
        self.state.recompute_derived(&self.tuning);
        self.last_result = Some(self.snapshot());
        self.active = None;
        info!(
            score = self.state.score,
            max_streak = self.state.max_streak,
            accuracy = self.state.accuracy,
            total_notes = self.state.total_notes,
            cleared_at_end = self.state.cleared_at_end,
            "run_ended"
        );
        if let Some(callback) = self.on_end.as_mut() {
            callback();
        }
    }

    pub fn tick(&mut self) {
        if self.state.phase == RunPhase::Idle {
            return;
        }
        let now = self.clock.now_ms();
        let dt = (now - self.state.last_frame_ms).clamp(0.0, self.tuning.max_frame_step_ms);
        self.state.last_frame_ms = now;
        if self.state.phase == RunPhase::Paused {
            return;
        }
        let Some(active) = self.active.as_ref() else {
            return;
        };
        let windows = self.tuning.effective_windows(&active.level);
        let duration_ms = active.level.duration_ms();

        self.state.sim_time_ms += dt;
        let sim_now = self.state.sim_time_ms;

        if let Some(cue) =
            self.spawner
                .poll(sim_now, sim_now, &active.track, active.level.density)
        {
            self.state.cues.push_back(cue);
            self.state.total_notes += 1;
            self.state.last_spawn_ms = Some(sim_now);
        }

        // Expiry runs on the same calibrated clock as grading.
        for cue in expire_cues(
            &mut self.state.cues,
            sim_now - self.tuning.timing_offset_ms,
            active.level.travel_ms,
            windows.okay_ms,
        ) {
            record_cue_miss(&mut self.state);
            debug!(cue_id = cue.id, direction = %cue.direction, "cue_expired");
        }

        self.state.sync_time_left(duration_ms);
        self.state.recompute_derived(&self.tuning);

        if self.state.time_left_sec <= 0.0 {
            self.end();
        }
    }

    /// Judges an input at the current sub-frame time. Returns `None` unless Running.
    pub fn judge(&mut self, direction: Option<Direction>) -> Option<Judgment> {
        if self.state.phase != RunPhase::Running {
            return None;
        }
        let active = self.active.as_ref()?;
        let judged_at = self.input_time_ms();
        let ctx = JudgeContext {
            travel_ms: active.level.travel_ms,
            windows: self.tuning.effective_windows(&active.level),
            tuning: &self.tuning,
        };
        Some(judge_input(&mut self.state, direction, judged_at, ctx))
    }

    pub fn handle_input(&mut self, direction: Option<Direction>) -> Option<Grade> {
        self.judge(direction).map(|judgment| judgment.grade)
    }

    /// Parses free-form direction text; anything unrecognized counts as a miss.
    pub fn handle_raw_input(&mut self, raw: &str) -> Option<Grade> {
        if self.state.phase != RunPhase::Running {
            return None;
        }
        match raw.parse::<Direction>() {
            Ok(direction) => self.handle_input(Some(direction)),
            Err(err) => {
                debug!(error = %err, "input_unrecognized");
                record_phantom_miss(&mut self.state);
                self.state.recompute_derived(&self.tuning);
                Some(Grade::Miss)
            }
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let (level_id, track_id, travel_ms) = match self.active.as_ref() {
            Some(active) => (
                active.level.id,
                active.track.id.clone(),
                active.level.travel_ms,
            ),
            None => (self.selected_level_id, self.selected_track_id.clone(), 1.0),
        };
        let display_ms = self.state.sim_time_ms;
        RunSnapshot {
            phase: self.state.phase,
            level_id,
            track_id,
            time_left_sec: self.state.time_left_sec,
            score: self.state.score,
            streak: self.state.streak,
            max_streak: self.state.max_streak,
            accuracy: self.state.accuracy,
            avg_multiplier: self.state.avg_multiplier,
            hits: self.state.hits,
            misses: self.state.misses,
            counts: self.state.counts,
            phantom_misses: self.state.phantom_misses,
            total_notes: self.state.total_notes,
            cleared_at_end: self.state.cleared_at_end,
            cues: self
                .state
                .cues
                .iter()
                .map(|cue| CueView {
                    id: cue.id,
                    direction: cue.direction,
                    progress: cue.progress(display_ms, travel_ms),
                })
                .collect(),
        }
    }

    /// Final snapshot of the most recently ended run, handed out once.
    pub fn take_last_result(&mut self) -> Option<RunSnapshot> {
        self.last_result.take()
    }

    pub fn phase(&self) -> RunPhase {
        self.state.phase
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selected_level_id(&self) -> u32 {
        self.selected_level_id
    }

    pub fn selected_track_id(&self) -> &str {
        &self.selected_track_id
    }

    /// Level of the active run, or the selected one while Idle.
    pub fn current_level(&self) -> Option<&LevelConfig> {
        match self.active.as_ref() {
            Some(active) => Some(&active.level),
            None => self.catalog.level(self.selected_level_id).ok(),
        }
    }

    pub fn tuning(&self) -> &TuningConfig {
        &self.tuning
    }

    /// Installs new tuning immediately. Invalid values fall back to defaults.
    pub fn set_tuning(&mut self, tuning: TuningConfig) {
        self.tuning = tuning.sanitized();
        self.state.recompute_derived(&self.tuning);
        info!(
            combo_step = self.tuning.combo_step,
            timing_offset_ms = self.tuning.timing_offset_ms,
            policy = self.tuning.match_policy.as_str(),
            "tuning_updated"
        );
    }

    /// Sub-frame input time, bounded by the same step clamp as `tick`.
    fn input_time_ms(&self) -> f64 {
        let since_frame = (self.clock.now_ms() - self.state.last_frame_ms)
            .clamp(0.0, self.tuning.max_frame_step_ms);
        self.state.sim_time_ms + since_frame
    }
}
