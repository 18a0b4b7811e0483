use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use rhythm_engine::{
    Direction, Grade, Judgment, MetricsHandle, RunMachine, RunPhase, SessionHandle, TuningConfig,
};
use tracing::{debug, info};

use super::admin::{AdminStore, ConfigKey};
use super::console::{
    AdminCommand, ConsoleState, DebugAction, GameAction, TuneAction, WindowGrade,
};

pub(crate) const MAX_COMMAND_LOG: usize = 100;
const COMMAND_LOG_TAIL: usize = 10;
const LOCKED_MESSAGE: &str = "Locked: unlock admin access before running commands";

#[derive(Debug, Clone)]
struct CommandLogEntry {
    at_sec: f64,
    message: String,
}

/// Applies queued console commands to the session and the admin store.
#[derive(Debug)]
pub(crate) struct AdminExecutor {
    session: SessionHandle,
    metrics: MetricsHandle,
    admin: AdminStore,
    base_tuning: TuningConfig,
    command_log: VecDeque<CommandLogEntry>,
    started_at: Instant,
    personal_bests: HashMap<(u32, String), u64>,
    quit_requested: bool,
}

impl AdminExecutor {
    pub(crate) fn new(
        session: SessionHandle,
        metrics: MetricsHandle,
        admin: AdminStore,
        base_tuning: TuningConfig,
    ) -> Self {
        Self {
            session,
            metrics,
            admin,
            base_tuning,
            command_log: VecDeque::new(),
            started_at: Instant::now(),
            personal_bests: HashMap::new(),
            quit_requested: false,
        }
    }

    pub(crate) fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub(crate) fn execute_all(&mut self, commands: Vec<AdminCommand>, console: &mut ConsoleState) {
        for command in commands {
            if self.quit_requested {
                break;
            }
            self.execute(command, console);
        }
    }

    pub(crate) fn execute(&mut self, command: AdminCommand, console: &mut ConsoleState) {
        debug!(?command, "admin_command");
        let result = self.apply(command);
        self.log(result.clone());
        for line in result.lines() {
            console.append_output_line(line);
        }
    }

    /// Judges one gameplay press and describes the outcome.
    pub(crate) fn judge_input(&mut self, direction: Option<Direction>) -> String {
        match self.session.with_machine(|machine| machine.judge(direction)) {
            Some(judgment) => describe_judgment(&judgment),
            None => "not running (try: game start)".to_string(),
        }
    }

    pub(crate) fn toggle_pause(&mut self) -> String {
        self.apply(AdminCommand::Game(GameAction::Pause))
    }

    /// One-line heads-up display of the current run.
    pub(crate) fn hud_line(&self) -> String {
        let snapshot = self.session.snapshot();
        let lanes: Vec<String> = snapshot
            .cues
            .iter()
            .map(|cue| format!("{}@{:.0}%", cue.direction, cue.progress * 100.0))
            .collect();
        let mut line = format!(
            "[{}] {:.1}s | Score: {} | Streak: {} | x{:.1} | Acc: {}% | Cues: {}",
            snapshot.phase,
            snapshot.time_left_sec,
            snapshot.score,
            snapshot.streak,
            snapshot.avg_multiplier,
            snapshot.accuracy,
            if lanes.is_empty() {
                "-".to_string()
            } else {
                lanes.join(" ")
            }
        );
        let announcement = &self.admin.published().data.announcement;
        if !announcement.is_empty() {
            line.push_str(&format!(" | {announcement}"));
        }
        line
    }

    /// Summary lines for the run that just ended, updating the personal best.
    pub(crate) fn finish_run(&mut self) -> Vec<String> {
        let Some(snapshot) = self.session.with_machine(RunMachine::take_last_result) else {
            return Vec::new();
        };
        let level_id = snapshot.level_id;
        let track_id = snapshot.track_id.clone();
        let level_name = self.level_name(level_id);
        let counts = snapshot.counts;
        let mut lines = vec![
            format!(
                "Run complete: {level_name} / {track_id} | Score: {} | Max streak: {} | Accuracy: {}%",
                snapshot.score, snapshot.max_streak, snapshot.accuracy
            ),
            format!(
                "Perfect: {} | Good: {} | Okay: {} | Miss: {} | Unplayed: {} | Stray presses: {}",
                counts.perfect,
                counts.good,
                counts.okay,
                counts.miss,
                snapshot.cleared_at_end,
                snapshot.phantom_misses
            ),
        ];

        let best = self
            .personal_bests
            .entry((level_id, track_id.clone()))
            .or_insert(0);
        if snapshot.score > *best {
            *best = snapshot.score;
            lines.push(format!("New personal best: {}", snapshot.score));
        } else {
            lines.push(format!("Personal best: {best}"));
        }
        info!(
            level_id,
            track_id = track_id.as_str(),
            score = snapshot.score,
            accuracy = snapshot.accuracy,
            "run_summary"
        );
        for line in &lines {
            self.log(line.clone());
        }
        lines
    }

    fn apply(&mut self, command: AdminCommand) -> String {
        match command {
            AdminCommand::Status => self.session.with_machine(|machine| {
                let run_status = if machine.phase().is_active() {
                    "Running"
                } else {
                    "Idle"
                };
                let level_name = machine
                    .catalog()
                    .level(machine.selected_level_id())
                    .map(|level| level.name.clone())
                    .unwrap_or_default();
                format!(
                    "Status: {run_status} | Level: {level_name} | Score: {}",
                    machine.state().score
                )
            }),
            AdminCommand::Game(action) => self.apply_game(action),
            AdminCommand::ScoreShow => {
                let snapshot = self.session.snapshot();
                format!(
                    "Score: {} | Streak: {} | Accuracy: {}%",
                    snapshot.score, snapshot.streak, snapshot.accuracy
                )
            }
            AdminCommand::LevelList => self.session.with_machine(|machine| {
                let levels: Vec<String> = machine
                    .catalog()
                    .levels()
                    .iter()
                    .map(|level| format!("{}({})", level.name, level.id))
                    .collect();
                format!("Levels: {}", levels.join(", "))
            }),
            AdminCommand::LevelSet { level_id } => {
                self.session.with_machine(|machine| select_level(machine, level_id, "Level set to"))
            }
            AdminCommand::LevelNext => self.session.with_machine(|machine| {
                match machine.catalog().next_level_id(machine.selected_level_id()) {
                    Some(next) => select_level(machine, next, "Changed to"),
                    None => "Already at max".to_string(),
                }
            }),
            AdminCommand::SongList => self.session.with_machine(|machine| {
                let tracks: Vec<String> = machine
                    .catalog()
                    .tracks()
                    .iter()
                    .map(|track| format!("{}({})", track.name, track.id))
                    .collect();
                format!("Tracks: {}", tracks.join(", "))
            }),
            AdminCommand::SongSet { track_id } => self.session.with_machine(|machine| {
                match machine.select_track(&track_id) {
                    Ok(()) => format!("Track set to {track_id}"),
                    Err(_) => "Track not found".to_string(),
                }
            }),
            AdminCommand::Tune(action) => self.apply_tune(action),
            AdminCommand::Unlock { code } => {
                if self.admin.unlock(&code) {
                    "Admin unlocked".to_string()
                } else {
                    "Invalid access code".to_string()
                }
            }
            AdminCommand::Lock => {
                self.admin.lock();
                "Admin locked".to_string()
            }
            AdminCommand::Debug(action) => self.apply_debug(action),
            AdminCommand::Quit => {
                self.quit_requested = true;
                "Bye".to_string()
            }
            gated => {
                if !self.admin.is_unlocked() {
                    return LOCKED_MESSAGE.to_string();
                }
                self.apply_admin(gated)
            }
        }
    }

    fn apply_game(&mut self, action: GameAction) -> String {
        let phase = self.session.snapshot().phase;
        match action {
            GameAction::Start => {
                if phase.is_active() {
                    return "Already running".to_string();
                }
                if self.admin.maintenance_active() {
                    return "maintenance mode active".to_string();
                }
                self.session.start();
                if self.session.snapshot().phase == RunPhase::Running {
                    "Game started".to_string()
                } else {
                    "Start ignored: reset cooldown active".to_string()
                }
            }
            GameAction::Pause => {
                if !phase.is_active() {
                    return "Game not running".to_string();
                }
                self.session.pause();
                "Toggled pause".to_string()
            }
            GameAction::Resume => {
                if phase != RunPhase::Paused {
                    return "Not paused".to_string();
                }
                self.session.pause();
                "Resumed".to_string()
            }
            GameAction::Reset => {
                self.session.reset();
                "Game reset".to_string()
            }
            GameAction::Stop => {
                self.session.end();
                "Game stopped".to_string()
            }
            GameAction::Restart => {
                if self.admin.maintenance_active() {
                    return "maintenance mode active".to_string();
                }
                self.session.restart();
                "Restarted".to_string()
            }
            GameAction::Status => {
                let snapshot = self.session.snapshot();
                format!(
                    "Running: {} | Paused: {} | Time: {:.1}s",
                    snapshot.phase.is_active(),
                    snapshot.phase == RunPhase::Paused,
                    snapshot.time_left_sec
                )
            }
            GameAction::Lock => {
                self.admin.set_published_maintenance(true);
                "Locked".to_string()
            }
            GameAction::Unlock => {
                self.admin.set_published_maintenance(false);
                "Unlocked".to_string()
            }
        }
    }

    fn apply_tune(&mut self, action: TuneAction) -> String {
        let base_tuning = self.base_tuning.clone();
        self.session.with_machine(|machine| {
            let mut tuning = machine.tuning().clone();
            let message = match action {
                TuneAction::Show => return describe_tuning(machine),
                TuneAction::Reset => {
                    tuning = base_tuning;
                    "Tuning reset".to_string()
                }
                TuneAction::Window { grade, ms } => {
                    let Some(level) = machine.current_level() else {
                        return "error: no level selected".to_string();
                    };
                    let level_id = level.id;
                    let mut windows = tuning.effective_windows(level);
                    match grade {
                        WindowGrade::Perfect => windows.perfect_ms = ms,
                        WindowGrade::Good => windows.good_ms = ms,
                        WindowGrade::Okay => windows.okay_ms = ms,
                    }
                    if !windows.is_valid() {
                        return "error: windows must satisfy 0 < perfect <= good <= okay"
                            .to_string();
                    }
                    tuning.window_override = Some(windows);
                    tuning.window_override_level = Some(level_id);
                    format!(
                        "Windows set to {}/{}/{}ms",
                        windows.perfect_ms, windows.good_ms, windows.okay_ms
                    )
                }
                TuneAction::Offset { ms } => {
                    tuning.timing_offset_ms = ms;
                    format!("Timing offset set to {ms}ms")
                }
                TuneAction::Combo { step } => {
                    tuning.combo_step = step;
                    format!("Combo step set to {step}")
                }
                TuneAction::Policy { policy } => {
                    tuning.match_policy = policy;
                    format!("Match policy set to {}", policy.as_str())
                }
            };
            machine.set_tuning(tuning);
            message
        })
    }

    fn apply_admin(&mut self, command: AdminCommand) -> String {
        match command {
            AdminCommand::DraftShow => {
                match serde_json::to_string_pretty(self.admin.draft()) {
                    Ok(json) => format!(
                        "Draft config ({} pending changes):\n{json}",
                        self.admin.draft_change_count()
                    ),
                    Err(error) => format!("error: serialize draft: {error}"),
                }
            }
            AdminCommand::DraftSet { key, value } => match self.set_draft(key, &value) {
                Ok(value) => format!("Draft updated: {key} = {value}"),
                Err(error) => format!("error: {error}"),
            },
            AdminCommand::DraftUndo => match self.admin.undo() {
                Some(key) => format!("Draft undo: reverted {key}"),
                None => "Draft undo: nothing to revert".to_string(),
            },
            AdminCommand::DraftReset => {
                self.admin.reset_draft();
                "Draft reset: draft set to defaults".to_string()
            }
            AdminCommand::Publish => {
                let published = self.admin.publish();
                format!("Published global config v{}", published.version)
            }
            AdminCommand::ConfigGet { key } => {
                format!("Config: {key} = {}", self.admin.published().data.get(key))
            }
            AdminCommand::Announce { text } => {
                let text = text.unwrap_or_default();
                match self.set_draft(ConfigKey::Announcement, &text) {
                    Ok(value) if value.is_empty() => "Draft announcement: cleared".to_string(),
                    Ok(value) => format!("Draft announcement: {value}"),
                    Err(error) => format!("error: {error}"),
                }
            }
            AdminCommand::FeaturedLevel { level_id } => {
                match self.set_draft(ConfigKey::FeaturedLevelId, &level_id.to_string()) {
                    Ok(value) => format!("Draft featured level: {value}"),
                    Err(_) => "Unknown level: pick a valid level id".to_string(),
                }
            }
            AdminCommand::FeaturedTrack { track_id } => {
                match self.set_draft(ConfigKey::FeaturedTrackId, &track_id) {
                    Ok(value) => format!("Draft featured track: {value}"),
                    Err(_) => "Unknown track: pick a valid track id".to_string(),
                }
            }
            AdminCommand::Maintenance { enabled } => {
                let flag = if enabled { "on" } else { "off" };
                match self.set_draft(ConfigKey::MaintenanceMode, flag) {
                    Ok(_) => format!("Maintenance: {flag} (draft)"),
                    Err(error) => format!("error: {error}"),
                }
            }
            other => format!("error: unhandled command {other:?}"),
        }
    }

    fn apply_debug(&mut self, action: DebugAction) -> String {
        match action {
            DebugAction::State => match serde_json::to_string_pretty(&self.session.snapshot()) {
                Ok(json) => json,
                Err(error) => format!("error: serialize state: {error}"),
            },
            DebugAction::Log => {
                let skip = self.command_log.len().saturating_sub(COMMAND_LOG_TAIL);
                let lines: Vec<String> = self
                    .command_log
                    .iter()
                    .skip(skip)
                    .map(|entry| format!("[{:.1}s] {}", entry.at_sec, entry.message))
                    .collect();
                if lines.is_empty() {
                    "Debug log empty".to_string()
                } else {
                    lines.join("\n")
                }
            }
            DebugAction::Fps => {
                let metrics = self.metrics.snapshot();
                format!(
                    "FPS: {:.1} | Tick: {:.2}ms | Max tick: {:.2}ms | Stalls: {}",
                    metrics.fps, metrics.tick_time_ms, metrics.max_tick_time_ms, metrics.stalled_frames
                )
            }
            DebugAction::ClearLog => {
                self.command_log.clear();
                "Debug log cleared".to_string()
            }
        }
    }

    fn set_draft(&mut self, key: ConfigKey, raw: &str) -> Result<String, String> {
        let admin = &mut self.admin;
        self.session
            .with_machine(|machine| admin.set_draft(machine.catalog(), key, raw))
    }

    fn level_name(&self, level_id: u32) -> String {
        self.session.with_machine(|machine| {
            machine
                .catalog()
                .level(level_id)
                .map(|level| level.name.clone())
                .unwrap_or_else(|_| format!("level {level_id}"))
        })
    }

    fn log(&mut self, message: String) {
        if self.command_log.len() == MAX_COMMAND_LOG {
            self.command_log.pop_front();
        }
        self.command_log.push_back(CommandLogEntry {
            at_sec: self.started_at.elapsed().as_secs_f64(),
            message,
        });
    }
}

fn select_level(machine: &mut RunMachine, level_id: u32, verb: &str) -> String {
    match machine.select_level(level_id) {
        Ok(()) => {
            let name = machine
                .catalog()
                .level(level_id)
                .map(|level| level.name.clone())
                .unwrap_or_default();
            format!("{verb} {name}")
        }
        Err(_) => "Level not found".to_string(),
    }
}

fn describe_tuning(machine: &RunMachine) -> String {
    let tuning = machine.tuning();
    let windows = match machine.current_level() {
        Some(level) => {
            let windows = tuning.effective_windows(level);
            format!(
                "{}/{}/{}ms{}",
                windows.perfect_ms,
                windows.good_ms,
                windows.okay_ms,
                if tuning.window_override_for(level.id).is_some() {
                    " (override)"
                } else {
                    ""
                }
            )
        }
        None => "-".to_string(),
    };
    format!(
        "Tuning: combo_step={} points={}/{}/{} offset={}ms policy={} windows={windows}",
        tuning.combo_step,
        tuning.points_perfect,
        tuning.points_good,
        tuning.points_okay,
        tuning.timing_offset_ms,
        tuning.match_policy.as_str()
    )
}

fn describe_judgment(judgment: &Judgment) -> String {
    let label = judgment.grade.as_str().to_ascii_uppercase();
    match (judgment.grade, judgment.offset_ms) {
        (Grade::Miss, Some(offset)) => format!("{label} ({offset:+.0}ms)"),
        (Grade::Miss, None) => format!("{label} (no cue)"),
        (_, Some(offset)) => format!("{label} +{} ({offset:+.0}ms)", judgment.points),
        (_, None) => format!("{label} +{}", judgment.points),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use rhythm_engine::{Catalog, ManualClock};

    use super::*;

    struct Harness {
        executor: AdminExecutor,
        console: ConsoleState,
        clock: ManualClock,
        session: SessionHandle,
        ended: mpsc::Receiver<()>,
    }

    impl Harness {
        fn new() -> Self {
            let clock = ManualClock::new(0.0);
            let catalog = Catalog::builtin().expect("builtin catalog");
            let admin = AdminStore::new(&catalog, "moonwalk");
            let mut machine = RunMachine::new(catalog, TuningConfig::default(), clock.clone());
            let (sender, ended) = mpsc::channel();
            machine.on_end(move || {
                let _ = sender.send(());
            });
            let session = SessionHandle::new(machine);
            let executor = AdminExecutor::new(
                session.clone(),
                MetricsHandle::default(),
                admin,
                TuningConfig::default(),
            );
            Self {
                executor,
                console: ConsoleState::default(),
                clock,
                session,
                ended,
            }
        }

        fn run(&mut self, command: AdminCommand) -> Vec<String> {
            self.executor.execute(command, &mut self.console);
            let mut lines = Vec::new();
            self.console.drain_output_lines_into(&mut lines);
            lines
        }

        fn run_one(&mut self, command: AdminCommand) -> String {
            let lines = self.run(command);
            assert_eq!(lines.len(), 1, "{lines:?}");
            lines.into_iter().next().unwrap_or_default()
        }
    }

    #[test]
    fn game_transitions_report_like_the_console() {
        let mut h = Harness::new();
        assert_eq!(h.run_one(AdminCommand::Game(GameAction::Pause)), "Game not running");
        assert_eq!(h.run_one(AdminCommand::Game(GameAction::Start)), "Game started");
        assert_eq!(h.run_one(AdminCommand::Game(GameAction::Start)), "Already running");
        assert_eq!(h.run_one(AdminCommand::Game(GameAction::Resume)), "Not paused");
        assert_eq!(h.run_one(AdminCommand::Game(GameAction::Pause)), "Toggled pause");
        assert_eq!(
            h.run_one(AdminCommand::Game(GameAction::Status)),
            "Running: true | Paused: true | Time: 45.0s"
        );
        assert_eq!(h.run_one(AdminCommand::Game(GameAction::Resume)), "Resumed");
        assert_eq!(
            h.run_one(AdminCommand::Status),
            "Status: Running | Level: Club Intro | Score: 0"
        );
        assert_eq!(h.run_one(AdminCommand::Game(GameAction::Reset)), "Game reset");
        assert_eq!(
            h.run_one(AdminCommand::Game(GameAction::Start)),
            "Start ignored: reset cooldown active"
        );
        h.clock.advance(250.0);
        assert_eq!(h.run_one(AdminCommand::Game(GameAction::Start)), "Game started");
        assert_eq!(h.run_one(AdminCommand::Game(GameAction::Restart)), "Restarted");
        assert_eq!(h.session.snapshot().phase, RunPhase::Running);
    }

    #[test]
    fn level_and_song_selection_follow_catalog() {
        let mut h = Harness::new();
        assert_eq!(
            h.run_one(AdminCommand::LevelList),
            "Levels: Club Intro(1), Tour Vibes(2), Stadium Finale(3), Encore(4), Moonwalk Master(5)"
        );
        assert_eq!(
            h.run_one(AdminCommand::LevelSet { level_id: 9 }),
            "Level not found"
        );
        assert_eq!(
            h.run_one(AdminCommand::LevelSet { level_id: 4 }),
            "Level set to Encore"
        );
        assert_eq!(h.run_one(AdminCommand::LevelNext), "Changed to Moonwalk Master");
        assert_eq!(h.run_one(AdminCommand::LevelNext), "Already at max");
        assert_eq!(
            h.run_one(AdminCommand::SongSet {
                track_id: "thriller".to_string()
            }),
            "Track not found"
        );
        assert_eq!(
            h.run_one(AdminCommand::SongSet {
                track_id: "beat-it".to_string()
            }),
            "Track set to beat-it"
        );
        let snapshot = h.session.snapshot();
        assert_eq!(snapshot.level_id, 5);
        assert_eq!(snapshot.track_id, "beat-it");
        assert_eq!(snapshot.time_left_sec, 90.0);
    }

    #[test]
    fn admin_commands_require_unlock() {
        let mut h = Harness::new();
        assert_eq!(
            h.run_one(AdminCommand::Maintenance { enabled: true }),
            LOCKED_MESSAGE
        );
        assert_eq!(
            h.run_one(AdminCommand::Unlock {
                code: "thriller".to_string()
            }),
            "Invalid access code"
        );
        assert_eq!(
            h.run_one(AdminCommand::Unlock {
                code: "moonwalk".to_string()
            }),
            "Admin unlocked"
        );
        assert_eq!(
            h.run_one(AdminCommand::Maintenance { enabled: true }),
            "Maintenance: on (draft)"
        );
        assert_eq!(h.run_one(AdminCommand::Lock), "Admin locked");
        assert_eq!(h.run_one(AdminCommand::Publish), LOCKED_MESSAGE);
    }

    #[test]
    fn published_maintenance_blocks_start() {
        let mut h = Harness::new();
        h.run(AdminCommand::Unlock {
            code: "moonwalk".to_string(),
        });
        h.run(AdminCommand::Maintenance { enabled: true });
        assert_eq!(h.run_one(AdminCommand::Game(GameAction::Start)), "Game started");
        h.run(AdminCommand::Game(GameAction::Stop));

        assert_eq!(
            h.run_one(AdminCommand::Publish),
            "Published global config v2"
        );
        assert_eq!(
            h.run_one(AdminCommand::ConfigGet {
                key: ConfigKey::MaintenanceMode
            }),
            "Config: maintenance_mode = true"
        );
        assert_eq!(
            h.run_one(AdminCommand::Game(GameAction::Start)),
            "maintenance mode active"
        );
        assert_eq!(
            h.run_one(AdminCommand::Game(GameAction::Restart)),
            "maintenance mode active"
        );

        assert_eq!(h.run_one(AdminCommand::Game(GameAction::Unlock)), "Unlocked");
        assert_eq!(h.run_one(AdminCommand::Game(GameAction::Start)), "Game started");
    }

    #[test]
    fn draft_edits_undo_and_featured_validation() {
        let mut h = Harness::new();
        h.run(AdminCommand::Unlock {
            code: "moonwalk".to_string(),
        });
        assert_eq!(
            h.run_one(AdminCommand::Announce {
                text: Some("Encore at nine".to_string())
            }),
            "Draft announcement: Encore at nine"
        );
        assert_eq!(
            h.run_one(AdminCommand::FeaturedLevel { level_id: 42 }),
            "Unknown level: pick a valid level id"
        );
        assert_eq!(
            h.run_one(AdminCommand::FeaturedTrack {
                track_id: "smooth-criminal".to_string()
            }),
            "Draft featured track: smooth-criminal"
        );
        assert_eq!(
            h.run_one(AdminCommand::DraftUndo),
            "Draft undo: reverted featured_track_id"
        );
        assert_eq!(
            h.run_one(AdminCommand::DraftSet {
                key: ConfigKey::FeaturedLevelId,
                value: "abc".to_string()
            }),
            "error: invalid level id 'abc' (expected u32)"
        );

        let shown = h.run(AdminCommand::DraftShow);
        assert_eq!(shown[0], "Draft config (1 pending changes):");
        assert!(shown.iter().any(|line| line.contains("\"announcement\": \"Encore at nine\"")));

        h.run(AdminCommand::Publish);
        assert!(h.executor.hud_line().ends_with("| Encore at nine"));
        assert_eq!(
            h.run_one(AdminCommand::DraftReset),
            "Draft reset: draft set to defaults"
        );
    }

    #[test]
    fn tune_commands_update_live_tuning() {
        let mut h = Harness::new();
        assert_eq!(
            h.run_one(AdminCommand::Tune(TuneAction::Show)),
            "Tuning: combo_step=8 points=140/100/80 offset=0ms policy=strict_fifo windows=90/150/220ms"
        );
        assert_eq!(
            h.run_one(AdminCommand::Tune(TuneAction::Window {
                grade: WindowGrade::Perfect,
                ms: 200.0
            })),
            "error: windows must satisfy 0 < perfect <= good <= okay"
        );
        assert_eq!(
            h.run_one(AdminCommand::Tune(TuneAction::Window {
                grade: WindowGrade::Okay,
                ms: 250.0
            })),
            "Windows set to 90/150/250ms"
        );
        assert_eq!(
            h.run_one(AdminCommand::Tune(TuneAction::Combo { step: 4 })),
            "Combo step set to 4"
        );
        h.session.with_machine(|machine| {
            assert_eq!(machine.tuning().combo_step, 4);
            assert!(machine.tuning().window_override.is_some());
        });
        assert_eq!(h.run_one(AdminCommand::Tune(TuneAction::Reset)), "Tuning reset");
        h.session
            .with_machine(|machine| assert_eq!(machine.tuning(), &TuningConfig::default()));
    }

    #[test]
    fn stopping_a_run_produces_summary_and_personal_best() {
        let mut h = Harness::new();
        h.run(AdminCommand::Game(GameAction::Start));
        h.clock.advance(16.0);
        h.session.tick();
        assert_eq!(h.executor.judge_input(None), "MISS (no cue)");

        h.run(AdminCommand::Game(GameAction::Stop));
        assert!(h.ended.try_recv().is_ok());
        let summary = h.executor.finish_run();
        assert_eq!(
            summary[0],
            "Run complete: Club Intro / billie-jean | Score: 0 | Max streak: 0 | Accuracy: 0%"
        );
        assert_eq!(
            summary[1],
            "Perfect: 0 | Good: 0 | Okay: 0 | Miss: 0 | Unplayed: 0 | Stray presses: 1"
        );
        assert_eq!(summary[2], "Personal best: 0");
        assert!(h.executor.finish_run().is_empty());
        assert_eq!(
            h.executor.judge_input(Some(Direction::Left)),
            "not running (try: game start)"
        );
    }

    #[test]
    fn summary_describes_ended_run_even_after_restart() {
        let mut h = Harness::new();
        h.run(AdminCommand::Game(GameAction::Start));
        h.clock.advance(16.0);
        h.session.tick();
        assert_eq!(h.executor.judge_input(None), "MISS (no cue)");
        h.run(AdminCommand::Game(GameAction::Stop));
        assert_eq!(h.run_one(AdminCommand::Game(GameAction::Restart)), "Restarted");

        let summary = h.executor.finish_run();
        assert_eq!(
            summary[0],
            "Run complete: Club Intro / billie-jean | Score: 0 | Max streak: 0 | Accuracy: 0%"
        );
        assert!(summary[1].ends_with("Stray presses: 1"), "{}", summary[1]);
        assert_eq!(h.session.snapshot().accuracy, 100);
    }

    #[test]
    fn tuned_windows_stay_with_their_level() {
        let mut h = Harness::new();
        assert_eq!(
            h.run_one(AdminCommand::Tune(TuneAction::Window {
                grade: WindowGrade::Okay,
                ms: 250.0
            })),
            "Windows set to 90/150/250ms"
        );
        h.run(AdminCommand::LevelSet { level_id: 4 });
        assert_eq!(
            h.run_one(AdminCommand::Tune(TuneAction::Show)),
            "Tuning: combo_step=8 points=140/100/80 offset=0ms policy=strict_fifo windows=75/130/190ms"
        );
        h.run(AdminCommand::LevelSet { level_id: 1 });
        assert!(h
            .run_one(AdminCommand::Tune(TuneAction::Show))
            .ends_with("windows=90/150/250ms (override)"));
    }

    #[test]
    fn debug_log_keeps_last_ten_results() {
        let mut h = Harness::new();
        for _ in 0..12 {
            h.run(AdminCommand::ScoreShow);
        }
        h.run(AdminCommand::Game(GameAction::Status));
        let lines = h.run(AdminCommand::Debug(DebugAction::Log));
        assert_eq!(lines.len(), COMMAND_LOG_TAIL);
        assert!(lines[9].ends_with("Running: false | Paused: false | Time: 45.0s"));
        assert!(lines[0].ends_with("Score: 0 | Streak: 0 | Accuracy: 100%"));

        assert_eq!(
            h.run_one(AdminCommand::Debug(DebugAction::ClearLog)),
            "Debug log cleared"
        );
        assert_eq!(
            h.run_one(AdminCommand::Debug(DebugAction::Fps)),
            "FPS: 0.0 | Tick: 0.00ms | Max tick: 0.00ms | Stalls: 0"
        );
    }

    #[test]
    fn command_log_is_bounded() {
        let mut h = Harness::new();
        for _ in 0..(MAX_COMMAND_LOG + 5) {
            h.run(AdminCommand::ScoreShow);
        }
        assert_eq!(h.executor.command_log.len(), MAX_COMMAND_LOG);
    }

    #[test]
    fn debug_state_dumps_snapshot_json() {
        let mut h = Harness::new();
        let lines = h.run(AdminCommand::Debug(DebugAction::State));
        let json = lines.join("\n");
        let value: serde_json::Value = serde_json::from_str(&json).expect("snapshot json");
        assert_eq!(value["phase"], "idle");
        assert_eq!(value["track_id"], "billie-jean");
    }

    #[test]
    fn quit_stops_remaining_commands() {
        let mut h = Harness::new();
        h.executor.execute_all(
            vec![AdminCommand::Quit, AdminCommand::Game(GameAction::Start)],
            &mut h.console,
        );
        assert!(h.executor.quit_requested());
        assert_eq!(h.session.snapshot().phase, RunPhase::Idle);
    }
}
