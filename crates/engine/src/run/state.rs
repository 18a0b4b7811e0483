use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

use super::cue::{Cue, CueView};
use super::tuning::TuningConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Running,
    Paused,
}

impl RunPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::Paused => "paused",
        }
    }

    pub fn is_active(self) -> bool {
        !matches!(self, RunPhase::Idle)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Perfect,
    Good,
    Okay,
    Miss,
}

impl Grade {
    pub const fn as_str(self) -> &'static str {
        match self {
            Grade::Perfect => "perfect",
            Grade::Good => "good",
            Grade::Okay => "okay",
            Grade::Miss => "miss",
        }
    }

    pub fn is_hit(self) -> bool {
        !matches!(self, Grade::Miss)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-grade counters. `miss` only counts cues that resolved as misses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GradeCounts {
    pub perfect: u32,
    pub good: u32,
    pub okay: u32,
    pub miss: u32,
}

impl GradeCounts {
    pub fn hits(&self) -> u32 {
        self.perfect + self.good + self.okay
    }
}

/// The single mutable record of a run. Owned by `RunMachine`.
#[derive(Debug, Clone)]
pub struct RunState {
    pub phase: RunPhase,
    pub last_frame_ms: f64,
    pub last_spawn_ms: Option<f64>,
    pub sim_time_ms: f64,
    pub time_left_sec: f64,
    pub score: u64,
    pub streak: u32,
    pub max_streak: u32,
    pub hits: u32,
    pub misses: u32,
    pub counts: GradeCounts,
    pub phantom_misses: u32,
    pub total_notes: u32,
    pub total_hit: u32,
    /// Cues still active when the run ended; neither hit nor missed.
    pub cleared_at_end: u32,
    pub accuracy: u32,
    pub avg_multiplier: f64,
    pub cues: VecDeque<Cue>,
}

impl RunState {
    pub fn new(time_left_sec: f64) -> Self {
        Self {
            phase: RunPhase::Idle,
            last_frame_ms: 0.0,
            last_spawn_ms: None,
            sim_time_ms: 0.0,
            time_left_sec,
            score: 0,
            streak: 0,
            max_streak: 0,
            hits: 0,
            misses: 0,
            counts: GradeCounts::default(),
            phantom_misses: 0,
            total_notes: 0,
            total_hit: 0,
            cleared_at_end: 0,
            accuracy: 100,
            avg_multiplier: 1.0,
            cues: VecDeque::new(),
        }
    }

    /// Zeroes every accumulator and drops all cues. The phase is left alone.
    pub fn clear(&mut self, time_left_sec: f64) {
        let phase = self.phase;
        *self = Self::new(time_left_sec);
        self.phase = phase;
    }

    pub fn recompute_derived(&mut self, tuning: &TuningConfig) {
        self.accuracy = accuracy_percent(self.hits, self.misses);
        self.avg_multiplier = tuning.multiplier_for_streak(self.streak);
    }

    /// Remaining time derived from simulated play time.
    pub fn sync_time_left(&mut self, duration_ms: f64) {
        self.time_left_sec = (duration_ms - self.sim_time_ms).max(0.0) / 1000.0;
    }
}

pub fn accuracy_percent(hits: u32, misses: u32) -> u32 {
    let attempts = u64::from(hits) + u64::from(misses);
    if attempts == 0 {
        return 100;
    }
    let ratio = f64::from(hits) / attempts as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Read-only view for renderers and collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSnapshot {
    pub phase: RunPhase,
    pub level_id: u32,
    pub track_id: String,
    pub time_left_sec: f64,
    pub score: u64,
    pub streak: u32,
    pub max_streak: u32,
    pub accuracy: u32,
    pub avg_multiplier: f64,
    pub hits: u32,
    pub misses: u32,
    pub counts: GradeCounts,
    pub phantom_misses: u32,
    pub total_notes: u32,
    pub cleared_at_end: u32,
    pub cues: Vec<CueView>,
}
