use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::content::{LevelConfig, TimingWindows};

use super::state::Grade;

pub const DEFAULT_COMBO_STEP: u32 = 8;
pub const DEFAULT_POINTS_PERFECT: u32 = 140;
pub const DEFAULT_POINTS_GOOD: u32 = 100;
pub const DEFAULT_POINTS_OKAY: u32 = 80;
pub const DEFAULT_RESET_COOLDOWN_MS: f64 = 200.0;
pub const DEFAULT_MAX_FRAME_STEP_MS: f64 = 1000.0 / 30.0;
const MULTIPLIER_STEP: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Only the oldest active cue is eligible.
    #[default]
    StrictFifo,
    /// The cue whose arrival is closest to the input wins.
    NearestInTime,
}

impl MatchPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            MatchPolicy::StrictFifo => "strict_fifo",
            MatchPolicy::NearestInTime => "nearest_in_time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub combo_step: u32,
    pub points_perfect: u32,
    pub points_good: u32,
    pub points_okay: u32,
    /// Calibration subtracted from input time before grading. May be negative.
    pub timing_offset_ms: f64,
    pub reset_cooldown_ms: f64,
    pub max_frame_step_ms: f64,
    pub match_policy: MatchPolicy,
    /// Replaces the level's own windows while set.
    pub window_override: Option<TimingWindows>,
    /// Level the override belongs to; `None` applies it to every level.
    pub window_override_level: Option<u32>,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            combo_step: DEFAULT_COMBO_STEP,
            points_perfect: DEFAULT_POINTS_PERFECT,
            points_good: DEFAULT_POINTS_GOOD,
            points_okay: DEFAULT_POINTS_OKAY,
            timing_offset_ms: 0.0,
            reset_cooldown_ms: DEFAULT_RESET_COOLDOWN_MS,
            max_frame_step_ms: DEFAULT_MAX_FRAME_STEP_MS,
            match_policy: MatchPolicy::StrictFifo,
            window_override: None,
            window_override_level: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuningError {
    #[error("{field} must be a finite number (got {value})")]
    NonFinite { field: &'static str, value: f64 },
    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("points must satisfy perfect > good > okay (got {perfect}/{good}/{okay})")]
    NonMonotonicPoints { perfect: u32, good: u32, okay: u32 },
    #[error("timing windows must satisfy 0 < perfect <= good <= okay")]
    InvalidWindows,
}

impl TuningConfig {
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.combo_step == 0 {
            return Err(TuningError::OutOfRange {
                field: "combo_step",
                value: 0.0,
            });
        }
        if !(self.points_perfect > self.points_good && self.points_good > self.points_okay) {
            return Err(TuningError::NonMonotonicPoints {
                perfect: self.points_perfect,
                good: self.points_good,
                okay: self.points_okay,
            });
        }
        if !self.timing_offset_ms.is_finite() {
            return Err(TuningError::NonFinite {
                field: "timing_offset_ms",
                value: self.timing_offset_ms,
            });
        }
        for (field, value) in [
            ("reset_cooldown_ms", self.reset_cooldown_ms),
            ("max_frame_step_ms", self.max_frame_step_ms),
        ] {
            if !value.is_finite() {
                return Err(TuningError::NonFinite { field, value });
            }
            if value < 0.0 {
                return Err(TuningError::OutOfRange { field, value });
            }
        }
        if self.max_frame_step_ms == 0.0 {
            return Err(TuningError::OutOfRange {
                field: "max_frame_step_ms",
                value: 0.0,
            });
        }
        if let Some(windows) = self.window_override {
            if !windows.is_valid() {
                return Err(TuningError::InvalidWindows);
            }
        }
        Ok(())
    }

    /// Replaces every invalid value with its default, logging each fix.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.combo_step == 0 {
            warn!(
                value = self.combo_step,
                default = defaults.combo_step,
                "tuning_combo_step_invalid"
            );
            self.combo_step = defaults.combo_step;
        }
        if !(self.points_perfect > self.points_good && self.points_good > self.points_okay) {
            warn!(
                perfect = self.points_perfect,
                good = self.points_good,
                okay = self.points_okay,
                "tuning_points_not_monotonic"
            );
            self.points_perfect = defaults.points_perfect;
            self.points_good = defaults.points_good;
            self.points_okay = defaults.points_okay;
        }
        if !self.timing_offset_ms.is_finite() {
            warn!(value = self.timing_offset_ms, "tuning_timing_offset_invalid");
            self.timing_offset_ms = defaults.timing_offset_ms;
        }
        if !self.reset_cooldown_ms.is_finite() || self.reset_cooldown_ms < 0.0 {
            warn!(value = self.reset_cooldown_ms, "tuning_reset_cooldown_invalid");
            self.reset_cooldown_ms = defaults.reset_cooldown_ms;
        }
        if !self.max_frame_step_ms.is_finite() || self.max_frame_step_ms <= 0.0 {
            warn!(value = self.max_frame_step_ms, "tuning_max_frame_step_invalid");
            self.max_frame_step_ms = defaults.max_frame_step_ms;
        }
        if self.window_override.is_some_and(|windows| !windows.is_valid()) {
            warn!("tuning_window_override_invalid");
            self.window_override = None;
        }
        self
    }

    pub fn base_points(&self, grade: Grade) -> u32 {
        match grade {
            Grade::Perfect => self.points_perfect,
            Grade::Good => self.points_good,
            Grade::Okay => self.points_okay,
            Grade::Miss => 0,
        }
    }

    pub fn multiplier_for_streak(&self, streak: u32) -> f64 {
        let step = self.combo_step.max(1);
        1.0 + f64::from(streak / step) * MULTIPLIER_STEP
    }

    pub fn window_override_for(&self, level_id: u32) -> Option<TimingWindows> {
        match self.window_override_level {
            Some(scoped) if scoped != level_id => None,
            _ => self.window_override,
        }
    }

    pub fn effective_windows(&self, level: &LevelConfig) -> TimingWindows {
        self.window_override_for(level.id).unwrap_or(level.windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_steps_every_combo_step() {
        let tuning = TuningConfig::default();
        assert_eq!(tuning.multiplier_for_streak(0), 1.0);
        assert_eq!(tuning.multiplier_for_streak(7), 1.0);
        assert_eq!(tuning.multiplier_for_streak(8), 1.2);
        assert!((tuning.multiplier_for_streak(16) - 1.4).abs() < 1e-9);
    }

    #[test]
    fn sanitized_replaces_non_finite_values() {
        let tuning = TuningConfig {
            timing_offset_ms: f64::NAN,
            max_frame_step_ms: f64::INFINITY,
            reset_cooldown_ms: -5.0,
            combo_step: 0,
            ..TuningConfig::default()
        }
        .sanitized();
        assert_eq!(tuning, TuningConfig::default());
    }

    #[test]
    fn sanitized_restores_monotonic_points() {
        let tuning = TuningConfig {
            points_perfect: 50,
            points_good: 100,
            ..TuningConfig::default()
        }
        .sanitized();
        assert_eq!(tuning.points_perfect, DEFAULT_POINTS_PERFECT);
        assert_eq!(tuning.points_good, DEFAULT_POINTS_GOOD);
        assert!(tuning.validate().is_ok());
    }

    #[test]
    fn validate_reports_offending_field() {
        let err = TuningConfig {
            timing_offset_ms: f64::NAN,
            ..TuningConfig::default()
        }
        .validate()
        .expect_err("nan offset should be rejected");
        assert!(matches!(
            err,
            TuningError::NonFinite {
                field: "timing_offset_ms",
                ..
            }
        ));

        let err = TuningConfig {
            window_override: Some(TimingWindows {
                perfect_ms: 100.0,
                good_ms: 50.0,
                okay_ms: 150.0,
            }),
            ..TuningConfig::default()
        }
        .validate()
        .expect_err("inverted windows should be rejected");
        assert_eq!(err, TuningError::InvalidWindows);
    }

    #[test]
    fn scoped_window_override_only_applies_to_its_level() {
        let narrow = TimingWindows {
            perfect_ms: 10.0,
            good_ms: 20.0,
            okay_ms: 30.0,
        };
        let level = |id| LevelConfig {
            id,
            name: format!("level {id}"),
            time_sec: 30.0,
            density: 1.0,
            travel_ms: 600.0,
            windows: TimingWindows {
                perfect_ms: 50.0,
                good_ms: 100.0,
                okay_ms: 150.0,
            },
        };

        let mut tuning = TuningConfig {
            window_override: Some(narrow),
            ..TuningConfig::default()
        };
        assert_eq!(tuning.effective_windows(&level(1)), narrow);
        assert_eq!(tuning.effective_windows(&level(2)), narrow);

        tuning.window_override_level = Some(1);
        assert_eq!(tuning.effective_windows(&level(1)), narrow);
        assert_eq!(tuning.effective_windows(&level(2)), level(2).windows);
    }

    #[test]
    fn deserializes_with_defaults_for_missing_fields() {
        let tuning: TuningConfig =
            serde_json::from_str(r#"{ "combo_step": 4, "match_policy": "nearest_in_time" }"#)
                .expect("parse tuning");
        assert_eq!(tuning.combo_step, 4);
        assert_eq!(tuning.match_policy, MatchPolicy::NearestInTime);
        assert_eq!(tuning.points_perfect, DEFAULT_POINTS_PERFECT);
    }
}
