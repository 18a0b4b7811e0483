use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Up,
    Down,
    Right,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized direction '{0}'")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "left" | "a" | "arrowleft" => Ok(Direction::Left),
            "up" | "w" | "arrowup" => Ok(Direction::Up),
            "down" | "s" | "arrowdown" => Ok(Direction::Down),
            "right" | "d" | "arrowright" => Ok(Direction::Right),
            _ => Err(ParseDirectionError(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingWindows {
    pub perfect_ms: f64,
    pub good_ms: f64,
    pub okay_ms: f64,
}

impl TimingWindows {
    pub fn is_valid(&self) -> bool {
        self.perfect_ms.is_finite()
            && self.good_ms.is_finite()
            && self.okay_ms.is_finite()
            && self.perfect_ms > 0.0
            && self.perfect_ms <= self.good_ms
            && self.good_ms <= self.okay_ms
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub id: u32,
    pub name: String,
    pub time_sec: f64,
    /// Cue density multiplier; segment spacing is divided by this.
    pub density: f64,
    /// Time for a cue to travel from the spawn edge to the hit zone.
    pub travel_ms: f64,
    pub windows: TimingWindows,
}

impl LevelConfig {
    pub fn duration_ms(&self) -> f64 {
        self.time_sec * 1000.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSegment {
    pub duration_ms: f64,
    pub spacing_ms: f64,
    pub directions: Vec<Direction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackProfile {
    pub id: String,
    pub name: String,
    pub bpm: u32,
    pub segments: Vec<PatternSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("unknown level id {level_id}")]
    UnknownLevel { level_id: u32 },
    #[error("unknown track id '{track_id}'")]
    UnknownTrack { track_id: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("catalog needs at least one level")]
    NoLevels,
    #[error("catalog needs at least one track")]
    NoTracks,
    #[error("duplicate level id {level_id}")]
    DuplicateLevel { level_id: u32 },
    #[error("duplicate track id '{track_id}'")]
    DuplicateTrack { track_id: String },
    #[error("level {level_id} has invalid {field}: {value} (expected finite and > 0)")]
    InvalidLevelField {
        level_id: u32,
        field: &'static str,
        value: f64,
    },
    #[error("level {level_id} timing windows must satisfy 0 < perfect <= good <= okay")]
    InvalidWindows { level_id: u32 },
    #[error("track '{track_id}' has no pattern segments")]
    EmptyTrack { track_id: String },
    #[error("track '{track_id}' segment {index} is invalid: {reason}")]
    InvalidSegment {
        track_id: String,
        index: usize,
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_parses_names_and_key_aliases() {
        assert_eq!("left".parse::<Direction>(), Ok(Direction::Left));
        assert_eq!("W".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!(" ArrowDown ".parse::<Direction>(), Ok(Direction::Down));
        assert_eq!("d".parse::<Direction>(), Ok(Direction::Right));
        assert_eq!(
            "spin".parse::<Direction>(),
            Err(ParseDirectionError("spin".to_string()))
        );
    }

    #[test]
    fn windows_require_monotonic_positive_values() {
        let valid = TimingWindows {
            perfect_ms: 50.0,
            good_ms: 100.0,
            okay_ms: 150.0,
        };
        assert!(valid.is_valid());
        assert!(!TimingWindows {
            perfect_ms: 0.0,
            ..valid
        }
        .is_valid());
        assert!(!TimingWindows {
            good_ms: 200.0,
            ..valid
        }
        .is_valid());
        assert!(!TimingWindows {
            okay_ms: f64::NAN,
            ..valid
        }
        .is_valid());
    }
}
