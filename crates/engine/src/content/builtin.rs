use super::database::Catalog;
use super::types::{
    CatalogError, Direction, LevelConfig, PatternSegment, TimingWindows, TrackProfile,
};

use Direction::{Down, Left, Right, Up};

const DEFAULT_WINDOWS: TimingWindows = TimingWindows {
    perfect_ms: 90.0,
    good_ms: 150.0,
    okay_ms: 220.0,
};

impl Catalog {
    /// The stock level ladder and track list shipped with the game.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_parts(builtin_levels(), builtin_tracks())
    }
}

pub fn builtin_levels() -> Vec<LevelConfig> {
    vec![
        level(1, "Club Intro", 45.0, 1.0, 2400.0, DEFAULT_WINDOWS),
        level(2, "Tour Vibes", 60.0, 1.2, 2200.0, DEFAULT_WINDOWS),
        level(3, "Stadium Finale", 75.0, 1.4, 2000.0, DEFAULT_WINDOWS),
        level(
            4,
            "Encore",
            75.0,
            1.6,
            1800.0,
            TimingWindows {
                perfect_ms: 75.0,
                good_ms: 130.0,
                okay_ms: 190.0,
            },
        ),
        level(
            5,
            "Moonwalk Master",
            90.0,
            1.8,
            1600.0,
            TimingWindows {
                perfect_ms: 60.0,
                good_ms: 110.0,
                okay_ms: 160.0,
            },
        ),
    ]
}

pub fn builtin_tracks() -> Vec<TrackProfile> {
    vec![
        TrackProfile {
            id: "billie-jean".to_string(),
            name: "Billie Jean".to_string(),
            bpm: 117,
            segments: vec![
                segment(16_000.0, 1026.0, &[Left, Right]),
                segment(24_000.0, 513.0, &[Left, Up, Right, Down]),
                segment(32_000.0, 513.0, &[Up, Up, Down, Left, Right, Left]),
            ],
        },
        TrackProfile {
            id: "beat-it".to_string(),
            name: "Beat It".to_string(),
            bpm: 139,
            segments: vec![
                segment(12_000.0, 863.0, &[Up, Down]),
                segment(30_000.0, 432.0, &[Left, Left, Right, Right, Up, Down]),
                segment(30_000.0, 432.0, &[Down, Up, Left, Right]),
            ],
        },
        TrackProfile {
            id: "smooth-criminal".to_string(),
            name: "Smooth Criminal".to_string(),
            bpm: 118,
            segments: vec![
                segment(20_000.0, 1017.0, &[Right, Left]),
                segment(40_000.0, 508.0, &[Right, Up, Left, Down, Right, Right]),
            ],
        },
    ]
}

fn level(
    id: u32,
    name: &str,
    time_sec: f64,
    density: f64,
    travel_ms: f64,
    windows: TimingWindows,
) -> LevelConfig {
    LevelConfig {
        id,
        name: name.to_string(),
        time_sec,
        density,
        travel_ms,
        windows,
    }
}

fn segment(duration_ms: f64, spacing_ms: f64, directions: &[Direction]) -> PatternSegment {
    PatternSegment {
        duration_ms,
        spacing_ms,
        directions: directions.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_validates() {
        let catalog = Catalog::builtin().expect("builtin catalog should validate");
        assert_eq!(catalog.first_level_id(), 1);
        assert_eq!(catalog.first_track_id(), "billie-jean");
        assert_eq!(catalog.levels().len(), 5);
        assert!(catalog.track("smooth-criminal").is_ok());
    }

    #[test]
    fn harder_levels_travel_faster() {
        let levels = builtin_levels();
        for pair in levels.windows(2) {
            assert!(pair[1].travel_ms < pair[0].travel_ms);
            assert!(pair[1].density > pair[0].density);
        }
    }
}
