use std::collections::HashMap;

use super::types::{CatalogError, LevelConfig, SelectionError, TrackProfile};

/// Immutable lookup tables for levels and tracks, in declaration order.
#[derive(Debug, Clone)]
pub struct Catalog {
    levels: Vec<LevelConfig>,
    tracks: Vec<TrackProfile>,
    level_index_by_id: HashMap<u32, usize>,
    track_index_by_id: HashMap<String, usize>,
}

impl Catalog {
    pub fn from_parts(
        levels: Vec<LevelConfig>,
        tracks: Vec<TrackProfile>,
    ) -> Result<Self, CatalogError> {
        if levels.is_empty() {
            return Err(CatalogError::NoLevels);
        }
        if tracks.is_empty() {
            return Err(CatalogError::NoTracks);
        }

        let mut level_index_by_id = HashMap::with_capacity(levels.len());
        for (idx, level) in levels.iter().enumerate() {
            validate_level(level)?;
            if level_index_by_id.insert(level.id, idx).is_some() {
                return Err(CatalogError::DuplicateLevel { level_id: level.id });
            }
        }

        let mut track_index_by_id = HashMap::with_capacity(tracks.len());
        for (idx, track) in tracks.iter().enumerate() {
            validate_track(track)?;
            if track_index_by_id.insert(track.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateTrack {
                    track_id: track.id.clone(),
                });
            }
        }

        Ok(Self {
            levels,
            tracks,
            level_index_by_id,
            track_index_by_id,
        })
    }

    pub fn level(&self, level_id: u32) -> Result<&LevelConfig, SelectionError> {
        self.level_index_by_id
            .get(&level_id)
            .map(|idx| &self.levels[*idx])
            .ok_or(SelectionError::UnknownLevel { level_id })
    }

    pub fn track(&self, track_id: &str) -> Result<&TrackProfile, SelectionError> {
        self.track_index_by_id
            .get(track_id)
            .map(|idx| &self.tracks[*idx])
            .ok_or_else(|| SelectionError::UnknownTrack {
                track_id: track_id.to_string(),
            })
    }

    pub fn levels(&self) -> &[LevelConfig] {
        &self.levels
    }

    pub fn tracks(&self) -> &[TrackProfile] {
        &self.tracks
    }

    pub fn first_level_id(&self) -> u32 {
        self.levels[0].id
    }

    pub fn first_track_id(&self) -> &str {
        &self.tracks[0].id
    }

    /// Level declared after `after`; `None` at the end of the ladder.
    pub fn next_level_id(&self, after: u32) -> Option<u32> {
        let idx = self.level_index_by_id.get(&after)?;
        self.levels.get(idx + 1).map(|level| level.id)
    }
}

fn validate_level(level: &LevelConfig) -> Result<(), CatalogError> {
    for (field, value) in [
        ("time_sec", level.time_sec),
        ("density", level.density),
        ("travel_ms", level.travel_ms),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(CatalogError::InvalidLevelField {
                level_id: level.id,
                field,
                value,
            });
        }
    }
    if !level.windows.is_valid() {
        return Err(CatalogError::InvalidWindows { level_id: level.id });
    }
    Ok(())
}

fn validate_track(track: &TrackProfile) -> Result<(), CatalogError> {
    if track.segments.is_empty() {
        return Err(CatalogError::EmptyTrack {
            track_id: track.id.clone(),
        });
    }
    for (index, segment) in track.segments.iter().enumerate() {
        let reason = if !segment.duration_ms.is_finite() || segment.duration_ms <= 0.0 {
            Some("duration_ms must be finite and > 0")
        } else if !segment.spacing_ms.is_finite() || segment.spacing_ms <= 0.0 {
            Some("spacing_ms must be finite and > 0")
        } else if segment.directions.is_empty() {
            Some("directions must not be empty")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(CatalogError::InvalidSegment {
                track_id: track.id.clone(),
                index,
                reason,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::types::{Direction, PatternSegment, TimingWindows};

    fn level(id: u32) -> LevelConfig {
        LevelConfig {
            id,
            name: format!("Level {id}"),
            time_sec: 30.0,
            density: 1.0,
            travel_ms: 600.0,
            windows: TimingWindows {
                perfect_ms: 50.0,
                good_ms: 100.0,
                okay_ms: 150.0,
            },
        }
    }

    fn track(id: &str) -> TrackProfile {
        TrackProfile {
            id: id.to_string(),
            name: id.to_string(),
            bpm: 120,
            segments: vec![PatternSegment {
                duration_ms: 1000.0,
                spacing_ms: 400.0,
                directions: vec![Direction::Left, Direction::Right],
            }],
        }
    }

    #[test]
    fn lookups_report_unknown_ids() {
        let catalog =
            Catalog::from_parts(vec![level(1), level(2)], vec![track("a")]).expect("catalog");
        assert_eq!(catalog.level(2).expect("level 2").id, 2);
        assert_eq!(
            catalog.level(9).unwrap_err(),
            SelectionError::UnknownLevel { level_id: 9 }
        );
        assert_eq!(
            catalog.track("zzz").unwrap_err(),
            SelectionError::UnknownTrack {
                track_id: "zzz".to_string()
            }
        );
    }

    #[test]
    fn next_level_follows_declaration_order() {
        let catalog = Catalog::from_parts(vec![level(3), level(1), level(7)], vec![track("a")])
            .expect("catalog");
        assert_eq!(catalog.next_level_id(3), Some(1));
        assert_eq!(catalog.next_level_id(1), Some(7));
        assert_eq!(catalog.next_level_id(7), None);
        assert_eq!(catalog.next_level_id(42), None);
    }

    #[test]
    fn rejects_duplicates_and_empty_tables() {
        assert_eq!(
            Catalog::from_parts(Vec::new(), vec![track("a")]).unwrap_err(),
            CatalogError::NoLevels
        );
        assert_eq!(
            Catalog::from_parts(vec![level(1), level(1)], vec![track("a")]).unwrap_err(),
            CatalogError::DuplicateLevel { level_id: 1 }
        );
        assert_eq!(
            Catalog::from_parts(vec![level(1)], vec![track("a"), track("a")]).unwrap_err(),
            CatalogError::DuplicateTrack {
                track_id: "a".to_string()
            }
        );
    }

    #[test]
    fn rejects_invalid_level_and_segment_values() {
        let mut bad_density = level(1);
        bad_density.density = 0.0;
        assert!(matches!(
            Catalog::from_parts(vec![bad_density], vec![track("a")]),
            Err(CatalogError::InvalidLevelField {
                field: "density",
                ..
            })
        ));

        let mut bad_windows = level(1);
        bad_windows.windows.good_ms = 10.0;
        assert_eq!(
            Catalog::from_parts(vec![bad_windows], vec![track("a")]).unwrap_err(),
            CatalogError::InvalidWindows { level_id: 1 }
        );

        let mut no_directions = track("a");
        no_directions.segments[0].directions.clear();
        assert!(matches!(
            Catalog::from_parts(vec![level(1)], vec![no_directions]),
            Err(CatalogError::InvalidSegment { index: 0, .. })
        ));

        let mut no_segments = track("a");
        no_segments.segments.clear();
        assert!(matches!(
            Catalog::from_parts(vec![level(1)], vec![no_segments]),
            Err(CatalogError::EmptyTrack { .. })
        ));
    }
}
