use tracing::debug;

use crate::content::{PatternSegment, TrackProfile};

use super::cue::Cue;

/// Pattern cursor over a track's segments.
///
/// The segment cursor only moves forward and clamps to the final segment.
/// Cue ids keep counting across rewinds so they stay unique for the
/// lifetime of the spawner.
#[derive(Debug, Clone, Default)]
pub struct CueSpawner {
    segment_index: usize,
    segment_end_ms: f64,
    direction_index: usize,
    next_deadline_ms: f64,
    next_cue_id: u64,
}

impl CueSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cursor to segment 0 and schedules the first cue one
    /// spacing interval after `start_ms`.
    pub fn rewind(&mut self, track: &TrackProfile, density: f64, start_ms: f64) {
        self.segment_index = 0;
        self.direction_index = 0;
        self.segment_end_ms = track
            .segments
            .first()
            .map(|segment| segment.duration_ms)
            .unwrap_or(f64::INFINITY);
        self.next_deadline_ms = start_ms + spacing_for(track.segments.first(), density);
    }

    /// Spawns at most one cue when `now_ms` has reached the deadline.
    ///
    /// `elapsed_play_ms` selects the pattern segment; `now_ms` is the
    /// simulated clock the deadline is expressed in.
    pub fn poll(
        &mut self,
        now_ms: f64,
        elapsed_play_ms: f64,
        track: &TrackProfile,
        density: f64,
    ) -> Option<Cue> {
        self.advance_segment(elapsed_play_ms, track);
        let segment = track.segments.get(self.segment_index)?;
        if now_ms < self.next_deadline_ms {
            return None;
        }

        let direction = segment.directions[self.direction_index % segment.directions.len()];
        self.direction_index = (self.direction_index + 1) % segment.directions.len();
        self.next_deadline_ms = now_ms + spacing_for(Some(segment), density);
        self.next_cue_id += 1;

        let cue = Cue {
            id: self.next_cue_id,
            direction,
            spawn_time_ms: now_ms,
        };
        debug!(
            cue_id = cue.id,
            direction = %cue.direction,
            segment = self.segment_index,
            spawn_ms = now_ms,
            "cue_spawned"
        );
        Some(cue)
    }

    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    pub fn next_deadline_ms(&self) -> f64 {
        self.next_deadline_ms
    }

    fn advance_segment(&mut self, elapsed_play_ms: f64, track: &TrackProfile) {
        while elapsed_play_ms >= self.segment_end_ms && self.segment_index + 1 < track.segments.len()
        {
            self.segment_index += 1;
            self.direction_index = 0;
            self.segment_end_ms += track.segments[self.segment_index].duration_ms;
        }
    }
}

fn spacing_for(segment: Option<&PatternSegment>, density: f64) -> f64 {
    match segment {
        Some(segment) => segment.spacing_ms / density,
        None => f64::INFINITY,
    }
}
