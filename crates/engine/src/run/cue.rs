use std::collections::VecDeque;

use serde::Serialize;

use crate::content::Direction;

/// A pending rhythm event. Position is derived from `spawn_time_ms`, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cue {
    pub id: u64,
    pub direction: Direction,
    pub spawn_time_ms: f64,
}

impl Cue {
    pub fn arrival_ms(&self, travel_ms: f64) -> f64 {
        self.spawn_time_ms + travel_ms
    }

    /// 0.0 at the spawn edge, 1.0 at the hit zone, above 1.0 once past it.
    pub fn progress(&self, now_ms: f64, travel_ms: f64) -> f64 {
        (now_ms - self.spawn_time_ms) / travel_ms
    }

    /// Signed distance from the hit zone in ms; positive means late.
    pub fn offset_ms(&self, now_ms: f64, travel_ms: f64) -> f64 {
        now_ms - self.arrival_ms(travel_ms)
    }

    pub fn is_expired(&self, now_ms: f64, travel_ms: f64, okay_window_ms: f64) -> bool {
        self.offset_ms(now_ms, travel_ms) > okay_window_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CueView {
    pub id: u64,
    pub direction: Direction,
    pub progress: f64,
}

/// Removes every expired cue and returns them in spawn order.
///
/// Cues are in spawn order with a shared travel time, so expiry always
/// happens at the front.
pub fn expire_cues(
    cues: &mut VecDeque<Cue>,
    now_ms: f64,
    travel_ms: f64,
    okay_window_ms: f64,
) -> Vec<Cue> {
    let mut expired = Vec::new();
    while let Some(front) = cues.front() {
        if !front.is_expired(now_ms, travel_ms, okay_window_ms) {
            break;
        }
        if let Some(cue) = cues.pop_front() {
            expired.push(cue);
        }
    }
    expired
}
