use std::collections::VecDeque;

use tracing::debug;

use crate::content::{Direction, TimingWindows};

use super::cue::Cue;
use super::state::{Grade, RunState};
use super::tuning::{MatchPolicy, TuningConfig};

/// Outcome of resolving one input (or one expiry) against the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Judgment {
    pub grade: Grade,
    /// Signed timing error; positive means late. `None` when no cue was involved.
    pub offset_ms: Option<f64>,
    pub points: u64,
    pub cue_id: Option<u64>,
}

impl Judgment {
    fn phantom() -> Self {
        Self {
            grade: Grade::Miss,
            offset_ms: None,
            points: 0,
            cue_id: None,
        }
    }
}

/// Grades an absolute timing error. Thresholds are inclusive.
pub fn classify(diff_ms: f64, windows: &TimingWindows) -> Grade {
    if diff_ms <= windows.perfect_ms {
        Grade::Perfect
    } else if diff_ms <= windows.good_ms {
        Grade::Good
    } else if diff_ms <= windows.okay_ms {
        Grade::Okay
    } else {
        Grade::Miss
    }
}

/// Parameters shared by every judgment within one run.
#[derive(Debug, Clone, Copy)]
pub struct JudgeContext<'a> {
    pub travel_ms: f64,
    pub windows: TimingWindows,
    pub tuning: &'a TuningConfig,
}

enum Candidate {
    Eligible(usize),
    WrongDirection(usize),
    None,
}

fn select_candidate(
    cues: &VecDeque<Cue>,
    direction: Option<Direction>,
    now_ms: f64,
    travel_ms: f64,
    policy: MatchPolicy,
) -> Candidate {
    match policy {
        MatchPolicy::StrictFifo => match cues.front() {
            None => Candidate::None,
            Some(front) => match direction {
                Some(wanted) if wanted != front.direction => Candidate::WrongDirection(0),
                _ => Candidate::Eligible(0),
            },
        },
        MatchPolicy::NearestInTime => {
            let mut best: Option<(usize, f64)> = None;
            for (idx, cue) in cues.iter().enumerate() {
                if direction.is_some_and(|wanted| wanted != cue.direction) {
                    continue;
                }
                let distance = (cue.arrival_ms(travel_ms) - now_ms).abs();
                // Strict comparison keeps the earliest spawn on ties.
                if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                    best = Some((idx, distance));
                }
            }
            best.map_or(Candidate::None, |(idx, _)| Candidate::Eligible(idx))
        }
    }
}

/// Resolves one input event against the active cues and commits the
/// score/streak update.
pub fn judge_input(
    state: &mut RunState,
    direction: Option<Direction>,
    now_ms: f64,
    ctx: JudgeContext<'_>,
) -> Judgment {
    let judged_at = now_ms - ctx.tuning.timing_offset_ms;
    let candidate = select_candidate(
        &state.cues,
        direction,
        judged_at,
        ctx.travel_ms,
        ctx.tuning.match_policy,
    );

    let judgment = match candidate {
        Candidate::None => {
            record_phantom_miss(state);
            Judgment::phantom()
        }
        Candidate::WrongDirection(idx) => match state.cues.remove(idx) {
            Some(cue) => {
                record_cue_miss(state);
                Judgment {
                    grade: Grade::Miss,
                    offset_ms: Some(cue.offset_ms(judged_at, ctx.travel_ms)),
                    points: 0,
                    cue_id: Some(cue.id),
                }
            }
            None => {
                record_phantom_miss(state);
                Judgment::phantom()
            }
        },
        Candidate::Eligible(idx) => resolve_eligible(state, idx, judged_at, ctx),
    };

    state.recompute_derived(ctx.tuning);
    debug!(
        grade = %judgment.grade,
        offset_ms = judgment.offset_ms,
        points = judgment.points,
        cue_id = judgment.cue_id,
        "input_judged"
    );
    judgment
}

fn resolve_eligible(
    state: &mut RunState,
    idx: usize,
    judged_at: f64,
    ctx: JudgeContext<'_>,
) -> Judgment {
    let Some(cue) = state.cues.get(idx).copied() else {
        record_phantom_miss(state);
        return Judgment::phantom();
    };
    let offset = cue.offset_ms(judged_at, ctx.travel_ms);
    let grade = classify(offset.abs(), &ctx.windows);

    if !grade.is_hit() {
        if offset > 0.0 {
            // Late and out of window; the cue would expire on the next tick anyway.
            state.cues.remove(idx);
            record_cue_miss(state);
            return Judgment {
                grade,
                offset_ms: Some(offset),
                points: 0,
                cue_id: Some(cue.id),
            };
        }
        record_phantom_miss(state);
        return Judgment {
            grade,
            offset_ms: Some(offset),
            points: 0,
            cue_id: None,
        };
    }

    state.cues.remove(idx);
    let points = record_hit(state, grade, ctx.tuning);
    Judgment {
        grade,
        offset_ms: Some(offset),
        points,
        cue_id: Some(cue.id),
    }
}

/// Applies a hit. The streak is incremented before the multiplier is read.
fn record_hit(state: &mut RunState, grade: Grade, tuning: &TuningConfig) -> u64 {
    state.streak += 1;
    state.max_streak = state.max_streak.max(state.streak);
    let multiplier = tuning.multiplier_for_streak(state.streak);
    let points = (f64::from(tuning.base_points(grade)) * multiplier).round() as u64;
    state.score += points;
    state.hits += 1;
    state.total_hit += 1;
    match grade {
        Grade::Perfect => state.counts.perfect += 1,
        Grade::Good => state.counts.good += 1,
        Grade::Okay => state.counts.okay += 1,
        Grade::Miss => {}
    }
    points
}

/// A spawned cue resolved as a miss (expiry, wrong direction, or late press).
pub fn record_cue_miss(state: &mut RunState) {
    state.misses += 1;
    state.counts.miss += 1;
    state.streak = 0;
}

/// A miss that did not consume any cue.
pub fn record_phantom_miss(state: &mut RunState) {
    state.misses += 1;
    state.phantom_misses += 1;
    state.streak = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::state::RunPhase;

    const WINDOWS: TimingWindows = TimingWindows {
        perfect_ms: 50.0,
        good_ms: 100.0,
        okay_ms: 150.0,
    };

    fn state_with(cues: &[(u64, Direction, f64)]) -> RunState {
        let mut state = RunState::new(60.0);
        state.phase = RunPhase::Running;
        for (id, direction, spawn_time_ms) in cues {
            state.cues.push_back(Cue {
                id: *id,
                direction: *direction,
                spawn_time_ms: *spawn_time_ms,
            });
        }
        state.total_notes = cues.len() as u32;
        state
    }

    fn ctx(tuning: &TuningConfig) -> JudgeContext<'_> {
        JudgeContext {
            travel_ms: 600.0,
            windows: WINDOWS,
            tuning,
        }
    }

    #[test]
    fn classify_uses_inclusive_thresholds() {
        assert_eq!(classify(0.0, &WINDOWS), Grade::Perfect);
        assert_eq!(classify(50.0, &WINDOWS), Grade::Perfect);
        assert_eq!(classify(50.5, &WINDOWS), Grade::Good);
        assert_eq!(classify(100.0, &WINDOWS), Grade::Good);
        assert_eq!(classify(150.0, &WINDOWS), Grade::Okay);
        assert_eq!(classify(150.1, &WINDOWS), Grade::Miss);
    }

    #[test]
    fn no_candidate_is_phantom_miss() {
        let tuning = TuningConfig::default();
        let mut state = state_with(&[]);
        state.streak = 4;
        let judgment = judge_input(&mut state, Some(Direction::Left), 1000.0, ctx(&tuning));
        assert_eq!(judgment.grade, Grade::Miss);
        assert_eq!(judgment.cue_id, None);
        assert_eq!(state.misses, 1);
        assert_eq!(state.phantom_misses, 1);
        assert_eq!(state.counts.miss, 0);
        assert_eq!(state.streak, 0);
        assert_eq!(state.accuracy, 0);
    }

    #[test]
    fn fifo_direction_mismatch_consumes_oldest_cue() {
        let tuning = TuningConfig::default();
        let mut state = state_with(&[(1, Direction::Left, 400.0), (2, Direction::Up, 800.0)]);
        let judgment = judge_input(&mut state, Some(Direction::Up), 1000.0, ctx(&tuning));
        assert_eq!(judgment.grade, Grade::Miss);
        assert_eq!(judgment.cue_id, Some(1));
        assert_eq!(state.cues.len(), 1);
        assert_eq!(state.counts.miss, 1);
        assert_eq!(state.phantom_misses, 0);
    }

    #[test]
    fn fifo_early_press_leaves_cue_active() {
        let tuning = TuningConfig::default();
        let mut state = state_with(&[(1, Direction::Left, 400.0)]);
        let judgment = judge_input(&mut state, None, 700.0, ctx(&tuning));
        assert_eq!(judgment.grade, Grade::Miss);
        assert_eq!(judgment.offset_ms, Some(-300.0));
        assert_eq!(state.cues.len(), 1);
        assert_eq!(state.phantom_misses, 1);
    }

    #[test]
    fn late_out_of_window_press_consumes_cue() {
        let tuning = TuningConfig::default();
        let mut state = state_with(&[(1, Direction::Left, 400.0)]);
        let judgment = judge_input(&mut state, None, 1200.0, ctx(&tuning));
        assert_eq!(judgment.grade, Grade::Miss);
        assert_eq!(judgment.cue_id, Some(1));
        assert!(state.cues.is_empty());
        assert_eq!(state.counts.miss, 1);
    }

    #[test]
    fn nearest_policy_reaches_past_older_cue() {
        let tuning = TuningConfig {
            match_policy: MatchPolicy::NearestInTime,
            ..TuningConfig::default()
        };
        let mut state = state_with(&[(1, Direction::Left, 400.0), (2, Direction::Up, 800.0)]);
        let judgment = judge_input(&mut state, None, 1390.0, ctx(&tuning));
        assert_eq!(judgment.grade, Grade::Perfect);
        assert_eq!(judgment.cue_id, Some(2));
        assert_eq!(state.cues.front().map(|cue| cue.id), Some(1));
    }

    #[test]
    fn nearest_policy_filters_by_direction_and_breaks_ties_by_spawn() {
        let tuning = TuningConfig {
            match_policy: MatchPolicy::NearestInTime,
            ..TuningConfig::default()
        };
        let mut state = state_with(&[
            (1, Direction::Up, 400.0),
            (2, Direction::Left, 500.0),
            (3, Direction::Up, 600.0),
        ]);
        // Cue 2 arrives exactly now but has the wrong direction; cues 1 and 3 are equidistant.
        let judgment = judge_input(&mut state, Some(Direction::Up), 1100.0, ctx(&tuning));
        assert_eq!(judgment.cue_id, Some(1));
        assert_eq!(judgment.grade, Grade::Good);
        assert_eq!(
            state.cues.iter().map(|cue| cue.id).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn timing_offset_shifts_judged_time() {
        let tuning = TuningConfig {
            timing_offset_ms: 80.0,
            ..TuningConfig::default()
        };
        let mut state = state_with(&[(1, Direction::Left, 400.0)]);
        let judgment = judge_input(&mut state, None, 1080.0, ctx(&tuning));
        assert_eq!(judgment.grade, Grade::Perfect);
        assert_eq!(judgment.offset_ms, Some(0.0));
    }

    #[test]
    fn hit_scoring_applies_streak_before_multiplier() {
        let tuning = TuningConfig::default();
        let mut state = state_with(&[(1, Direction::Left, 400.0)]);
        state.streak = 7;
        let judgment = judge_input(&mut state, Some(Direction::Left), 1000.0, ctx(&tuning));
        assert_eq!(judgment.points, 168);
        assert_eq!(state.streak, 8);
        assert_eq!(state.max_streak, 8);
        assert_eq!(state.avg_multiplier, 1.2);
        assert_eq!(state.counts.perfect, 1);
        assert_eq!(state.total_hit, 1);
    }
}
