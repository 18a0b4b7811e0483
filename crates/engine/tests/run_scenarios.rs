use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rhythm_engine::{
    Catalog, Clock, Direction, Grade, LevelConfig, ManualClock, PatternSegment, RunMachine,
    RunPhase, TimingWindows, TrackProfile, TuningConfig,
};

const TICK_MS: f64 = 10.0;

fn scenario_catalog(time_sec: f64) -> Catalog {
    Catalog::from_parts(
        vec![LevelConfig {
            id: 1,
            name: "Scenario".to_string(),
            time_sec,
            density: 1.0,
            travel_ms: 600.0,
            windows: TimingWindows {
                perfect_ms: 50.0,
                good_ms: 100.0,
                okay_ms: 150.0,
            },
        }],
        vec![TrackProfile {
            id: "steady".to_string(),
            name: "Steady".to_string(),
            bpm: 150,
            segments: vec![PatternSegment {
                duration_ms: 100_000.0,
                spacing_ms: 400.0,
                directions: vec![
                    Direction::Left,
                    Direction::Up,
                    Direction::Down,
                    Direction::Right,
                ],
            }],
        }],
    )
    .expect("scenario catalog")
}

fn started(time_sec: f64) -> (RunMachine, ManualClock) {
    started_with(time_sec, TuningConfig::default())
}

fn started_with(time_sec: f64, tuning: TuningConfig) -> (RunMachine, ManualClock) {
    let clock = ManualClock::new(0.0);
    let mut machine = RunMachine::new(scenario_catalog(time_sec), tuning, clock.clone());
    machine.start();
    assert_eq!(machine.phase(), RunPhase::Running);
    (machine, clock)
}

fn tick_to(machine: &mut RunMachine, clock: &ManualClock, target_ms: f64) {
    while clock.now_ms() < target_ms && machine.phase() != RunPhase::Idle {
        clock.advance(TICK_MS);
        machine.tick();
    }
}

/// The first cue spawns at 400ms and reaches the hit zone at 1000ms.
fn grade_first_cue_at(hit_ms: f64) -> Grade {
    let (mut machine, clock) = started(30.0);
    tick_to(&mut machine, &clock, hit_ms - TICK_MS);
    clock.set(hit_ms);
    machine
        .handle_input(Some(Direction::Left))
        .expect("machine is running")
}

#[test]
fn timing_windows_grade_each_band() {
    assert_eq!(grade_first_cue_at(1005.0), Grade::Perfect);
    assert_eq!(grade_first_cue_at(1070.0), Grade::Good);
    assert_eq!(grade_first_cue_at(1130.0), Grade::Okay);
    assert_eq!(grade_first_cue_at(1200.0), Grade::Miss);
}

#[test]
fn unhit_cue_expires_as_single_miss() {
    let (mut machine, clock) = started(30.0);
    tick_to(&mut machine, &clock, 1150.0);
    assert_eq!(machine.state().counts.miss, 0);
    tick_to(&mut machine, &clock, 1160.0);
    assert_eq!(machine.state().counts.miss, 1);
    assert_eq!(machine.state().misses, 1);
    assert_eq!(machine.state().streak, 0);
}

#[test]
fn positive_timing_offset_keeps_late_window_reachable() {
    let (mut machine, clock) = started_with(
        30.0,
        TuningConfig {
            timing_offset_ms: 100.0,
            ..TuningConfig::default()
        },
    );
    tick_to(&mut machine, &clock, 1160.0);
    assert_eq!(machine.state().cues.len(), 2);
    assert_eq!(machine.handle_input(Some(Direction::Left)), Some(Grade::Good));
    assert_eq!(machine.state().counts.miss, 0);

    // Second cue (Up) arrives at 1400 and expires once calibrated time passes 1550.
    tick_to(&mut machine, &clock, 1650.0);
    assert_eq!(machine.state().counts.miss, 0);
    tick_to(&mut machine, &clock, 1660.0);
    assert_eq!(machine.state().counts.miss, 1);
    assert_eq!(machine.state().counts.hits(), 1);
}

#[test]
fn eighth_perfect_hit_raises_multiplier() {
    let (mut machine, clock) = started(30.0);
    let mut scores = Vec::new();
    for hit in 0..8 {
        let arrival = 1000.0 + 400.0 * f64::from(hit);
        tick_to(&mut machine, &clock, arrival);
        assert_eq!(machine.handle_input(None), Some(Grade::Perfect));
        scores.push(machine.state().score);
        if hit < 7 {
            assert_eq!(machine.state().avg_multiplier, 1.0);
        }
    }
    assert_eq!(machine.state().streak, 8);
    assert_eq!(machine.state().avg_multiplier, 1.2);
    assert_eq!(scores[6], 7 * 140);
    assert_eq!(scores[7], 7 * 140 + 168);
}

#[test]
fn reset_mid_run_clears_everything() {
    let (mut machine, clock) = started(30.0);
    tick_to(&mut machine, &clock, 1000.0);
    assert_eq!(machine.handle_input(None), Some(Grade::Perfect));
    tick_to(&mut machine, &clock, 1300.0);
    assert!(!machine.state().cues.is_empty());

    machine.reset();
    let snapshot = machine.snapshot();
    assert_eq!(snapshot.phase, RunPhase::Idle);
    assert_eq!(snapshot.score, 0);
    assert_eq!(snapshot.streak, 0);
    assert!(snapshot.cues.is_empty());
    assert_eq!(snapshot.time_left_sec, 30.0);

    let before = machine.snapshot();
    machine.reset();
    assert_eq!(machine.snapshot(), before);
}

#[test]
fn time_out_with_active_cues_ends_once() {
    let (mut machine, clock) = started(1.2);
    let fired = Arc::new(AtomicU32::new(0));
    let observer = Arc::clone(&fired);
    machine.on_end(move || {
        observer.fetch_add(1, Ordering::SeqCst);
    });

    tick_to(&mut machine, &clock, 5_000.0);
    assert_eq!(machine.phase(), RunPhase::Idle);
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    let state = machine.state();
    assert!(state.cues.is_empty());
    assert_eq!(state.time_left_sec, 0.0);
    assert_eq!(state.total_notes, 3);
    assert_eq!(state.cleared_at_end, 2);
    assert_eq!(
        state.counts.hits() + state.counts.miss + state.cleared_at_end,
        state.total_notes
    );
    assert_eq!(state.hits, state.counts.hits());

    machine.tick();
    machine.end();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn no_input_run_resolves_every_cue_exactly_once() {
    let (mut machine, clock) = started(10.0);
    tick_to(&mut machine, &clock, 20_000.0);
    let state = machine.state();
    assert_eq!(state.phase, RunPhase::Idle);
    assert_eq!(state.counts.miss + state.cleared_at_end, state.total_notes);
    assert_eq!(state.misses, state.counts.miss);
    assert_eq!(state.phantom_misses, 0);
    assert_eq!(state.accuracy, 0);
}

#[test]
fn pause_twice_restores_running() {
    let (mut machine, clock) = started(30.0);
    tick_to(&mut machine, &clock, 200.0);
    machine.pause();
    assert_eq!(machine.phase(), RunPhase::Paused);
    machine.pause();
    assert_eq!(machine.phase(), RunPhase::Running);
}

#[test]
fn phantom_misses_are_counted_apart_from_notes() {
    let (mut machine, clock) = started(30.0);
    tick_to(&mut machine, &clock, 100.0);
    assert_eq!(machine.handle_input(Some(Direction::Up)), Some(Grade::Miss));
    let state = machine.state();
    assert_eq!(state.total_notes, 0);
    assert_eq!(state.phantom_misses, 1);
    assert_eq!(state.counts.miss, 0);
    assert_eq!(state.misses, state.counts.miss + state.phantom_misses);
    assert!(state.accuracy <= 100);
}

#[test]
fn identical_inputs_replay_identically() {
    fn play() -> (u64, u32, u32, u32, u32, u32) {
        let (mut machine, clock) = started(6.0);
        let presses = [
            (1010.0, Some(Direction::Left)),
            (1390.0, Some(Direction::Up)),
            (1500.0, None),
            (1880.0, Some(Direction::Right)),
            (2620.0, Some(Direction::Left)),
            (3000.0, None),
        ];
        for (at, direction) in presses {
            tick_to(&mut machine, &clock, at - TICK_MS);
            clock.set(at);
            machine.handle_input(direction);
        }
        tick_to(&mut machine, &clock, 10_000.0);
        let state = machine.state();
        (
            state.score,
            state.max_streak,
            state.counts.perfect,
            state.counts.good,
            state.counts.okay,
            state.counts.miss,
        )
    }

    assert_eq!(play(), play());
}
