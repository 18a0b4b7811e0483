//! Timing and judgment core for Moonwalk Mania.
//!
//! The crate owns cue scheduling, travel, judgment and the run state
//! machine. It has no rendering, storage or network dependency; hosts feed
//! it a clock and input events and read back `RunSnapshot`s.

pub mod app;
pub mod content;
pub mod run;

pub use app::{
    run_frame_loop, LoopConfig, LoopMetricsSnapshot, MetricsHandle, SessionHandle,
    SLOW_FRAME_ENV_VAR,
};
pub use content::{
    builtin_levels, builtin_tracks, Catalog, CatalogError, Direction, LevelConfig,
    ParseDirectionError, PatternSegment, SelectionError, TimingWindows, TrackProfile,
};
pub use run::{
    accuracy_percent, classify, Clock, Cue, CueView, Grade, GradeCounts, Judgment, ManualClock,
    MatchPolicy, MonotonicClock, RunMachine, RunPhase, RunSnapshot, RunState, TuningConfig,
    TuningError,
};
