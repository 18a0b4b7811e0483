mod clock;
mod cue;
mod judgment;
mod machine;
mod spawner;
mod state;
mod tuning;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use cue::{expire_cues, Cue, CueView};
pub use judgment::{classify, Judgment};
pub use machine::{EndCallback, RunMachine};
pub use spawner::CueSpawner;
pub use state::{accuracy_percent, Grade, GradeCounts, RunPhase, RunSnapshot, RunState};
pub use tuning::{
    MatchPolicy, TuningConfig, TuningError, DEFAULT_COMBO_STEP, DEFAULT_MAX_FRAME_STEP_MS,
    DEFAULT_POINTS_GOOD, DEFAULT_POINTS_OKAY, DEFAULT_POINTS_PERFECT, DEFAULT_RESET_COOLDOWN_MS,
};
