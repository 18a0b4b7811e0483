mod loop_runner;
mod metrics;
mod session;

pub use loop_runner::{run_frame_loop, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use session::SessionHandle;
