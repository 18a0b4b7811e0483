use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use crate::content::Direction;
use crate::run::{Grade, RunMachine, RunSnapshot};

static SESSION_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_session_lock_poison_once(operation: &'static str) {
    if SESSION_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "session lock poisoned; recovered inner value");
    }
}

/// Shared handle to one `RunMachine`.
///
/// Every call holds the lock for its whole duration, so a tick and an input
/// judgment never interleave. The end callback runs under the lock and must
/// not call back into the handle.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    machine: Arc<Mutex<RunMachine>>,
}

impl SessionHandle {
    pub fn new(machine: RunMachine) -> Self {
        Self {
            machine: Arc::new(Mutex::new(machine)),
        }
    }

    pub fn with_machine<R>(&self, operation: impl FnOnce(&mut RunMachine) -> R) -> R {
        let mut guard = self.lock("with_machine");
        operation(&mut guard)
    }

    pub fn start(&self) {
        self.lock("start").start();
    }

    pub fn pause(&self) {
        self.lock("pause").pause();
    }

    pub fn reset(&self) {
        self.lock("reset").reset();
    }

    pub fn restart(&self) {
        self.lock("restart").restart();
    }

    pub fn end(&self) {
        self.lock("end").end();
    }

    pub fn tick(&self) {
        self.lock("tick").tick();
    }

    pub fn handle_input(&self, direction: Option<Direction>) -> Option<Grade> {
        self.lock("handle_input").handle_input(direction)
    }

    pub fn handle_raw_input(&self, raw: &str) -> Option<Grade> {
        self.lock("handle_raw_input").handle_raw_input(raw)
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.lock("snapshot").snapshot()
    }

    fn lock(&self, operation: &'static str) -> MutexGuard<'_, RunMachine> {
        match self.machine.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_session_lock_poison_once(operation);
                poisoned.into_inner()
            }
        }
    }
}
