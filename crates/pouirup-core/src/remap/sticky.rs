// pouirup Deferred Tasks
// Timers that fire sticky-modifier expiry off the event path

use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

pub type DeferredTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task once after a delay, on some other execution context.
///
/// Scheduled tasks are never cancelled; a task must re-check whatever state
/// it acts on when it finally runs.
pub trait DeferredScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: DeferredTask);
}

/// One sleeping thread per scheduled task
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadScheduler;

impl DeferredScheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: DeferredTask) {
        let spawned = thread::Builder::new()
            .name("pouirup-sticky".to_string())
            .spawn(move || {
                thread::sleep(delay);
                task();
            });
        if let Err(e) = spawned {
            log::error!("failed to spawn sticky timer: {}", e);
        }
    }
}

/// Holds tasks until the caller runs them, ignoring the delay.
#[derive(Default)]
pub struct ManualScheduler {
    pending: Mutex<Vec<(Duration, DeferredTask)>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Delays of the pending tasks, in scheduling order
    pub fn pending_delays(&self) -> Vec<Duration> {
        self.pending.lock().iter().map(|(delay, _)| *delay).collect()
    }

    /// Run every pending task in scheduling order; returns how many ran
    pub fn run_all(&self) -> usize {
        let tasks = std::mem::take(&mut *self.pending.lock());
        let count = tasks.len();
        for (_, task) in tasks {
            task();
        }
        count
    }

    /// Run only the oldest pending task
    pub fn run_next(&self) -> bool {
        let next = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                None
            } else {
                Some(pending.remove(0))
            }
        };
        match next {
            Some((_, task)) => {
                task();
                true
            }
            None => false,
        }
    }
}

impl DeferredScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: DeferredTask) {
        self.pending.lock().push((delay, task));
    }
}
