//! Tick-driven task scheduler.
//!
//! Tasks run on the tick thread. Within one tick, due tasks run in task id
//! (that is, scheduling) order. Delays and periods are counted in ticks; a
//! delay of zero still waits for the next tick.

mod tickers;

#[cfg(feature = "tokio")]
pub use tickers::IntervalTicker;
pub use tickers::{ManualTicker, ProxyTicker};

use spindle_core::Tick;
use std::{
    collections::BTreeMap,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

/// Identifies a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

type TaskFn = Arc<dyn Fn() + Send + Sync>;

struct Task {
    due: u64,
    period: Option<u64>,
    callback: TaskFn,
}

/// Runs delayed and repeating callbacks, one step per tick.
#[derive(Default)]
pub struct Scheduler {
    current: AtomicU64,
    next_id: AtomicU64,
    tasks: Mutex<BTreeMap<TaskId, Task>>,
}

impl Scheduler {
    /// Create an empty scheduler at tick zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` once, `delay` ticks from now.
    pub fn run_later<F>(&self, delay: u64, f: F) -> TaskId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule(delay, None, Arc::new(f))
    }

    /// Run `f` every `period` ticks, starting `delay` ticks from now.
    pub fn run_repeating<F>(&self, delay: u64, period: u64, f: F) -> TaskId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule(delay, Some(period.max(1)), Arc::new(f))
    }

    fn schedule(&self, delay: u64, period: Option<u64>, callback: TaskFn) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let due = self.current_tick() + delay.max(1);
        self.lock().insert(
            id,
            Task {
                due,
                period,
                callback,
            },
        );
        tracing::debug!(target: "spindle::scheduler", ?id, due, ?period, "scheduled task");
        id
    }

    /// Cancel a task; returns whether it was still queued.
    pub fn cancel(&self, id: TaskId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Whether a task will still run.
    pub fn is_queued(&self, id: TaskId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Ticks elapsed so far.
    pub fn current_tick(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Advance one tick and run every task that became due.
    ///
    /// A task cancelled by an earlier task in the same tick does not run.
    pub fn tick(&self) {
        let now = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        let due: Vec<TaskId> = self
            .lock()
            .iter()
            .filter(|(_, task)| task.due <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in due {
            let callback = {
                let mut tasks = self.lock();
                let Some(task) = tasks.get_mut(&id) else {
                    continue;
                };
                let callback = Arc::clone(&task.callback);
                match task.period {
                    Some(period) => task.due = now + period,
                    None => {
                        tasks.remove(&id);
                    }
                }
                callback
            };

            if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                tracing::warn!(target: "spindle::scheduler", ?id, "task panicked");
            }
        }
    }

    /// A [`Tick`] that advances this scheduler.
    pub fn tick_fn(self: &Arc<Self>) -> Tick {
        let scheduler = Arc::clone(self);
        Arc::new(move || scheduler.tick())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<TaskId, Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("tick", &self.current_tick())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> TaskFn) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |label: &str| -> TaskFn {
            let sink = sink.clone();
            let label = label.to_owned();
            Arc::new(move || sink.lock().unwrap().push(label.clone()))
        };
        (log, make)
    }

    #[test]
    fn delayed_tasks_run_once() {
        let scheduler = Scheduler::new();
        let (log, make) = log();
        let task = make("later");
        let id = scheduler.run_later(2, move || task());

        scheduler.tick();
        assert!(log.lock().unwrap().is_empty());
        assert!(scheduler.is_queued(id));

        scheduler.tick();
        scheduler.tick();
        assert_eq!(*log.lock().unwrap(), ["later"]);
        assert!(!scheduler.is_queued(id));
    }

    #[test]
    fn repeating_tasks_follow_their_period_until_cancelled() {
        let scheduler = Scheduler::new();
        let (log, make) = log();
        let task = make("beat");
        let id = scheduler.run_repeating(1, 2, move || task());

        for _ in 0..5 {
            scheduler.tick();
        }
        assert_eq!(log.lock().unwrap().len(), 3);

        assert!(scheduler.cancel(id));
        scheduler.tick();
        scheduler.tick();
        assert_eq!(log.lock().unwrap().len(), 3);
        assert!(!scheduler.cancel(id));
    }

    #[test]
    fn due_tasks_run_in_scheduling_order() {
        let scheduler = Scheduler::new();
        let (log, make) = log();
        for label in ["a", "b", "c"] {
            let task = make(label);
            scheduler.run_later(0, move || task());
        }

        scheduler.tick();
        assert_eq!(*log.lock().unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn tasks_cancelled_mid_tick_do_not_run() {
        let scheduler = Arc::new(Scheduler::new());
        let (log, make) = log();
        let victim = Arc::new(Mutex::new(None));

        let canceller = {
            let scheduler = scheduler.clone();
            let victim = victim.clone();
            move || {
                if let Some(id) = *victim.lock().unwrap() {
                    scheduler.cancel(id);
                }
            }
        };
        scheduler.run_later(1, canceller);
        let task = make("victim");
        *victim.lock().unwrap() = Some(scheduler.run_later(1, move || task()));

        scheduler.tick();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn panicking_tasks_do_not_stop_the_tick() {
        let scheduler = Scheduler::new();
        let (log, make) = log();
        scheduler.run_later(1, || panic!("task failure"));
        let task = make("after");
        scheduler.run_later(1, move || task());

        scheduler.tick();
        assert_eq!(*log.lock().unwrap(), ["after"]);
    }
}
