//! [`Ticker`] implementations.

use spindle_core::{Tick, Ticker};
use std::sync::{Mutex, PoisonError};

/// A ticker advanced by hand, for hosts that own their loop and for tests.
#[derive(Default)]
pub struct ManualTicker {
    tick: Mutex<Option<Tick>>,
}

impl ManualTicker {
    /// A ticker with nothing attached yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one tick; returns `false` if nothing is attached.
    pub fn advance(&self) -> bool {
        // Clone out so the callback may re-enter the ticker.
        let tick = self
            .tick
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match tick {
            Some(tick) => {
                tick();
                true
            }
            None => false,
        }
    }

    /// Run `n` ticks.
    pub fn advance_by(&self, n: u64) {
        for _ in 0..n {
            if !self.advance() {
                break;
            }
        }
    }

    /// Whether a tick callback is attached.
    pub fn is_initialized(&self) -> bool {
        self.tick
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Ticker for ManualTicker {
    fn initialize(&self, tick: Tick) {
        let mut slot = self.tick.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            tracing::warn!(target: "spindle::scheduler", "ticker re-initialized; replacing callback");
        }
        *slot = Some(tick);
    }
}

/// Runs a host hook before every tick of an inner ticker.
///
/// Lets a host piggyback its own per-tick work on the scheduler's clock.
pub struct ProxyTicker<T> {
    inner: T,
    hook: Tick,
}

impl<T: Ticker> ProxyTicker<T> {
    /// Wrap `inner`, calling `hook` before each tick.
    pub fn new<F>(inner: T, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner,
            hook: std::sync::Arc::new(hook),
        }
    }

    /// The wrapped ticker.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Ticker> Ticker for ProxyTicker<T> {
    fn initialize(&self, tick: Tick) {
        let hook = self.hook.clone();
        self.inner.initialize(std::sync::Arc::new(move || {
            hook();
            tick();
        }));
    }
}

#[cfg(feature = "tokio")]
pub use interval::IntervalTicker;

#[cfg(feature = "tokio")]
mod interval {
    use spindle_core::{Tick, Ticker};
    use std::{
        sync::{Mutex, PoisonError},
        time::Duration,
    };
    use tokio::{runtime::Handle, task::JoinHandle};

    /// Ticks on a fixed wall-clock interval inside a tokio runtime.
    ///
    /// Initializing outside a runtime logs an error and leaves the ticker
    /// idle. The background task is aborted on [`IntervalTicker::stop`] or
    /// drop.
    pub struct IntervalTicker {
        period: Duration,
        task: Mutex<Option<JoinHandle<()>>>,
    }

    impl IntervalTicker {
        /// Tick every `period`.
        pub fn new(period: Duration) -> Self {
            Self {
                period,
                task: Mutex::new(None),
            }
        }

        /// Tick every `millis` milliseconds.
        pub fn from_millis(millis: u64) -> Self {
            Self::new(Duration::from_millis(millis))
        }

        /// The tick period.
        pub fn period(&self) -> Duration {
            self.period
        }

        /// Whether the background task is running.
        pub fn is_running(&self) -> bool {
            self.task
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .as_ref()
                .is_some_and(|task| !task.is_finished())
        }

        /// Abort the background task.
        pub fn stop(&self) {
            if let Some(task) = self
                .task
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
            {
                task.abort();
            }
        }
    }

    impl Ticker for IntervalTicker {
        fn initialize(&self, tick: Tick) {
            let Ok(handle) = Handle::try_current() else {
                tracing::error!(
                    target: "spindle::scheduler",
                    "interval ticker initialized outside a tokio runtime"
                );
                return;
            };
            let period = self.period;
            let task = handle.spawn(async move {
                let mut interval = tokio::time::interval(period);
                // The first tick completes immediately.
                interval.tick().await;
                loop {
                    interval.tick().await;
                    tick();
                }
            });
            if let Some(previous) = self
                .task
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(task)
            {
                previous.abort();
            }
        }
    }

    impl Drop for IntervalTicker {
        fn drop(&mut self) {
            self.stop();
        }
    }

}
