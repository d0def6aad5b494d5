//! Periodic per-tick work.

use std::sync::Arc;

/// A zero-argument callback run once per host tick.
pub type Tick = Arc<dyn Fn() + Send + Sync>;

/// Drives a [`Tick`] callback once per host tick.
///
/// Implementations decide what a tick is: a host scheduler, a timer, or a
/// test calling it by hand.
pub trait Ticker: Send + Sync {
    /// Start invoking `tick` every tick.
    fn initialize(&self, tick: Tick);
}
