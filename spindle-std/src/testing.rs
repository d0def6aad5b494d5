//! Testing utilities for Spindle.
//!
//! Handlers that observe dispatch without needing a host.
//!
//! # Features
//!
//! - [`RecordingHandler`]: records the name of every event it sees, or a
//!   fixed label per registration
//! - [`CountingHandler`]: counts invocations
//! - [`FailingHandler`]: always returns an error

use spindle_core::{BoxError, Handler, ScriptEvent};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Recording Handler
// ============================================================================

/// A handler that records what it receives.
///
/// Clones share one log, so a test can keep a clone and inspect it after the
/// original was moved into a dispatcher.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHandler::new();
/// builder.register(key, recorder.labelled("first"), HandlerMeta::new("first"));
/// builder.register(key, recorder.labelled("second"), HandlerMeta::new("second"));
///
/// dispatcher.dispatch(&event);
/// assert_eq!(recorder.labels(), ["first", "second"]);
/// ```
#[derive(Clone, Default)]
pub struct RecordingHandler {
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingHandler {
    /// Create a recorder with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler appending `label` to this recorder's log.
    pub fn labelled(&self, label: &'static str) -> impl Handler + use<> {
        let log = Arc::clone(&self.log);
        move |_: &dyn ScriptEvent| -> Result<(), BoxError> {
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(label.to_owned());
            Ok(())
        }
    }

    /// Everything recorded so far, in order.
    pub fn labels(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded entries.
    pub fn count(&self) -> usize {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Clear the log.
    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Handler for RecordingHandler {
    fn handle(&self, event: &dyn ScriptEvent) -> Result<(), BoxError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.event_name().to_owned());
        Ok(())
    }
}

// ============================================================================
// Counting Handler
// ============================================================================

/// A handler that counts invocations.
#[derive(Clone, Default)]
pub struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Invocations so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reset to zero.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

impl Handler for CountingHandler {
    fn handle(&self, _event: &dyn ScriptEvent) -> Result<(), BoxError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Failing Handler
// ============================================================================

/// A handler that always fails with a fixed message.
#[derive(Debug, Clone)]
pub struct FailingHandler {
    message: &'static str,
}

impl FailingHandler {
    /// Fail with `message`.
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

impl Handler for FailingHandler {
    fn handle(&self, _event: &dyn ScriptEvent) -> Result<(), BoxError> {
        Err(self.message.into())
    }
}
