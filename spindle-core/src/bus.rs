//! The native event bus the host engine exposes.

use crate::event::{SharedNative, TypeKey};
use std::sync::Arc;

/// Callback installed on a native bus.
///
/// Invoked synchronously on the host's delivering thread.
pub type NativeCallback = Arc<dyn Fn(&SharedNative) + Send + Sync>;

/// A host event bus that accepts per-type subscriptions.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a native event bus",
    label = "missing `NativeBus` implementation",
    note = "Hosts must implement `subscribe` so the bridge can install its listeners."
)]
pub trait NativeBus: Send + Sync {
    /// Subscribe `callback` to every native event of type `event_type`.
    fn subscribe(&self, event_type: TypeKey, callback: NativeCallback);
}
