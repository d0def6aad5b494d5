//! # Listener Installer / Event Bridge
//!
//! Subscribes to the native bus once per bridged native event type. On
//! delivery the registered constructor wraps the native event, the wrapper
//! is dispatched synchronously to every handler for its lineage, and then
//! dropped.
//!
//! Installing is idempotent: the bridge remembers which native types it has
//! subscribed to, and a repeated [`Bridge::install`] only picks up what is
//! new.

use crate::context::BridgeContext;
use spindle_core::{NativeBus, NativeCallback, SharedNative, TypeKey};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

/// What one [`Bridge::install`] call did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Native types newly subscribed.
    pub installed: Vec<TypeKey>,
    /// Native types that were already subscribed.
    pub already_installed: usize,
    /// Declared wrappers without a bridge path.
    pub unbridged: Vec<TypeKey>,
    /// Wrappers skipped because another wrapper owns their native type.
    pub conflicts: Vec<TypeKey>,
}

#[derive(Default)]
struct BridgeState {
    // native type -> wrapper that owns its subscription
    installed: HashMap<TypeKey, TypeKey>,
    reported: HashSet<TypeKey>,
}

/// Bridges a native bus into a [`BridgeContext`]'s dispatcher.
pub struct Bridge {
    context: Arc<BridgeContext>,
    state: Mutex<BridgeState>,
    warn_unbridged: bool,
}

impl Bridge {
    /// A bridge dispatching into `context`.
    pub fn new(context: Arc<BridgeContext>) -> Self {
        Self {
            context,
            state: Mutex::new(BridgeState::default()),
            warn_unbridged: true,
        }
    }

    /// Whether declared wrappers without a bridge path are logged.
    pub fn with_unbridged_warnings(mut self, enabled: bool) -> Self {
        self.warn_unbridged = enabled;
        self
    }

    /// The context events are dispatched into.
    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.context
    }

    /// Subscribe to `bus` for every bridged wrapper not yet installed.
    pub fn install(&self, bus: &dyn NativeBus) -> InstallReport {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut report = InstallReport::default();

        for entry in self.context.registries().wrappers().entries() {
            let wrapper = entry.wrapper();
            let (Some(native), Some(constructor)) = (entry.native(), entry.constructor()) else {
                if state.reported.insert(wrapper) && self.warn_unbridged {
                    tracing::warn!(
                        target: "spindle::bridge",
                        wrapper = entry.name(),
                        "event has no native constructor; it will only fire from scripts"
                    );
                }
                report.unbridged.push(wrapper);
                continue;
            };

            match state.installed.get(&native) {
                Some(&owner) if owner == wrapper => {
                    report.already_installed += 1;
                }
                Some(&owner) => {
                    if state.reported.insert(wrapper) {
                        tracing::warn!(
                            target: "spindle::bridge",
                            wrapper = entry.name(),
                            native = %native,
                            owner = %owner,
                            "native event already bridged by another wrapper; skipping"
                        );
                    }
                    report.conflicts.push(wrapper);
                }
                None => {
                    let context = Arc::clone(&self.context);
                    let callback: NativeCallback = Arc::new(move |event: &SharedNative| {
                        let Some(wrapped) = constructor(Arc::clone(event)) else {
                            tracing::warn!(
                                target: "spindle::bridge",
                                wrapper = %wrapper,
                                "constructor rejected a native event"
                            );
                            return;
                        };
                        let report = context.dispatch(&*wrapped);
                        tracing::trace!(
                            target: "spindle::bridge",
                            wrapper = %wrapper,
                            invoked = report.invoked,
                            failures = report.failures.len(),
                            "bridged event"
                        );
                    });
                    bus.subscribe(native, callback);
                    state.installed.insert(native, wrapper);
                    tracing::debug!(
                        target: "spindle::bridge",
                        wrapper = entry.name(),
                        native = %native,
                        "installed listener"
                    );
                    report.installed.push(native);
                }
            }
        }
        report
    }

    /// Whether `native` has a subscription.
    pub fn is_installed(&self, native: TypeKey) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .installed
            .contains_key(&native)
    }

    /// Number of native types with a subscription.
    pub fn installed_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .installed
            .len()
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("installed", &self.installed_count())
            .field("warn_unbridged", &self.warn_unbridged)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bus::SimpleEventBus,
        context::ContextBuilder,
        testing::CountingHandler,
        wrappers::WrapperSpec,
    };
    use spindle_core::{HandlerMeta, ScriptEvent, script_event};

    struct Spawned;

    script_event! {
        struct Join(Spawned);
    }

    script_event! {
        struct JoinAgain(Spawned);
    }

    struct Loaded;
    impl ScriptEvent for Loaded {}

    #[test]
    fn install_twice_subscribes_once() {
        let counter = CountingHandler::new();
        let mut builder = ContextBuilder::new();
        builder.wrappers().register::<Join>(WrapperSpec::new("join")).unwrap();
        builder.handlers().register(
            TypeKey::of::<Join>(),
            counter.clone(),
            HandlerMeta::new("count"),
        );
        let bridge = Bridge::new(Arc::new(builder.build().unwrap()));
        let bus = SimpleEventBus::new();

        let first = bridge.install(&bus);
        let second = bridge.install(&bus);

        assert_eq!(first.installed, [TypeKey::of::<Spawned>()]);
        assert!(second.installed.is_empty());
        assert_eq!(second.already_installed, 1);
        assert_eq!(bus.subscriber_count(TypeKey::of::<Spawned>()), 1);

        bus.publish(Spawned);
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn declared_and_conflicting_wrappers_are_skipped() {
        let mut builder = ContextBuilder::new();
        builder.wrappers().register::<Join>(WrapperSpec::new("join")).unwrap();
        builder
            .wrappers()
            .register::<JoinAgain>(WrapperSpec::new("join again"))
            .unwrap();
        builder
            .wrappers()
            .declare::<Loaded>(WrapperSpec::new("load"))
            .unwrap();
        let bridge = Bridge::new(Arc::new(builder.build().unwrap()));
        let bus = SimpleEventBus::new();

        let report = bridge.install(&bus);

        assert_eq!(report.installed.len(), 1);
        assert_eq!(report.conflicts, [TypeKey::of::<JoinAgain>()]);
        assert_eq!(report.unbridged, [TypeKey::of::<Loaded>()]);
        assert_eq!(bridge.installed_count(), 1);
    }
}
