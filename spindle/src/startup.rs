//! Startup orchestration.
//!
//! [`Startup::start`] runs the one registration phase:
//!
//! 1. every extension's [`Extension::register`] runs exactly once, in the
//!    order the extensions were added;
//! 2. the registries are sealed and [`Extension::sealed`] runs;
//! 3. scripts are parsed and their triggers registered;
//! 4. the dispatcher is frozen and the bridge installed on the native bus;
//! 5. the scheduler is attached to the ticker;
//! 6. [`ScriptLoad`] is dispatched once.
//!
//! The registrar is consumed by step 2, so nothing can register afterwards.

use crate::{
    builtins::{Builtins, ScriptLoad},
    config::{Config, ConfigError},
    host::World,
    script::{LoadedScript, load_script},
};
use spindle_core::{NativeBus, RegistrationError, ScriptEvent, Ticker};
#[cfg(feature = "tokio")]
use spindle_std::scheduler::IntervalTicker;
use spindle_std::{
    bridge::{Bridge, InstallReport},
    context::{BridgeContext, ContextBuilder, Registries, SealedContext},
    dispatch::DispatchReport,
    scheduler::Scheduler,
};
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};
use thiserror::Error;

/// A unit of registration: types, wrappers, syntax and handlers.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a Spindle extension",
    label = "missing `Extension` implementation",
    note = "Extensions register into the `ContextBuilder` passed to `register`."
)]
pub trait Extension: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Register everything this extension provides.
    fn register(&self, registrar: &mut ContextBuilder) -> Result<(), RegistrationError>;

    /// Called once the registries are sealed, before scripts load.
    ///
    /// Handlers that need the frozen registries are added here.
    fn sealed(&self, context: &mut SealedContext) -> Result<(), RegistrationError> {
        let _ = context;
        Ok(())
    }
}

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    /// An extension's registration failed.
    #[error("extension `{name}` failed to register: {source}")]
    Extension {
        /// The extension.
        name: String,
        /// What it got wrong.
        #[source]
        source: RegistrationError,
    },

    /// Sealing the registries failed.
    #[error("invalid registration: {0}")]
    Registration(#[from] RegistrationError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Startup already ran and the registrar is gone.
    #[error("startup already ran; registration is closed")]
    Closed,
}

/// An extension submitted with `inventory::submit!`.
///
/// ```rust,ignore
/// inventory::submit! {
///     ExtensionRegistration::new("my-extension", || Box::new(MyExtension))
/// }
/// ```
#[cfg(feature = "inventory")]
pub struct ExtensionRegistration {
    name: &'static str,
    create: fn() -> Box<dyn Extension>,
}

#[cfg(feature = "inventory")]
impl ExtensionRegistration {
    /// A registration creating its extension with `create`.
    pub const fn new(name: &'static str, create: fn() -> Box<dyn Extension>) -> Self {
        Self { name, create }
    }
}

#[cfg(feature = "inventory")]
inventory::collect!(ExtensionRegistration);

/// Builds and starts a bridge.
pub struct Startup {
    config: Config,
    registrar: Mutex<Option<ContextBuilder>>,
    extensions: Vec<Arc<dyn Extension>>,
    scripts: Vec<(String, String)>,
}

impl Startup {
    /// A startup with no extensions.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registrar: Mutex::new(Some(ContextBuilder::new())),
            extensions: Vec::new(),
            scripts: Vec::new(),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Add an extension.
    pub fn with_extension<E: Extension + 'static>(mut self, extension: E) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    /// Add the built-ins for `world`, set up from this startup's config.
    pub fn with_builtins(self, world: Arc<dyn World>) -> Self {
        let builtins = Builtins::from_config(world, &self.config);
        self.with_extension(builtins)
    }

    /// Add every extension submitted through `inventory`.
    #[cfg(feature = "inventory")]
    pub fn with_collected_extensions(mut self) -> Self {
        for registration in inventory::iter::<ExtensionRegistration>() {
            tracing::debug!(
                target: "spindle::startup",
                extension = registration.name,
                "collected extension"
            );
            self.extensions.push(Arc::from((registration.create)()));
        }
        self
    }

    /// Add a script to load during startup.
    pub fn with_script(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.scripts.push((name.into(), source.into()));
        self
    }

    /// Register directly, before startup.
    ///
    /// Safe to call from several threads; calls are serialized. Fails with
    /// [`StartupError::Closed`] once [`start`](Self::start) has run.
    pub fn register<F>(&self, f: F) -> Result<(), StartupError>
    where
        F: FnOnce(&mut ContextBuilder) -> Result<(), RegistrationError>,
    {
        let mut registrar = self.registrar.lock().unwrap_or_else(PoisonError::into_inner);
        let builder = registrar.as_mut().ok_or(StartupError::Closed)?;
        f(builder)?;
        Ok(())
    }

    /// Whether [`start`](Self::start) has run.
    pub fn is_started(&self) -> bool {
        self.registrar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Run registration, load scripts, and go live on `bus` and `ticker`.
    pub fn start(&self, bus: &dyn NativeBus, ticker: &dyn Ticker) -> Result<Running, StartupError> {
        self.config.validate()?;

        let mut builder = self
            .registrar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(StartupError::Closed)?;

        for extension in &self.extensions {
            extension
                .register(&mut builder)
                .map_err(|source| StartupError::Extension {
                    name: extension.name().to_owned(),
                    source,
                })?;
            tracing::debug!(target: "spindle::startup", extension = extension.name(), "registered");
        }

        let mut sealed = builder.seal()?;
        for extension in &self.extensions {
            extension
                .sealed(&mut sealed)
                .map_err(|source| StartupError::Extension {
                    name: extension.name().to_owned(),
                    source,
                })?;
        }

        let scripts: Vec<LoadedScript> = self
            .scripts
            .iter()
            .map(|(name, source)| load_script(&mut sealed, name, source))
            .collect();

        let context = Arc::new(sealed.finish());
        let bridge = Bridge::new(Arc::clone(&context))
            .with_unbridged_warnings(self.config.log_unbridged_events);
        let install = bridge.install(bus);

        let scheduler = Arc::new(Scheduler::new());
        ticker.initialize(scheduler.tick_fn());

        tracing::info!(
            target: "spindle::startup",
            extensions = self.extensions.len(),
            scripts = scripts.len(),
            listeners = install.installed.len(),
            "bridge started"
        );

        let running = Running {
            context,
            bridge,
            scheduler,
            scripts,
            install,
            #[cfg(feature = "tokio")]
            interval: None,
        };
        let report = running.dispatch(&ScriptLoad);
        for failure in &report.failures {
            tracing::warn!(target: "spindle::startup", %failure, "script load handler failed");
        }
        Ok(running)
    }

    /// Start with an [`IntervalTicker`] built from the config's
    /// `tick_interval_ms`, for hosts that do not drive ticks themselves.
    ///
    /// Must be called inside a tokio runtime. The ticker lives as long as
    /// the returned [`Running`].
    #[cfg(feature = "tokio")]
    pub fn start_on_interval(&self, bus: &dyn NativeBus) -> Result<Running, StartupError> {
        let ticker = self.config.ticker();
        let mut running = self.start(bus, &ticker)?;
        tracing::debug!(
            target: "spindle::startup",
            period_ms = self.config.tick_interval_ms,
            "ticking on interval"
        );
        running.interval = Some(ticker);
        Ok(running)
    }
}

impl fmt::Debug for Startup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Startup")
            .field("config", &self.config)
            .field(
                "extensions",
                &self.extensions.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .field("scripts", &self.scripts.len())
            .field("started", &self.is_started())
            .finish()
    }
}

/// A started bridge.
pub struct Running {
    context: Arc<BridgeContext>,
    bridge: Bridge,
    scheduler: Arc<Scheduler>,
    scripts: Vec<LoadedScript>,
    install: InstallReport,
    #[cfg(feature = "tokio")]
    interval: Option<IntervalTicker>,
}

impl Running {
    /// The frozen context.
    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.context
    }

    /// The frozen registries.
    pub fn registries(&self) -> &Arc<Registries> {
        self.context.registries()
    }

    /// The installed bridge.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// The tick scheduler.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Per-script load results, in the order scripts were added.
    pub fn scripts(&self) -> &[LoadedScript] {
        &self.scripts
    }

    /// What the bridge installed at startup.
    pub fn install_report(&self) -> &InstallReport {
        &self.install
    }

    /// The ticker owned by a bridge started with
    /// [`Startup::start_on_interval`].
    #[cfg(feature = "tokio")]
    pub fn interval_ticker(&self) -> Option<&IntervalTicker> {
        self.interval.as_ref()
    }

    /// Dispatch a script event directly.
    pub fn dispatch(&self, event: &dyn ScriptEvent) -> DispatchReport {
        self.context.dispatch(event)
    }
}

impl fmt::Debug for Running {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Running")
            .field("context", &self.context)
            .field("bridge", &self.bridge)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
