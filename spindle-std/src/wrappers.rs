//! # Wrapper Type Registry
//!
//! Associates each wrapper type with the native event it wraps, the
//! constructor that builds it, its ancestor interfaces, and the patterns
//! scripts use to name it.
//!
//! Registration is explicit: [`WrapperRegistryBuilder::register`] takes the
//! constructor from the [`EventWrapper`] impl. Script-internal events that
//! the host never emits are [`declare`](WrapperRegistryBuilder::declare)d
//! instead and have no bridge path.
//!
//! # Lineage
//!
//! When the registry is built, every wrapper's lineage (itself, then each
//! ancestor interface, breadth-first in declaration order, de-duplicated) is
//! flattened once so dispatch never walks the interface graph.

use crate::{syntax::Pattern, types::TypeRegistry};
use spindle_core::{
    Constructor, EventWrapper, RegistrationError, ScriptEvent, TypeKey, construct,
};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    fmt,
    sync::Arc,
};

/// How a wrapper is described to the registry.
#[derive(Debug, Clone, Default)]
pub struct WrapperSpec {
    name: String,
    patterns: Vec<String>,
    bases: Vec<TypeKey>,
    description: Option<String>,
}

impl WrapperSpec {
    /// A wrapper called `name` in logs and documentation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an event pattern.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Add a direct ancestor interface.
    pub fn base<I: ?Sized + 'static>(mut self) -> Self {
        self.bases.push(TypeKey::of::<I>());
        self
    }

    /// Add a direct ancestor interface by key.
    pub fn base_key(mut self, key: TypeKey) -> Self {
        self.bases.push(key);
        self
    }

    /// Set the documentation text.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A registered wrapper.
pub struct WrapperEntry {
    name: String,
    wrapper: TypeKey,
    native: Option<TypeKey>,
    constructor: Option<Constructor>,
    patterns: Vec<Pattern>,
    bases: Vec<TypeKey>,
    description: Option<String>,
}

impl WrapperEntry {
    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapper type.
    pub fn wrapper(&self) -> TypeKey {
        self.wrapper
    }

    /// The wrapped native event type; `None` for declared events.
    pub fn native(&self) -> Option<TypeKey> {
        self.native
    }

    /// The constructor; `None` for declared events.
    pub fn constructor(&self) -> Option<Constructor> {
        self.constructor
    }

    /// Compiled event patterns.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Direct ancestor interfaces.
    pub fn bases(&self) -> &[TypeKey] {
        &self.bases
    }

    /// Documentation text.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether this entry can be bridged from the native bus.
    pub fn is_bridged(&self) -> bool {
        self.native.is_some() && self.constructor.is_some()
    }
}

impl fmt::Debug for WrapperEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperEntry")
            .field("name", &self.name)
            .field("wrapper", &self.wrapper)
            .field("native", &self.native)
            .field("bridged", &self.is_bridged())
            .finish()
    }
}

/// Collects wrapper registrations.
#[derive(Default)]
pub struct WrapperRegistryBuilder {
    entries: Vec<WrapperEntry>,
    by_wrapper: HashMap<TypeKey, usize>,
    interfaces: HashMap<TypeKey, Vec<TypeKey>>,
}

impl WrapperRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register wrapper `W` for bridging from its native event type.
    pub fn register<W: EventWrapper>(&mut self, spec: WrapperSpec) -> Result<(), RegistrationError> {
        self.register_with(
            spec,
            TypeKey::of::<W>(),
            TypeKey::of::<W::Native>(),
            Some(construct::<W>),
        )
    }

    /// Register a wrapper from its parts.
    ///
    /// A missing constructor, or a wrapper that already has one, is a fatal
    /// configuration error.
    pub fn register_with(
        &mut self,
        spec: WrapperSpec,
        wrapper: TypeKey,
        native: TypeKey,
        constructor: Option<Constructor>,
    ) -> Result<(), RegistrationError> {
        let Some(constructor) = constructor else {
            return Err(RegistrationError::MissingConstructor {
                wrapper: wrapper.name(),
            });
        };
        self.insert(spec, wrapper, Some(native), Some(constructor))
    }

    /// Declare script event `E`, which has no native counterpart.
    pub fn declare<E: ScriptEvent>(&mut self, spec: WrapperSpec) -> Result<(), RegistrationError> {
        self.insert(spec, TypeKey::of::<E>(), None, None)
    }

    /// Declare interface `I` with its own direct ancestors.
    pub fn interface<I: ?Sized + 'static>(&mut self, parents: &[TypeKey]) {
        self.interfaces
            .entry(TypeKey::of::<I>())
            .or_default()
            .extend_from_slice(parents);
    }

    fn insert(
        &mut self,
        spec: WrapperSpec,
        wrapper: TypeKey,
        native: Option<TypeKey>,
        constructor: Option<Constructor>,
    ) -> Result<(), RegistrationError> {
        if let Some(&index) = self.by_wrapper.get(&wrapper) {
            let existing = self.entries[index]
                .native
                .map_or("<declared>", |n| n.name());
            return Err(RegistrationError::DuplicateConstructor {
                wrapper: wrapper.name(),
                existing,
            });
        }

        let patterns = spec
            .patterns
            .iter()
            .map(|p| Pattern::compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            target: "spindle::bridge",
            wrapper = %wrapper,
            native = ?native.map(|n| n.short_name()),
            "registered wrapper"
        );

        self.by_wrapper.insert(wrapper, self.entries.len());
        self.entries.push(WrapperEntry {
            name: spec.name,
            wrapper,
            native,
            constructor,
            patterns,
            bases: spec.bases,
            description: spec.description,
        });
        Ok(())
    }

    /// Number of registered wrappers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve event patterns and flatten lineages.
    pub fn build(mut self, types: &TypeRegistry) -> Result<WrapperRegistry, RegistrationError> {
        for entry in &mut self.entries {
            for pattern in &mut entry.patterns {
                pattern.resolve(types)?;
            }
        }

        let lineage = self
            .entries
            .iter()
            .map(|entry| {
                let flat = flatten(entry.wrapper, &entry.bases, &self.interfaces);
                (entry.wrapper, Arc::from(flat))
            })
            .collect();

        Ok(WrapperRegistry {
            entries: self.entries,
            by_wrapper: self.by_wrapper,
            lineage,
        })
    }
}

fn flatten(
    wrapper: TypeKey,
    bases: &[TypeKey],
    interfaces: &HashMap<TypeKey, Vec<TypeKey>>,
) -> Vec<TypeKey> {
    let mut seen = HashSet::from([wrapper]);
    let mut flat = vec![wrapper];
    let mut queue: VecDeque<TypeKey> = bases.iter().copied().collect();

    while let Some(key) = queue.pop_front() {
        if !seen.insert(key) {
            continue;
        }
        flat.push(key);
        if let Some(parents) = interfaces.get(&key) {
            queue.extend(parents.iter().copied());
        }
    }
    flat
}

/// Read-only wrapper lookup.
pub struct WrapperRegistry {
    entries: Vec<WrapperEntry>,
    by_wrapper: HashMap<TypeKey, usize>,
    lineage: HashMap<TypeKey, Arc<[TypeKey]>>,
}

impl WrapperRegistry {
    /// All entries in registration order.
    pub fn entries(&self) -> &[WrapperEntry] {
        &self.entries
    }

    /// The entry of a wrapper type.
    pub fn get(&self, wrapper: TypeKey) -> Option<&WrapperEntry> {
        self.by_wrapper.get(&wrapper).map(|&i| &self.entries[i])
    }

    /// The flattened lineage of a wrapper: itself, then every ancestor.
    ///
    /// Unregistered types have a lineage of just themselves.
    pub fn lineage(&self, wrapper: TypeKey) -> Arc<[TypeKey]> {
        self.lineage
            .get(&wrapper)
            .cloned()
            .unwrap_or_else(|| Arc::from([wrapper]))
    }

    /// Number of registered wrappers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for WrapperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.entries).finish()
    }
}
