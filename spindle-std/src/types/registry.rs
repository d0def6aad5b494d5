//! Type registry and value converters.

use super::TypeInfo;
use spindle_core::{RegistrationError, TypeKey, Value};
use std::{any::Any, collections::HashMap, fmt, sync::Arc};

/// Converts a value of one type into another; `None` if not convertible.
pub type Converter = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Collects type descriptors and converters during registration.
#[derive(Default)]
pub struct TypeRegistryBuilder {
    types: Vec<TypeInfo>,
    by_name: HashMap<String, (usize, bool)>,
    by_key: HashMap<TypeKey, usize>,
    converters: HashMap<(TypeKey, TypeKey), Converter>,
}

impl TypeRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type descriptor.
    ///
    /// Fails if the Rust type, its name or its plural name is taken.
    pub fn register(&mut self, info: TypeInfo) -> Result<(), RegistrationError> {
        if self.by_key.contains_key(&info.key()) {
            return Err(RegistrationError::DuplicateType(info.key().to_string()));
        }
        for name in [info.name(), info.plural()] {
            if self.by_name.contains_key(name) {
                return Err(RegistrationError::DuplicateType(name.to_owned()));
            }
        }

        let index = self.types.len();
        self.by_name.insert(info.name().to_owned(), (index, false));
        if info.plural() != info.name() {
            self.by_name.insert(info.plural().to_owned(), (index, true));
        }
        self.by_key.insert(info.key(), index);
        tracing::debug!(target: "spindle::types", name = info.name(), "registered type");
        self.types.push(info);
        Ok(())
    }

    /// Register a converter from `A` to `B`.
    pub fn converter<A, B, F>(&mut self, f: F)
    where
        A: Any + Send + Sync,
        B: Any + Send + Sync,
        F: Fn(&A) -> Option<B> + Send + Sync + 'static,
    {
        let converter: Converter =
            Arc::new(move |value: &Value| value.downcast_ref::<A>().and_then(&f).map(Value::new));
        self.converters
            .insert((TypeKey::of::<A>(), TypeKey::of::<B>()), converter);
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type has been registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Freeze the registry.
    pub fn build(self) -> TypeRegistry {
        TypeRegistry {
            types: self.types,
            by_name: self.by_name,
            by_key: self.by_key,
            converters: self.converters,
        }
    }
}

/// Read-only lookup of type descriptors and converters.
pub struct TypeRegistry {
    types: Vec<TypeInfo>,
    by_name: HashMap<String, (usize, bool)>,
    by_key: HashMap<TypeKey, usize>,
    converters: HashMap<(TypeKey, TypeKey), Converter>,
}

impl TypeRegistry {
    /// Look up a type by its singular or plural code name.
    ///
    /// The flag is `true` when `name` was the plural form.
    pub fn lookup(&self, name: &str) -> Option<(&TypeInfo, bool)> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&(index, plural)| (&self.types[index], plural))
    }

    /// The descriptor of a Rust type.
    pub fn get(&self, key: TypeKey) -> Option<&TypeInfo> {
        self.by_key.get(&key).map(|&index| &self.types[index])
    }

    /// The descriptor of `T`.
    pub fn get_of<T: Any>(&self) -> Option<&TypeInfo> {
        self.get(TypeKey::of::<T>())
    }

    /// All descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.iter()
    }

    /// Whether a value of type `from` can fill a slot of type `to`.
    pub fn converts(&self, from: TypeKey, to: TypeKey) -> bool {
        from == to || self.converters.contains_key(&(from, to))
    }

    /// The converter from `from` to `to`, if registered.
    pub fn converter(&self, from: TypeKey, to: TypeKey) -> Option<&Converter> {
        self.converters.get(&(from, to))
    }

    /// Convert a value to type `to`.
    pub fn convert(&self, value: &Value, to: TypeKey) -> Option<Value> {
        if value.key() == to {
            return Some(value.clone());
        }
        self.converter(value.key(), to).and_then(|c| c(value))
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.types)
            .field("converters", &self.converters.len())
            .finish()
    }
}
