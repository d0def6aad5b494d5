//! Dynamically typed script values.

use crate::{error::EvalError, event::TypeKey};
use std::{any::Any, fmt, sync::Arc};

/// A value produced by an expression.
///
/// Cloning is cheap: the payload is shared.
#[derive(Clone)]
pub struct Value {
    key: TypeKey,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Value {
    /// Wrap a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            inner: value,
        }
    }

    /// The key of the payload type.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Whether the payload is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.key.id() == std::any::TypeId::of::<T>()
    }

    /// Borrow the payload as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Clone the payload out as a `T`.
    pub fn get<T: Any + Clone>(&self) -> Result<T, EvalError> {
        self.downcast_ref::<T>()
            .cloned()
            .ok_or(EvalError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: self.key.name(),
            })
    }

    /// The type-erased payload.
    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        &*self.inner
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.key)
    }
}
