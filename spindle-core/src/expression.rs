//! # Runtime Nodes (Expression, Effect)
//!
//! Expressions and effects are what the pattern registry produces once a
//! line of script text matched a pattern and its factory accepted the bound
//! slots. Both evaluate against the event currently being dispatched.
//!
//! # Plurality
//!
//! An expression is either *single* (yields at most one value) or *plural*
//! (yields an ordered, finite, possibly empty sequence). Asking a plural
//! source for a single value fails for that evaluation only.

use crate::{
    error::EvalError,
    event::{ScriptEvent, TypeKey},
    value::Value,
};
use std::{any::Any, fmt};

/// A value-producing runtime node.
pub trait Expression: Send + Sync + fmt::Debug {
    /// The type of every value this expression yields.
    fn return_type(&self) -> TypeKey;

    /// Whether this expression yields at most one value.
    fn is_single(&self) -> bool;

    /// Evaluate to every value, in order.
    fn get_all(&self, event: &dyn ScriptEvent) -> Result<Vec<Value>, EvalError>;

    /// Evaluate to at most one value.
    ///
    /// Fails with [`EvalError::NotSingle`] if the source yields more.
    fn get_single(&self, event: &dyn ScriptEvent) -> Result<Option<Value>, EvalError> {
        let mut values = self.get_all(event)?;
        match values.len() {
            0 | 1 => Ok(values.pop()),
            count => Err(EvalError::NotSingle {
                expression: self.describe(),
                count,
            }),
        }
    }

    /// Text used in diagnostics.
    fn describe(&self) -> String {
        format!("{self:?}")
    }
}

impl<'a> dyn Expression + 'a {
    /// Evaluate to every value as `T`.
    pub fn all<T: Any + Clone>(&self, event: &dyn ScriptEvent) -> Result<Vec<T>, EvalError> {
        self.get_all(event)?.iter().map(Value::get::<T>).collect()
    }

    /// Evaluate to at most one `T`.
    pub fn single<T: Any + Clone>(&self, event: &dyn ScriptEvent) -> Result<Option<T>, EvalError> {
        self.get_single(event)?.map(|v| v.get::<T>()).transpose()
    }

    /// Evaluate to exactly one `T`.
    pub fn require<T: Any + Clone>(&self, event: &dyn ScriptEvent) -> Result<T, EvalError> {
        self.single::<T>(event)?
            .ok_or_else(|| EvalError::Missing(self.describe()))
    }
}

/// A side-effecting runtime node.
pub trait Effect: Send + Sync + fmt::Debug {
    /// Execute against the current event.
    fn execute(&self, event: &dyn ScriptEvent) -> Result<(), EvalError>;

    /// Text used in diagnostics.
    fn describe(&self) -> String {
        format!("{self:?}")
    }
}
