//! Error types for Spindle.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`SpindleError`] - Top-level error type for all Spindle operations
//! - [`RegistrationError`] - Configuration errors raised while registering
//! - [`ConversionError`] - Errors from the type conversion layer
//! - [`EvalError`] - Errors while evaluating expressions and effects
//! - [`HandlerError`] - Errors from individual handlers

use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Spindle operations.
#[derive(Error, Debug)]
pub enum SpindleError {
    /// A registration was rejected.
    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// A value could not be converted.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// An expression or effect failed to evaluate.
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// A handler failed.
    #[error("handler error: {0}")]
    Handler(#[from] HandlerError),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Configuration errors detected during the registration phase.
///
/// Every variant is fatal: startup must not continue with a partially wired
/// bridge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A wrapper was registered for bridging without a constructor.
    #[error("wrapper `{wrapper}` has no constructor accepting a single native event")]
    MissingConstructor {
        /// The wrapper type name.
        wrapper: &'static str,
    },

    /// A wrapper was registered twice, giving it two constructors.
    #[error("wrapper `{wrapper}` already has a constructor for `{existing}`")]
    DuplicateConstructor {
        /// The wrapper type name.
        wrapper: &'static str,
        /// The native event type of the first registration.
        existing: &'static str,
    },

    /// Two type descriptors share a code name or a Rust type.
    #[error("type `{0}` is already registered")]
    DuplicateType(String),

    /// A pattern slot names a type nobody registered.
    #[error("unknown type `{name}` in pattern `{pattern}`")]
    UnknownType {
        /// The slot's type name.
        name: String,
        /// The offending pattern.
        pattern: String,
    },

    /// A pattern could not be compiled.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A syntax element was registered without any pattern.
    #[error("no patterns given for `{0}`")]
    NoPatterns(String),
}

/// Errors from the type conversion layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// A required field is absent from a field bag.
    #[error("missing field `{0}`")]
    MissingField(String),

    /// A field holds a different primitive kind than the type expects.
    #[error("field `{field}` is not a {expected}")]
    WrongFieldType {
        /// The field name.
        field: String,
        /// The expected primitive kind.
        expected: &'static str,
    },

    /// The serializer does not implement the requested deserialization path.
    #[error("type `{0}` does not support this deserialization path")]
    Unsupported(String),

    /// A value of a different type was handed to a type descriptor.
    #[error("value is not a `{0}`")]
    TypeMismatch(String),

    /// The type has no serializer.
    #[error("type `{0}` has no serializer")]
    NotSerializable(String),
}

/// Errors raised while evaluating expressions or executing effects.
///
/// An evaluation error is contained to the expression (or effect) that
/// raised it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A singular evaluation produced more than one value.
    #[error("expected a single value from `{expression}`, got {count}")]
    NotSingle {
        /// Description of the expression.
        expression: String,
        /// How many values it produced.
        count: usize,
    },

    /// A required value was absent.
    #[error("`{0}` has no value for this event")]
    Missing(String),

    /// A value had an unexpected type.
    #[error("expected a value of type `{expected}`, got `{found}`")]
    TypeMismatch {
        /// The expected type name.
        expected: &'static str,
        /// The actual type name.
        found: &'static str,
    },
}

/// Errors that can occur in handlers.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("handler `{name}` failed: {source}")]
    Failed {
        /// The handler name.
        name: String,
        /// The underlying error.
        #[source]
        source: BoxError,
    },

    /// The handler panicked during execution.
    #[error("handler `{name}` panicked: {message}")]
    Panic {
        /// The handler name.
        name: String,
        /// The panic payload, if it was a string.
        message: String,
    },
}

// Convenience conversions
impl From<BoxError> for SpindleError {
    fn from(err: BoxError) -> Self {
        SpindleError::Custom(err)
    }
}
