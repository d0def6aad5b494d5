//! # Type Conversion Layer
//!
//! Every value type that crosses the textual boundary is described by a
//! [`TypeInfo`]: its names, how to parse and render it, how to persist it in
//! a [`FieldBag`], and which default expression fills an omitted slot.
//!
//! Parsers and serializers are written against the concrete type
//! ([`Parser<T>`], [`Serializer<T>`]) and erased when the descriptor is
//! built, the same way typed handlers are erased for dynamic dispatch.

mod registry;

pub use registry::{Converter, TypeRegistry, TypeRegistryBuilder};

use spindle_core::{
    ConversionError, Expression, FieldBag, ParseContext, RenderFlags, TypeKey, Value,
};
use std::{any::Any, fmt, marker::PhantomData, sync::Arc};

/// Parses and renders values of type `T`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot parse values of type `{T}`",
    label = "missing `Parser<{T}>` implementation"
)]
pub trait Parser<T>: Send + Sync + 'static {
    /// Parse `text`; `None` if it does not describe a `T`.
    fn parse(&self, text: &str, context: ParseContext) -> Option<T>;

    /// Whether literal parsing is allowed in `context`.
    fn can_parse(&self, context: ParseContext) -> bool {
        let _ = context;
        true
    }

    /// Render a value for display.
    fn render(&self, value: &T, flags: RenderFlags) -> String;

    /// Render a value for use inside a variable name.
    fn render_variable_name(&self, value: &T) -> String {
        self.render(value, RenderFlags::VARIABLE_NAME)
    }
}

/// Persists values of type `T` in a [`FieldBag`].
///
/// Implementations must satisfy `deserialize(serialize(v)) == v` on every
/// field they write.
pub trait Serializer<T>: Send + Sync + 'static {
    /// Write `value` into a new bag.
    fn serialize(&self, value: &T) -> FieldBag;

    /// Build a new value from `fields`.
    fn deserialize(&self, fields: &FieldBag) -> Result<T, ConversionError> {
        let _ = fields;
        Err(ConversionError::Unsupported(
            std::any::type_name::<T>().to_owned(),
        ))
    }

    /// Overwrite `target` with the values in `fields`.
    fn deserialize_into(&self, target: &mut T, fields: &FieldBag) -> Result<(), ConversionError> {
        *target = self.deserialize(fields)?;
        Ok(())
    }

    /// Whether a blank value can be created and then filled in place.
    fn can_be_instantiated(&self) -> bool {
        true
    }

    /// A blank value to deserialize into.
    fn instantiate(&self) -> Option<T> {
        None
    }

    /// Whether deserialization must happen on the main thread.
    fn must_sync_deserialization(&self) -> bool {
        false
    }
}

/// Supplies the default expression for an omitted slot.
#[derive(Clone, Default)]
pub enum DefaultSource {
    /// No default; the slot stays unbound.
    #[default]
    None,
    /// The ambient event's value of this type, if it has one.
    EventValue,
    /// A fixed expression.
    Custom(Arc<dyn Fn() -> Option<Box<dyn Expression>> + Send + Sync>),
}

impl fmt::Debug for DefaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultSource::None => f.write_str("None"),
            DefaultSource::EventValue => f.write_str("EventValue"),
            DefaultSource::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

trait ErasedParser: Send + Sync {
    fn parse(&self, text: &str, context: ParseContext) -> Option<Value>;
    fn can_parse(&self, context: ParseContext) -> bool;
    fn render(&self, value: &Value, flags: RenderFlags) -> Option<String>;
    fn render_variable_name(&self, value: &Value) -> Option<String>;
}

struct ParserWrapper<T, P> {
    parser: P,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, P> ErasedParser for ParserWrapper<T, P>
where
    T: Any + Send + Sync,
    P: Parser<T>,
{
    fn parse(&self, text: &str, context: ParseContext) -> Option<Value> {
        self.parser.parse(text, context).map(Value::new)
    }

    fn can_parse(&self, context: ParseContext) -> bool {
        self.parser.can_parse(context)
    }

    fn render(&self, value: &Value, flags: RenderFlags) -> Option<String> {
        value
            .downcast_ref::<T>()
            .map(|v| self.parser.render(v, flags))
    }

    fn render_variable_name(&self, value: &Value) -> Option<String> {
        value
            .downcast_ref::<T>()
            .map(|v| self.parser.render_variable_name(v))
    }
}

trait ErasedSerializer: Send + Sync {
    fn serialize(&self, value: &Value) -> Option<FieldBag>;
    fn deserialize(&self, fields: &FieldBag) -> Result<Value, ConversionError>;
    fn deserialize_into(
        &self,
        target: &mut dyn Any,
        fields: &FieldBag,
    ) -> Result<(), ConversionError>;
    fn can_be_instantiated(&self) -> bool;
    fn instantiate(&self) -> Option<Value>;
    fn must_sync_deserialization(&self) -> bool;
}

struct SerializerWrapper<T, S> {
    serializer: S,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, S> ErasedSerializer for SerializerWrapper<T, S>
where
    T: Any + Send + Sync,
    S: Serializer<T>,
{
    fn serialize(&self, value: &Value) -> Option<FieldBag> {
        value
            .downcast_ref::<T>()
            .map(|v| self.serializer.serialize(v))
    }

    fn deserialize(&self, fields: &FieldBag) -> Result<Value, ConversionError> {
        if self.serializer.can_be_instantiated() {
            if let Some(mut blank) = self.serializer.instantiate() {
                self.serializer.deserialize_into(&mut blank, fields)?;
                return Ok(Value::new(blank));
            }
        }
        self.serializer.deserialize(fields).map(Value::new)
    }

    fn deserialize_into(
        &self,
        target: &mut dyn Any,
        fields: &FieldBag,
    ) -> Result<(), ConversionError> {
        let target = target.downcast_mut::<T>().ok_or_else(|| {
            ConversionError::TypeMismatch(std::any::type_name::<T>().to_owned())
        })?;
        self.serializer.deserialize_into(target, fields)
    }

    fn can_be_instantiated(&self) -> bool {
        self.serializer.can_be_instantiated()
    }

    fn instantiate(&self) -> Option<Value> {
        assert!(
            self.serializer.can_be_instantiated(),
            "serializer for `{}` cannot be instantiated generically",
            std::any::type_name::<T>()
        );
        self.serializer.instantiate().map(Value::new)
    }

    fn must_sync_deserialization(&self) -> bool {
        self.serializer.must_sync_deserialization()
    }
}

/// Descriptor of one script value type.
pub struct TypeInfo {
    key: TypeKey,
    name: String,
    plural: String,
    display_name: String,
    description: Option<String>,
    parser: Option<Box<dyn ErasedParser>>,
    serializer: Option<Box<dyn ErasedSerializer>>,
    default: DefaultSource,
}

impl TypeInfo {
    /// Start describing type `T` under the code name `name`.
    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> TypeInfoBuilder<T> {
        let name = name.into().to_lowercase();
        TypeInfoBuilder {
            info: TypeInfo {
                key: TypeKey::of::<T>(),
                plural: format!("{name}s"),
                display_name: name.clone(),
                name,
                description: None,
                parser: None,
                serializer: None,
                default: DefaultSource::None,
            },
            _phantom: PhantomData,
        }
    }

    /// The described Rust type.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Singular code name used in patterns.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plural code name used in patterns.
    pub fn plural(&self) -> &str {
        &self.plural
    }

    /// Name shown to users.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Documentation text.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Source of the default expression for omitted slots.
    pub fn default_source(&self) -> &DefaultSource {
        &self.default
    }

    /// Whether literal parsing is allowed in `context`.
    pub fn can_parse(&self, context: ParseContext) -> bool {
        self.parser.as_ref().is_some_and(|p| p.can_parse(context))
    }

    /// Parse a literal; `None` if not allowed in `context` or not a match.
    pub fn parse(&self, text: &str, context: ParseContext) -> Option<Value> {
        let parser = self.parser.as_ref()?;
        if !parser.can_parse(context) {
            return None;
        }
        parser.parse(text, context)
    }

    /// Render a value of this type.
    pub fn render(&self, value: &Value, flags: RenderFlags) -> Result<String, ConversionError> {
        let parser = self
            .parser
            .as_ref()
            .ok_or_else(|| ConversionError::Unsupported(self.name.clone()))?;
        parser
            .render(value, flags)
            .ok_or_else(|| ConversionError::TypeMismatch(self.name.clone()))
    }

    /// Render a value of this type for use inside a variable name.
    pub fn render_variable_name(&self, value: &Value) -> Result<String, ConversionError> {
        let parser = self
            .parser
            .as_ref()
            .ok_or_else(|| ConversionError::Unsupported(self.name.clone()))?;
        parser
            .render_variable_name(value)
            .ok_or_else(|| ConversionError::TypeMismatch(self.name.clone()))
    }

    /// Whether values of this type can be persisted.
    pub fn is_serializable(&self) -> bool {
        self.serializer.is_some()
    }

    /// Persist a value of this type.
    pub fn serialize(&self, value: &Value) -> Result<FieldBag, ConversionError> {
        self.serializer()?
            .serialize(value)
            .ok_or_else(|| ConversionError::TypeMismatch(self.name.clone()))
    }

    /// Rebuild a value from a bag.
    ///
    /// Instantiable types are created blank and filled in place; the others
    /// go through direct deserialization.
    pub fn deserialize(&self, fields: &FieldBag) -> Result<Value, ConversionError> {
        self.serializer()?.deserialize(fields)
    }

    /// Overwrite `target`, which must be of this type, from a bag.
    pub fn deserialize_into(
        &self,
        target: &mut dyn Any,
        fields: &FieldBag,
    ) -> Result<(), ConversionError> {
        self.serializer()?.deserialize_into(target, fields)
    }

    /// Whether a blank value can be created generically.
    pub fn can_be_instantiated(&self) -> bool {
        self.serializer
            .as_ref()
            .is_some_and(|s| s.can_be_instantiated())
    }

    /// Create a blank value through the generic instantiation path.
    ///
    /// # Panics
    ///
    /// Panics if the serializer reports that it cannot be instantiated.
    pub fn instantiate(&self) -> Result<Option<Value>, ConversionError> {
        Ok(self.serializer()?.instantiate())
    }

    /// Whether deserialization must happen on the main thread.
    pub fn must_sync_deserialization(&self) -> bool {
        self.serializer
            .as_ref()
            .is_some_and(|s| s.must_sync_deserialization())
    }

    fn serializer(&self) -> Result<&dyn ErasedSerializer, ConversionError> {
        self.serializer
            .as_deref()
            .ok_or_else(|| ConversionError::NotSerializable(self.name.clone()))
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("parser", &self.parser.is_some())
            .field("serializer", &self.serializer.is_some())
            .field("default", &self.default)
            .finish()
    }
}

/// Builder for a [`TypeInfo`] describing `T`.
pub struct TypeInfoBuilder<T> {
    info: TypeInfo,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> TypeInfoBuilder<T> {
    /// Set the plural code name (defaults to the name plus `s`).
    pub fn plural(mut self, plural: impl Into<String>) -> Self {
        self.info.plural = plural.into().to_lowercase();
        self
    }

    /// Set the display name.
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.info.display_name = display_name.into();
        self
    }

    /// Set the documentation text.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.info.description = Some(description.into());
        self
    }

    /// Attach a parser.
    pub fn parser<P: Parser<T>>(mut self, parser: P) -> Self {
        self.info.parser = Some(Box::new(ParserWrapper {
            parser,
            _phantom: PhantomData,
        }));
        self
    }

    /// Attach a serializer.
    pub fn serializer<S: Serializer<T>>(mut self, serializer: S) -> Self {
        self.info.serializer = Some(Box::new(SerializerWrapper {
            serializer,
            _phantom: PhantomData,
        }));
        self
    }

    /// Fill omitted slots of this type with the ambient event's value.
    pub fn event_value_default(mut self) -> Self {
        self.info.default = DefaultSource::EventValue;
        self
    }

    /// Fill omitted slots of this type with a fixed expression.
    pub fn default_expression<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Option<Box<dyn Expression>> + Send + Sync + 'static,
    {
        self.info.default = DefaultSource::Custom(Arc::new(f));
        self
    }

    /// Finish the descriptor.
    pub fn build(self) -> TypeInfo {
        self.info
    }
}
