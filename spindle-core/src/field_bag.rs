//! The field-bag persistence contract.
//!
//! A [`FieldBag`] is an ordered mapping from fixed field names to primitive
//! or nested values. Serializers write named primitives into a bag and read
//! them back by name; the primitive kind of each field is part of the
//! contract, so reading a `float` field as a `double` fails.

use crate::error::ConversionError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single stored field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// A boolean.
    Bool(bool),
    /// A 64-bit integer.
    Int(i64),
    /// A 32-bit float.
    Float(f32),
    /// A 64-bit float.
    Double(f64),
    /// A string.
    Text(String),
    /// A nested bag.
    Bag(FieldBag),
}

impl FieldValue {
    /// Name of the primitive kind stored in this field.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => bool::KIND,
            FieldValue::Int(_) => i64::KIND,
            FieldValue::Float(_) => f32::KIND,
            FieldValue::Double(_) => f64::KIND,
            FieldValue::Text(_) => String::KIND,
            FieldValue::Bag(_) => "bag",
        }
    }
}

/// A Rust type that maps onto one [`FieldValue`] kind.
pub trait Primitive: Sized {
    /// The kind name used in errors.
    const KIND: &'static str;

    /// Store the value.
    fn into_field(self) -> FieldValue;

    /// Read the value back; `None` if the field holds another kind.
    fn from_field(field: &FieldValue) -> Option<Self>;
}

macro_rules! primitive {
    ($ty:ty, $variant:ident, $kind:literal) => {
        impl Primitive for $ty {
            const KIND: &'static str = $kind;

            fn into_field(self) -> FieldValue {
                FieldValue::$variant(self)
            }

            fn from_field(field: &FieldValue) -> Option<Self> {
                match field {
                    FieldValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

primitive!(bool, Bool, "bool");
primitive!(i64, Int, "int");
primitive!(f32, Float, "float");
primitive!(f64, Double, "double");
primitive!(String, Text, "text");

/// Ordered named fields written by a serializer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldBag {
    fields: IndexMap<String, FieldValue>,
}

impl FieldBag {
    /// An empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a primitive under `name`, replacing any previous value.
    pub fn put_primitive<P: Primitive>(&mut self, name: impl Into<String>, value: P) {
        self.fields.insert(name.into(), value.into_field());
    }

    /// Read a primitive stored under `name`.
    pub fn get_primitive<P: Primitive>(&self, name: &str) -> Result<P, ConversionError> {
        let field = self
            .fields
            .get(name)
            .ok_or_else(|| ConversionError::MissingField(name.to_owned()))?;
        P::from_field(field).ok_or_else(|| ConversionError::WrongFieldType {
            field: name.to_owned(),
            expected: P::KIND,
        })
    }

    /// Store a nested bag under `name`.
    pub fn put_bag(&mut self, name: impl Into<String>, bag: FieldBag) {
        self.fields.insert(name.into(), FieldValue::Bag(bag));
    }

    /// Read a nested bag stored under `name`.
    pub fn get_bag(&self, name: &str) -> Result<&FieldBag, ConversionError> {
        match self.fields.get(name) {
            Some(FieldValue::Bag(bag)) => Ok(bag),
            Some(_) => Err(ConversionError::WrongFieldType {
                field: name.to_owned(),
                expected: "bag",
            }),
            None => Err(ConversionError::MissingField(name.to_owned())),
        }
    }

    /// The raw field stored under `name`.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Whether a field named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_keep_insertion_order() {
        let mut bag = FieldBag::new();
        bag.put_primitive("x", 1.0f64);
        bag.put_primitive("yaw", 90.0f32);
        bag.put_primitive("name", String::from("spawn"));

        assert_eq!(bag.names().collect::<Vec<_>>(), ["x", "yaw", "name"]);
    }

    #[test]
    fn reading_the_wrong_kind_fails() {
        let mut bag = FieldBag::new();
        bag.put_primitive("pitch", 10.0f32);

        assert_eq!(bag.get_primitive::<f32>("pitch"), Ok(10.0));
        assert_eq!(
            bag.get_primitive::<f64>("pitch"),
            Err(ConversionError::WrongFieldType {
                field: "pitch".into(),
                expected: "double",
            })
        );
        assert_eq!(
            bag.get_primitive::<f64>("x"),
            Err(ConversionError::MissingField("x".into()))
        );
    }

    #[test]
    fn nested_bags_survive_json() {
        let mut inner = FieldBag::new();
        inner.put_primitive("yaw", 0.1f32);
        let mut outer = FieldBag::new();
        outer.put_primitive("count", 3i64);
        outer.put_bag("look", inner);

        let json = serde_json::to_string(&outer).unwrap();
        let back: FieldBag = serde_json::from_str(&json).unwrap();

        assert_eq!(back, outer);
        assert_eq!(back.get_bag("look").unwrap().get_primitive::<f32>("yaw"), Ok(0.1));
    }
}
