//! Expressions built by the matcher itself.

use crate::{event_values::EventValues, types::Converter};
use spindle_core::{EvalError, Expression, ScriptEvent, TypeKey, Value};
use std::{fmt, sync::Arc};

/// A constant parsed from script text.
#[derive(Debug, Clone)]
pub struct Literal {
    value: Value,
    text: String,
}

impl Literal {
    /// A literal holding `value`, written as `text`.
    pub fn new(value: Value, text: impl Into<String>) -> Self {
        Self {
            value,
            text: text.into(),
        }
    }

    /// The constant.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Expression for Literal {
    fn return_type(&self) -> TypeKey {
        self.value.key()
    }

    fn is_single(&self) -> bool {
        true
    }

    fn get_all(&self, _event: &dyn ScriptEvent) -> Result<Vec<Value>, EvalError> {
        Ok(vec![self.value.clone()])
    }

    fn describe(&self) -> String {
        self.text.clone()
    }
}

/// `a, b and c`: the concatenation of its items, in order.
#[derive(Debug)]
pub struct ListExpression {
    items: Vec<Box<dyn Expression>>,
    return_type: TypeKey,
}

impl ListExpression {
    /// A list of `items`, all of `return_type`.
    pub fn new(items: Vec<Box<dyn Expression>>, return_type: TypeKey) -> Self {
        Self { items, return_type }
    }

    /// The list items.
    pub fn items(&self) -> &[Box<dyn Expression>] {
        &self.items
    }
}

impl Expression for ListExpression {
    fn return_type(&self) -> TypeKey {
        self.return_type
    }

    fn is_single(&self) -> bool {
        false
    }

    fn get_all(&self, event: &dyn ScriptEvent) -> Result<Vec<Value>, EvalError> {
        let mut values = Vec::new();
        for item in &self.items {
            values.extend(item.get_all(event)?);
        }
        Ok(values)
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.items.iter().map(|i| i.describe()).collect();
        match parts.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{} and {last}", rest.join(", ")),
            _ => parts.concat(),
        }
    }
}

/// An expression of one type filling a slot of another.
pub struct ConvertedExpression {
    inner: Box<dyn Expression>,
    to: TypeKey,
    converter: Converter,
}

impl ConvertedExpression {
    /// Convert every value of `inner` to `to`.
    pub fn new(inner: Box<dyn Expression>, to: TypeKey, converter: Converter) -> Self {
        Self {
            inner,
            to,
            converter,
        }
    }
}

impl fmt::Debug for ConvertedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertedExpression")
            .field("inner", &self.inner)
            .field("to", &self.to)
            .finish()
    }
}

impl Expression for ConvertedExpression {
    fn return_type(&self) -> TypeKey {
        self.to
    }

    fn is_single(&self) -> bool {
        self.inner.is_single()
    }

    // Values that fail to convert are dropped.
    fn get_all(&self, event: &dyn ScriptEvent) -> Result<Vec<Value>, EvalError> {
        Ok(self
            .inner
            .get_all(event)?
            .iter()
            .filter_map(|v| (self.converter)(v))
            .collect())
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

/// The dispatched event's value of one type, e.g. "the player".
pub struct EventValueExpression {
    value_type: TypeKey,
    values: Arc<EventValues>,
    name: String,
}

impl EventValueExpression {
    /// Read the event value of `value_type`, described as `name`.
    pub fn new(value_type: TypeKey, values: Arc<EventValues>, name: impl Into<String>) -> Self {
        Self {
            value_type,
            values,
            name: name.into(),
        }
    }
}

impl fmt::Debug for EventValueExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventValueExpression({})", self.name)
    }
}

impl Expression for EventValueExpression {
    fn return_type(&self) -> TypeKey {
        self.value_type
    }

    fn is_single(&self) -> bool {
        true
    }

    fn get_all(&self, event: &dyn ScriptEvent) -> Result<Vec<Value>, EvalError> {
        Ok(self.values.get(event, self.value_type).into_iter().collect())
    }

    fn describe(&self) -> String {
        format!("the {}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nothing;
    impl ScriptEvent for Nothing {}

    fn number(n: f64) -> Box<dyn Expression> {
        Box::new(Literal::new(Value::new(n), n.to_string()))
    }

    #[test]
    fn lists_concatenate_in_order() {
        let list = ListExpression::new(
            vec![number(1.0), number(2.0), number(3.0)],
            TypeKey::of::<f64>(),
        );
        let values: Vec<f64> = list
            .get_all(&Nothing)
            .unwrap()
            .iter()
            .map(|v| v.get::<f64>().unwrap())
            .collect();

        assert_eq!(values, [1.0, 2.0, 3.0]);
        assert!(!list.is_single());
        assert_eq!(list.describe(), "1, 2 and 3");
    }

    #[test]
    fn converted_expressions_drop_unconvertible_values() {
        let converter: Converter = Arc::new(|v: &Value| {
            let n = v.get::<f64>().ok()?;
            (n >= 0.0).then(|| Value::new(n as i64))
        });
        let list = ListExpression::new(vec![number(-1.0), number(2.0)], TypeKey::of::<f64>());
        let converted =
            ConvertedExpression::new(Box::new(list), TypeKey::of::<i64>(), converter);

        let values = converted.get_all(&Nothing).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].get::<i64>().unwrap(), 2);
        assert_eq!(converted.return_type(), TypeKey::of::<i64>());
    }
}
