//! Minimal document representation exchanged with a [`DocumentStore`].
//!
//! The coordinator only ever manipulates flat documents with scalar
//! fields, so the value model is deliberately small: no nested documents,
//! no arrays.
//!
//! [`DocumentStore`]: crate::store::DocumentStore

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// A scalar field value inside a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(f) => Some(*f),
            Value::I64(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I64(i) => write!(f, "{}", i),
            Value::F64(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::I64(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::I64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::F64(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// A flat field-to-value map.
///
/// # Examples
///
/// ```rust,ignore
/// use schemalock::doc;
///
/// let record = doc! {
///     name: "singleton",
///     version: "0.0.0",
///     locked: false,
/// };
/// assert_eq!(record.get_string("version").as_deref(), Some("0.0.0"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: BTreeMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            fields: BTreeMap::new(),
        }
    }

    /// Sets a field. Empty keys are rejected and logged rather than
    /// panicking, matching the store's tolerance for bad input.
    pub fn put(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return self;
        }
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(Value::as_i64)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(Value::as_string)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

/// Strips the quotes `stringify!` leaves around string-literal keys.
#[doc(hidden)]
pub fn normalize_key(raw: &str) -> &str {
    raw.trim_matches('"')
}

/// Creates a [`Document`] from `key: value` pairs.
#[macro_export]
macro_rules! doc {
    () => {
        $crate::document::Document::new()
    };

    ($($key:tt : $value:expr),* $(,)?) => {{
        let mut doc = $crate::document::Document::new();
        $(
            doc.put($crate::document::normalize_key(stringify!($key)), $value);
        )*
        doc
    }};
}
