use chrono::DateTime;
use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, Result};

/// Solr's canonical date representation (always UTC)
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Value carried by a document field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Text(_) => None,
            FieldValue::Integer(n) => Some(*n as f64),
            FieldValue::Float(n) => Some(*n),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Float(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// A single indexable field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    value: FieldValue,
    boost: Option<f64>,
}

impl Field {
    /// Create a plain field
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid("field name must not be empty"));
        }

        let value = value.into();
        if let FieldValue::Float(n) = value {
            if !n.is_finite() {
                return Err(Error::invalid(format!("field {name}: value {n} is not finite")));
            }
        }

        Ok(Self::from_parts(name, value))
    }

    /// Create a currency field.
    ///
    /// Thousands separators are stripped before the amount is coerced to a
    /// float, so `"12,123.50"` is stored as `12123.5`.
    pub fn currency(name: impl Into<String>, amount: impl ToString) -> Result<Self> {
        let raw = amount.to_string();
        let normalized = raw.replace(',', "");
        let parsed = normalized
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| Error::invalid(format!("invalid currency value: {raw:?}")))?;

        Self::new(name, FieldValue::Float(parsed))
    }

    /// Create a date field from a Unix timestamp, rendered in UTC
    pub fn date(name: impl Into<String>, timestamp: i64) -> Result<Self> {
        let date = DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| Error::invalid(format!("timestamp out of range: {timestamp}")))?;

        Self::new(name, date.format(DATE_FORMAT).to_string())
    }

    /// Attach an index-time boost
    pub fn with_boost(mut self, boost: f64) -> Result<Self> {
        if !boost.is_finite() {
            return Err(Error::invalid(format!("invalid boost value: {boost}")));
        }
        self.boost = Some(boost);
        Ok(self)
    }

    /// Unchecked constructor for fields decoded from server data
    pub(crate) fn from_parts(name: String, value: FieldValue) -> Self {
        Self {
            name,
            value,
            boost: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn boost(&self) -> Option<f64> {
        self.boost
    }
}

/// Anything that can be sent to the update handler as a `<doc>`
pub trait IndexDocument {
    fn index_fields(&self) -> Cow<'_, [Field]>;

    fn index_boost(&self) -> Option<f64> {
        None
    }
}

impl<T: IndexDocument + ?Sized> IndexDocument for &T {
    fn index_fields(&self) -> Cow<'_, [Field]> {
        (**self).index_fields()
    }

    fn index_boost(&self) -> Option<f64> {
        (**self).index_boost()
    }
}

impl<T: IndexDocument + ?Sized> IndexDocument for Box<T> {
    fn index_fields(&self) -> Cow<'_, [Field]> {
        (**self).index_fields()
    }

    fn index_boost(&self) -> Option<f64> {
        (**self).index_boost()
    }
}

/// Document assembled on the client side for indexing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<Field>,
    boost: Option<f64>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            boost: None,
        }
    }

    /// Attach a document-level boost
    pub fn with_boost(mut self, boost: f64) -> Result<Self> {
        if !boost.is_finite() {
            return Err(Error::invalid(format!("invalid boost value: {boost}")));
        }
        self.boost = Some(boost);
        Ok(self)
    }

    /// Append a field; duplicates are kept (multi-valued fields)
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn boost(&self) -> Option<f64> {
        self.boost
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl IndexDocument for Document {
    fn index_fields(&self) -> Cow<'_, [Field]> {
        Cow::Borrowed(&self.fields)
    }

    fn index_boost(&self) -> Option<f64> {
        self.boost
    }
}
