//! Decoded search results
//!
//! Everything here is built from a JSON response body and is read-only
//! afterwards: there are no setters and no `IndexMut` impls, so writing to a
//! hit or a result set is rejected at compile time.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::ops::Index;

use crate::document::{Field, FieldValue, IndexDocument};
use crate::error::{Error, Result};

#[derive(Deserialize)]
struct RawResponse {
    response: RawResults,
    #[serde(default)]
    facet_counts: Option<RawFacetCounts>,
}

#[derive(Deserialize)]
struct RawResults {
    #[serde(default)]
    start: u64,
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<Map<String, Value>>,
}

#[derive(Deserialize)]
struct RawFacetCounts {
    #[serde(default)]
    facet_fields: Map<String, Value>,
    #[serde(default)]
    facet_queries: Map<String, Value>,
}

/// Ordered value → count pairs, in the order the server sent them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueCounts {
    entries: Vec<(String, u64)>,
    missing: Option<u64>,
}

impl ValueCounts {
    pub fn get(&self, value: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, count)| *count)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.get(value).is_some()
    }

    /// Count of documents without a value (sent when `facet.missing` is on)
    pub fn missing(&self) -> Option<u64> {
        self.missing
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(v, c)| (v.as_str(), *c))
    }

    /// Decode Solr's flat `[value, count, value, count, ...]` list
    fn from_flat_list(field: &str, list: &Value) -> Result<Self> {
        let items = list
            .as_array()
            .ok_or_else(|| Error::Parse(format!("facet_fields.{field} is not an array")))?;
        if items.len() % 2 != 0 {
            return Err(Error::Parse(format!(
                "facet_fields.{field} has an odd number of entries"
            )));
        }

        let mut counts = Self::default();
        for pair in items.chunks_exact(2) {
            let count = parse_count(&pair[1], field)?;
            match &pair[0] {
                Value::Null => counts.missing = Some(count),
                Value::String(s) => counts.entries.push((s.clone(), count)),
                Value::Number(n) => counts.entries.push((n.to_string(), count)),
                Value::Bool(b) => counts.entries.push((b.to_string(), count)),
                other => {
                    return Err(Error::Parse(format!(
                        "facet_fields.{field}: unexpected facet value {other}"
                    )));
                }
            }
        }
        Ok(counts)
    }
}

fn parse_count(value: &Value, context: &str) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| Error::Parse(format!("{context}: count {value} is not a non-negative integer")))
}

/// Facet counts returned alongside a search result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetCounts {
    fields: Vec<(String, ValueCounts)>,
    queries: ValueCounts,
}

impl FacetCounts {
    fn from_raw(raw: RawFacetCounts) -> Result<Self> {
        let mut fields = Vec::with_capacity(raw.facet_fields.len());
        for (name, list) in &raw.facet_fields {
            fields.push((name.clone(), ValueCounts::from_flat_list(name, list)?));
        }

        let mut queries = ValueCounts::default();
        for (query, count) in &raw.facet_queries {
            queries.entries.push((query.clone(), parse_count(count, query)?));
        }

        Ok(Self { fields, queries })
    }

    /// Counts for one facet field
    pub fn field(&self, name: &str) -> Option<&ValueCounts> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, counts)| counts)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &ValueCounts)> + '_ {
        self.fields.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Counts keyed by the raw facet query string
    pub fn queries(&self) -> &ValueCounts {
        &self.queries
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.queries.is_empty()
    }
}

/// One matched document.
///
/// The relevance score is pulled out of the returned fields, so it is only
/// reachable through [`Hit::score`]. Hits cannot be modified:
///
/// ```compile_fail
/// let result = solrkit_core::SearchResult::parse_response(
///     r#"{"response":{"numFound":1,"start":0,"docs":[{"id":42}]}}"#,
/// ).unwrap();
/// let mut hit = result[0].clone();
/// hit["id"] = serde_json::json!(7);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    fields: Map<String, Value>,
    score: Option<f64>,
}

impl Hit {
    fn from_doc(mut fields: Map<String, Value>) -> Self {
        let score = fields.remove("score").and_then(|s| match s {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        Self { fields, score }
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Like [`Hit::get`], but a missing field is an error
    pub fn field(&self, name: &str) -> Result<&Value> {
        self.fields
            .get(name)
            .ok_or_else(|| Error::OutOfRange(format!("hit has no field {name:?}")))
    }

    /// Field at `position`, in response order
    pub fn get_index(&self, position: usize) -> Option<(&str, &Value)> {
        self.fields.iter().nth(position).map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }
}

impl Index<&str> for Hit {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.fields.get(name) {
            Some(value) => value,
            None => panic!("hit has no field {name:?}"),
        }
    }
}

impl<'a> IntoIterator for &'a Hit {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// A hit can be fed back to the update handler: every scalar, and every
/// element of a multi-valued field, becomes one field.
impl IndexDocument for Hit {
    fn index_fields(&self) -> Cow<'_, [Field]> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            match value {
                Value::Array(items) => {
                    for item in items {
                        if let Some(v) = scalar_value(item) {
                            fields.push(Field::from_parts(name.clone(), v));
                        }
                    }
                }
                other => {
                    if let Some(v) = scalar_value(other) {
                        fields.push(Field::from_parts(name.clone(), v));
                    }
                }
            }
        }
        Cow::Owned(fields)
    }
}

fn scalar_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(FieldValue::Text(s.clone())),
        Value::Bool(b) => Some(FieldValue::Text(b.to_string())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(FieldValue::Integer(i)),
            None => n.as_f64().map(FieldValue::Float),
        },
        nested => Some(FieldValue::Text(nested.to_string())),
    }
}

/// A page of search results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    start: u64,
    num_found: u64,
    hits: Vec<Hit>,
    facets: FacetCounts,
}

impl SearchResult {
    /// Decode a `wt=json` response from the select handler
    pub fn parse_response(body: &str) -> Result<Self> {
        let raw: RawResponse =
            serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;

        let facets = match raw.facet_counts {
            Some(counts) => FacetCounts::from_raw(counts)?,
            None => FacetCounts::default(),
        };

        let hits: Vec<Hit> = raw.response.docs.into_iter().map(Hit::from_doc).collect();

        tracing::debug!(
            num_found = raw.response.num_found,
            returned = hits.len(),
            "Parsed search response"
        );

        Ok(Self {
            start: raw.response.start,
            num_found: raw.response.num_found,
            hits,
            facets,
        })
    }

    /// Offset of the first hit within all matches
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Total number of matching documents on the server
    pub fn num_found(&self) -> u64 {
        self.num_found
    }

    /// Number of hits in this page
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Hit> {
        self.hits.get(position)
    }

    /// Like [`SearchResult::get`], but a missing position is an error
    pub fn hit(&self, position: usize) -> Result<&Hit> {
        self.hits.get(position).ok_or_else(|| {
            Error::OutOfRange(format!(
                "hit {position} requested, result holds {}",
                self.hits.len()
            ))
        })
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hit> {
        self.hits.iter()
    }

    pub fn facets(&self) -> &FacetCounts {
        &self.facets
    }
}

impl Index<usize> for SearchResult {
    type Output = Hit;

    fn index(&self, position: usize) -> &Hit {
        &self.hits[position]
    }
}

impl<'a> IntoIterator for &'a SearchResult {
    type Item = &'a Hit;
    type IntoIter = std::slice::Iter<'a, Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}
