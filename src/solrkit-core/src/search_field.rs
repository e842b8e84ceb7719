//! Field-targeted and priority-weighted searches

use anyhow::Context;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::query::{urlencode, Query, QueryParams};
use crate::version::SpecVersion;

/// A clause that renders itself as Lucene query syntax
pub trait SearchField: fmt::Debug + Send + Sync {
    fn to_query(&self) -> String;
}

/// `field:value`, optionally boosted
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleSearchField {
    field: String,
    value: String,
    boost: f64,
}

impl SimpleSearchField {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let field = field.into();
        if field.trim().is_empty() {
            return Err(Error::invalid("search field name must not be blank"));
        }
        Ok(Self {
            field,
            value: value.into(),
            boost: 1.0,
        })
    }

    /// Match any value of `field`
    pub fn any(field: impl Into<String>) -> Result<Self> {
        Self::new(field, "*")
    }

    pub fn with_boost(mut self, boost: f64) -> Result<Self> {
        if !boost.is_finite() {
            return Err(Error::invalid(format!("invalid boost value: {boost}")));
        }
        self.boost = boost;
        Ok(self)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn boost(&self) -> f64 {
        self.boost
    }
}

impl SearchField for SimpleSearchField {
    fn to_query(&self) -> String {
        let clause = format!("{}:{}", self.field, self.value);
        if self.boost != 1.0 {
            format!("\"{}\"^{}", clause, self.boost)
        } else {
            clause
        }
    }
}

/// Ordered field → weight list used by priority searches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPriorities {
    entries: Vec<(String, f64)>,
}

impl FieldPriorities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the weight for `field`; an existing field keeps its position
    pub fn insert(&mut self, field: impl Into<String>, weight: f64) -> Result<()> {
        let field = field.into();
        if field.trim().is_empty() {
            return Err(Error::invalid("priority field name must not be blank"));
        }
        if !weight.is_finite() {
            return Err(Error::invalid(format!("field {field}: invalid weight {weight}")));
        }

        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = weight,
            None => self.entries.push((field, weight)),
        }
        Ok(())
    }

    pub fn with(mut self, field: impl Into<String>, weight: f64) -> Result<Self> {
        self.insert(field, weight)?;
        Ok(self)
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, weight)| *weight)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(name, weight)| (name.as_str(), *weight))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a priorities document: every `<field name="...">weight</field>`
    /// element contributes one entry, in document order.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut priorities = Self::new();

        let mut current: Option<String> = None;
        let mut text_buf = String::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"field" => {
                    let mut name = None;
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"name" {
                            let value = attr
                                .unescape_value()
                                .map_err(|e| Error::Parse(format!("field name: {e}")))?;
                            name = Some(value.into_owned());
                        }
                    }
                    let name = name.ok_or_else(|| {
                        Error::Parse("<field> element without a name attribute".to_string())
                    })?;
                    current = Some(name);
                    text_buf.clear();
                }
                Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"field" => {
                    return Err(Error::Parse("<field> element without a weight".to_string()));
                }
                Ok(Event::Text(ref e)) => {
                    if current.is_some() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Parse(format!("field weight: {e}")))?;
                        text_buf.push_str(&text);
                    }
                }
                Ok(Event::End(ref e)) if e.local_name().as_ref() == b"field" => {
                    if let Some(name) = current.take() {
                        let weight: f64 = text_buf.trim().parse().map_err(|_| {
                            Error::Parse(format!(
                                "field {name}: weight {:?} is not a number",
                                text_buf.trim()
                            ))
                        })?;
                        priorities.insert(name, weight)?;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Parse(format!(
                        "priorities XML error at position {}: {e}",
                        reader.buffer_position()
                    )));
                }
                _ => {}
            }
        }

        Ok(priorities)
    }

    /// Load a priorities file from disk
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read field priorities from {}", path.display()))?;
        let priorities = Self::from_xml(&contents)?;
        tracing::debug!(path = %path.display(), fields = priorities.len(), "Loaded field priorities");
        Ok(priorities)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FieldPriorities {
    /// Later duplicates overwrite earlier weights; invalid entries are skipped
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut priorities = Self::new();
        for (field, weight) in iter {
            if let Err(e) = priorities.insert(field, weight) {
                tracing::warn!("Skipping field priority: {}", e);
            }
        }
        priorities
    }
}

/// Renders weights with at least one decimal place (`10.0`, `2.5`)
fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{weight:.1}")
    } else {
        weight.to_string()
    }
}

/// One keyword searched across several fields with per-field weights
#[derive(Debug, Clone, PartialEq)]
pub struct PrioritySearchField {
    keyword: String,
    priorities: FieldPriorities,
}

impl PrioritySearchField {
    pub fn new(keyword: impl Into<String>, priorities: FieldPriorities) -> Result<Self> {
        let keyword = keyword.into();
        if keyword.trim().is_empty() {
            return Err(Error::invalid("priority search keyword must not be blank"));
        }
        Ok(Self { keyword, priorities })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn priorities(&self) -> &FieldPriorities {
        &self.priorities
    }

    /// `f1:kw^w1 f2:kw^w2 ...`, or `None` when no priorities are defined
    pub fn to_query(&self) -> Option<String> {
        if self.priorities.is_empty() {
            return None;
        }

        let clauses: Vec<String> = self
            .priorities
            .iter()
            .map(|(field, weight)| format!("{}:{}^{}", field, self.keyword, format_weight(weight)))
            .collect();
        Some(clauses.join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(Error::invalid(format!(
                "sort order must be asc or desc, got {other:?}"
            ))),
        }
    }
}

/// A [`Query`] whose text is composed from search fields, plus an optional
/// sort clause.
///
/// Once any search field is present, the joined fields replace the raw text.
#[derive(Debug)]
pub struct SearchQuery {
    query: Query,
    search_fields: Vec<Box<dyn SearchField>>,
    sort: Option<(String, SortOrder)>,
}

impl SearchQuery {
    /// Search raw query text
    pub fn new(text: impl Into<String>) -> Result<Self> {
        Ok(Self {
            query: Query::new(text)?,
            search_fields: Vec::new(),
            sort: None,
        })
    }

    /// All `fields` must match (clauses joined with `AND`)
    pub fn from_fields<I>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = Box<dyn SearchField>>,
    {
        let search_fields: Vec<Box<dyn SearchField>> = fields.into_iter().collect();
        if search_fields.is_empty() {
            return Err(Error::invalid("at least one search field is required"));
        }

        let text = join_fields(&search_fields);
        Ok(Self {
            query: Query::new(text)?,
            search_fields,
            sort: None,
        })
    }

    pub fn from_priority_field(field: &PrioritySearchField) -> Result<Self> {
        let text = field
            .to_query()
            .ok_or_else(|| Error::invalid("no field priorities configured"))?;
        Self::new(text)
    }

    pub fn add_search_field<F: SearchField + 'static>(&mut self, field: F) {
        self.search_fields.push(Box::new(field));
    }

    pub fn search_fields(&self) -> &[Box<dyn SearchField>] {
        &self.search_fields
    }

    /// The `q` parameter as it will be sent
    pub fn text(&self) -> Cow<'_, str> {
        if self.search_fields.is_empty() {
            Cow::Borrowed(self.query.text())
        } else {
            Cow::Owned(join_fields(&self.search_fields))
        }
    }

    /// Paging, filters and facets live on the wrapped query
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut Query {
        &mut self.query
    }

    pub fn set_sort_field(&mut self, field: &str, order: SortOrder) -> Result<()> {
        let field = field.trim();
        if field.is_empty() {
            return Err(Error::invalid("sort field must not be blank"));
        }
        self.sort = Some((field.to_string(), order));
        Ok(())
    }

    pub fn clear_sort_field(&mut self) {
        self.sort = None;
    }

    pub fn sort_field(&self) -> Option<(&str, SortOrder)> {
        self.sort.as_ref().map(|(field, order)| (field.as_str(), *order))
    }
}

fn join_fields(fields: &[Box<dyn SearchField>]) -> String {
    fields
        .iter()
        .map(|f| f.to_query())
        .collect::<Vec<_>>()
        .join(" AND ")
}

impl QueryParams for SearchQuery {
    fn query_string(&self, spec_version: Option<&SpecVersion>) -> Result<String> {
        let mut qs = self.query.query_string_for(&self.text(), spec_version)?;
        if let Some((field, order)) = &self.sort {
            qs.push_str("&sort=");
            qs.push_str(&urlencode(&format!("{} {}", field, order)));
        }
        Ok(qs)
    }

    fn needs_spec_version(&self) -> bool {
        self.query.needs_spec_version()
    }
}
