//! Facet parameters
//!
//! [`Facets`] is the aggregator attached to a query. It toggles faceting on
//! only when at least one facet field or facet query is configured.
//! [`FacetField`] carries options scoped to a single field, serialized as
//! `f.<field>.facet.<name>`.

use std::fmt;

use crate::error::{Error, Result};
use crate::query::urlencode;
use crate::version::SpecVersion;

/// Ordering of facet values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetSort {
    /// Highest count first
    Count,
    /// Index (lexicographic) order
    Lex,
}

impl FacetSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetSort::Count => "count",
            FacetSort::Lex => "lex",
        }
    }

    /// Pre-1.4 servers expect a boolean instead of the sort token
    fn legacy_value(&self) -> &'static str {
        match self {
            FacetSort::Count => "true",
            FacetSort::Lex => "false",
        }
    }
}

impl fmt::Display for FacetSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The optional facet.* parameters shared by global and per-field scopes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetParams {
    prefix: Option<String>,
    sort: Option<FacetSort>,
    limit: Option<i64>,
    offset: Option<i64>,
    min_count: Option<i64>,
    missing: Option<bool>,
}

impl FacetParams {
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn sort(&self) -> Option<FacetSort> {
        self.sort
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    pub fn min_count(&self) -> Option<i64> {
        self.min_count
    }

    pub fn missing(&self) -> Option<bool> {
        self.missing
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Serialize the set parameters, scoped to `field` when given
    pub fn query_string_part(
        &self,
        field: Option<&str>,
        spec_version: Option<&SpecVersion>,
    ) -> Result<String> {
        let mut part = String::new();

        if let Some(prefix) = &self.prefix {
            if let Some(version) = spec_version.filter(|v| v.is_before(1, 2)) {
                return Err(Error::UnsupportedParameter {
                    parameter: "facet.prefix",
                    required: "1.2",
                    actual: version.to_string(),
                });
            }
            part.push_str(&parameter(field, "prefix", prefix));
        }

        if let Some(sort) = self.sort {
            let value = match spec_version {
                Some(version) if version.is_before(1, 4) => sort.legacy_value(),
                _ => sort.as_str(),
            };
            part.push_str(&parameter(field, "sort", value));
        }

        if let Some(limit) = self.limit {
            part.push_str(&parameter(field, "limit", &limit.to_string()));
        }

        if let Some(offset) = self.offset {
            part.push_str(&parameter(field, "offset", &offset.to_string()));
        }

        if let Some(min_count) = self.min_count {
            part.push_str(&parameter(field, "mincount", &min_count.to_string()));
        }

        // false is sent as an empty value, unset is not sent at all
        if let Some(missing) = self.missing {
            part.push_str(&parameter(field, "missing", if missing { "true" } else { "" }));
        }

        Ok(part)
    }
}

fn parameter(field: Option<&str>, name: &str, value: &str) -> String {
    match field {
        Some(field) => format!("&f.{}.facet.{}={}", urlencode(field), name, urlencode(value)),
        None => format!("&facet.{}={}", name, urlencode(value)),
    }
}

/// Setters for facet parameters, shared by [`Facets`] and [`FacetField`].
///
/// Passing `None` clears a parameter so the server default applies again.
pub trait FacetOptions {
    fn options(&self) -> &FacetParams;
    fn options_mut(&mut self) -> &mut FacetParams;

    /// Only count values starting with `prefix` (Solr 1.2+)
    fn set_prefix(&mut self, prefix: Option<&str>) -> Result<()> {
        if let Some(p) = prefix {
            if p.is_empty() {
                return Err(Error::invalid("facet prefix must not be empty"));
            }
        }
        self.options_mut().prefix = prefix.map(str::to_string);
        Ok(())
    }

    fn set_sort(&mut self, sort: Option<FacetSort>) {
        self.options_mut().sort = sort;
    }

    /// Maximum number of values; a negative limit means unlimited
    fn set_limit(&mut self, limit: Option<i64>) {
        self.options_mut().limit = limit;
    }

    fn set_offset(&mut self, offset: Option<i64>) -> Result<()> {
        if let Some(n) = offset.filter(|n| *n < 0) {
            return Err(Error::invalid(format!("facet offset must not be negative: {n}")));
        }
        self.options_mut().offset = offset;
        Ok(())
    }

    fn set_min_count(&mut self, min_count: Option<i64>) -> Result<()> {
        if let Some(n) = min_count.filter(|n| *n < 0) {
            return Err(Error::invalid(format!("facet mincount must not be negative: {n}")));
        }
        self.options_mut().min_count = min_count;
        Ok(())
    }

    /// Also count documents lacking a value for the field
    fn set_missing(&mut self, missing: Option<bool>) {
        self.options_mut().missing = missing;
    }
}

/// A field to facet on, with optional field-scoped parameters
#[derive(Debug, Clone, PartialEq)]
pub struct FacetField {
    name: String,
    params: FacetParams,
}

impl FacetField {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid("facet field name must not be empty"));
        }
        Ok(Self {
            name,
            params: FacetParams::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn query_string_part(&self, spec_version: Option<&SpecVersion>) -> Result<String> {
        let mut part = format!("&facet.field={}", urlencode(&self.name));
        part.push_str(&self.params.query_string_part(Some(&self.name), spec_version)?);
        Ok(part)
    }
}

impl FacetOptions for FacetField {
    fn options(&self) -> &FacetParams {
        &self.params
    }

    fn options_mut(&mut self) -> &mut FacetParams {
        &mut self.params
    }
}

/// Conversion into a [`FacetField`], so names and prepared fields mix freely
pub trait IntoFacetField {
    fn into_facet_field(self) -> Result<FacetField>;
}

impl IntoFacetField for FacetField {
    fn into_facet_field(self) -> Result<FacetField> {
        Ok(self)
    }
}

impl IntoFacetField for &str {
    fn into_facet_field(self) -> Result<FacetField> {
        FacetField::new(self)
    }
}

impl IntoFacetField for String {
    fn into_facet_field(self) -> Result<FacetField> {
        FacetField::new(self)
    }
}

/// Facet configuration attached to a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facets {
    params: FacetParams,
    queries: Option<Vec<String>>,
    fields: Option<Vec<FacetField>>,
}

impl Facets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Faceting is on only when a field or a query is configured
    pub fn is_enabled(&self) -> bool {
        self.fields.as_ref().is_some_and(|f| !f.is_empty())
            || self.queries.as_ref().is_some_and(|q| !q.is_empty())
    }

    /// True when serializing depends on the server's spec version
    pub fn is_version_sensitive(&self) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let sensitive = |p: &FacetParams| p.prefix.is_some() || p.sort.is_some();
        let fields_sensitive = self
            .fields
            .iter()
            .flatten()
            .any(|field| sensitive(&field.params));
        fields_sensitive || (self.fields.is_some() && sensitive(&self.params))
    }

    pub fn queries(&self) -> &[String] {
        self.queries.as_deref().unwrap_or_default()
    }

    pub fn fields(&self) -> &[FacetField] {
        self.fields.as_deref().unwrap_or_default()
    }

    /// Mutable access to configured fields, e.g. to tune field-scoped options
    pub fn fields_mut(&mut self) -> &mut [FacetField] {
        self.fields.as_deref_mut().unwrap_or_default()
    }

    /// Set raw facet queries (each counted separately)
    pub fn set_queries<I, S>(&mut self, queries: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut collected = Vec::new();
        for query in queries {
            let query = query.as_ref().trim();
            if query.is_empty() {
                return Err(Error::invalid("facet query must not be blank"));
            }
            collected.push(query.to_string());
        }
        if collected.is_empty() {
            return Err(Error::invalid("facet query list must not be empty"));
        }
        self.queries = Some(collected);
        Ok(())
    }

    pub fn clear_queries(&mut self) {
        self.queries = None;
    }

    /// Set facet fields from names or prepared [`FacetField`]s
    pub fn set_fields<I, F>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = F>,
        F: IntoFacetField,
    {
        let collected = fields
            .into_iter()
            .map(IntoFacetField::into_facet_field)
            .collect::<Result<Vec<_>>>()?;
        if collected.is_empty() {
            return Err(Error::invalid("facet field list must not be empty"));
        }
        self.fields = Some(collected);
        Ok(())
    }

    pub fn clear_fields(&mut self) {
        self.fields = None;
    }

    pub fn query_string_part(&self, spec_version: Option<&SpecVersion>) -> Result<String> {
        if !self.is_enabled() {
            return Ok(String::new());
        }

        let mut part = String::from("&facet=true");

        for query in self.queries() {
            part.push_str("&facet.query=");
            part.push_str(&urlencode(query));
        }

        // Global options only apply to field faceting
        if !self.fields().is_empty() {
            for field in self.fields() {
                part.push_str(&field.query_string_part(spec_version)?);
            }
            part.push_str(&self.params.query_string_part(None, spec_version)?);
        }

        Ok(part)
    }
}

impl FacetOptions for Facets {
    fn options(&self) -> &FacetParams {
        &self.params
    }

    fn options_mut(&mut self) -> &mut FacetParams {
        &mut self.params
    }
}
