use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::facets::Facets;
use crate::version::SpecVersion;

/// Characters left unescaped in query values (matches PHP's `urlencode`)
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Form-encode a query string value; spaces become `+`
pub(crate) fn urlencode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE)
        .to_string()
        .replace("%20", "+")
}

/// Default boolean operator for query clauses (`q.op`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AND" | "and" => Ok(Operator::And),
            "OR" | "or" => Ok(Operator::Or),
            other => Err(Error::invalid(format!("unknown operator: {other}"))),
        }
    }
}

/// Anything the connection can send to the select handler
pub trait QueryParams {
    /// Request parameters, starting with `?`
    fn query_string(&self, spec_version: Option<&SpecVersion>) -> Result<String>;

    /// Whether serialization depends on the server's spec version
    fn needs_spec_version(&self) -> bool {
        false
    }
}

/// A search request against the standard request handler
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    text: String,
    start: Option<u64>,
    rows: Option<u64>,
    field_list: Option<Vec<String>>,
    filters: Option<Vec<String>>,
    operator: Option<Operator>,
    default_field: Option<String>,
    facets: Option<Facets>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::invalid("query must not be blank"));
        }

        Ok(Self {
            text,
            start: None,
            rows: None,
            field_list: None,
            filters: None,
            operator: None,
            default_field: None,
            facets: None,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start(&self) -> Option<u64> {
        self.start
    }

    pub fn rows(&self) -> Option<u64> {
        self.rows
    }

    pub fn field_list(&self) -> Option<&[String]> {
        self.field_list.as_deref()
    }

    pub fn filters(&self) -> Option<&[String]> {
        self.filters.as_deref()
    }

    pub fn operator(&self) -> Option<Operator> {
        self.operator
    }

    pub fn default_field(&self) -> Option<&str> {
        self.default_field.as_deref()
    }

    /// Offset of the first returned document; 0 is allowed
    pub fn set_start(&mut self, start: Option<i64>) -> Result<()> {
        self.start = match start {
            None => None,
            Some(n) if n < 0 => {
                return Err(Error::invalid(format!("start must not be negative: {n}")));
            }
            Some(n) => Some(n as u64),
        };
        Ok(())
    }

    /// Number of documents to return; must be at least 1
    pub fn set_rows(&mut self, rows: Option<i64>) -> Result<()> {
        self.rows = match rows {
            None => None,
            Some(n) if n < 1 => {
                return Err(Error::invalid(format!("rows must be at least 1: {n}")));
            }
            Some(n) => Some(n as u64),
        };
        Ok(())
    }

    /// Restrict the returned fields (`*` and `score` are valid names)
    pub fn set_field_list<I, S>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.field_list = Some(non_blank_list(fields, "field list")?);
        Ok(())
    }

    pub fn clear_field_list(&mut self) {
        self.field_list = None;
    }

    /// Filter queries, sent as one `fq` parameter each
    pub fn set_filters<I, S>(&mut self, filters: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filters = Some(non_blank_list(filters, "filter list")?);
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.filters = None;
    }

    pub fn set_operator(&mut self, operator: Option<Operator>) {
        self.operator = operator;
    }

    pub fn set_default_field(&mut self, field: Option<&str>) -> Result<()> {
        if let Some(f) = field {
            if f.trim().is_empty() {
                return Err(Error::invalid("default field must not be blank"));
            }
        }
        self.default_field = field.map(str::to_string);
        Ok(())
    }

    /// Facet parameters, if any have been configured
    pub fn facets(&self) -> Option<&Facets> {
        self.facets.as_ref()
    }

    /// Facet parameters, created empty on first access
    pub fn facets_mut(&mut self) -> &mut Facets {
        self.facets.get_or_insert_with(Facets::default)
    }

    pub fn set_facets(&mut self, facets: Option<Facets>) {
        self.facets = facets;
    }

    /// Serialize with `text` in place of this query's own text
    pub(crate) fn query_string_for(
        &self,
        text: &str,
        spec_version: Option<&SpecVersion>,
    ) -> Result<String> {
        let mut qs = format!("?qt=standard&wt=json&q={}", urlencode(text));

        if let Some(start) = self.start {
            qs.push_str(&format!("&start={}", start));
        }
        if let Some(rows) = self.rows {
            qs.push_str(&format!("&rows={}", rows));
        }
        if let Some(operator) = self.operator {
            qs.push_str(&format!("&q.op={}", operator));
        }
        if let Some(field) = &self.default_field {
            qs.push_str(&format!("&df={}", urlencode(field)));
        }
        if let Some(fields) = &self.field_list {
            qs.push_str(&format!("&fl={}", urlencode(&fields.join(","))));
        }
        for filter in self.filters.iter().flatten() {
            qs.push_str(&format!("&fq={}", urlencode(filter)));
        }
        if let Some(facets) = &self.facets {
            qs.push_str(&facets.query_string_part(spec_version)?);
        }

        Ok(qs)
    }
}

impl QueryParams for Query {
    fn query_string(&self, spec_version: Option<&SpecVersion>) -> Result<String> {
        self.query_string_for(&self.text, spec_version)
    }

    fn needs_spec_version(&self) -> bool {
        self.facets.as_ref().is_some_and(Facets::is_version_sensitive)
    }
}

/// A bare string is searched as a default query
impl QueryParams for str {
    fn query_string(&self, spec_version: Option<&SpecVersion>) -> Result<String> {
        Query::new(self)?.query_string(spec_version)
    }
}

impl QueryParams for String {
    fn query_string(&self, spec_version: Option<&SpecVersion>) -> Result<String> {
        self.as_str().query_string(spec_version)
    }
}

fn non_blank_list<I, S>(values: I, what: &str) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut list = Vec::new();
    for value in values {
        let value = value.as_ref().trim();
        if value.is_empty() {
            return Err(Error::invalid(format!("{what} contains a blank entry")));
        }
        list.push(value.to_string());
    }
    if list.is_empty() {
        return Err(Error::invalid(format!("{what} must not be empty")));
    }
    Ok(list)
}
