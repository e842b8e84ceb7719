//! solrkit Core Library
//!
//! This crate provides the request-building and response-decoding side of the
//! solrkit Solr client, including:
//! - Field and document model for the XML update protocol
//! - Query builder with facet parameters
//! - Result parsing into read-only hits and facet counts
//! - Priority-weighted search field composition
//! - Configuration

pub mod config;
pub mod document;
pub mod error;
pub mod facets;
pub mod query;
pub mod result;
pub mod search_field;
pub mod update;
pub mod version;

// Re-export commonly used types
pub use config::Config;
pub use document::{Document, Field, FieldValue, IndexDocument};
pub use error::{Error, Result};
pub use facets::{FacetField, FacetOptions, FacetParams, FacetSort, Facets, IntoFacetField};
pub use query::{Operator, Query, QueryParams};
pub use result::{FacetCounts, Hit, SearchResult, ValueCounts};
pub use search_field::{
    FieldPriorities, PrioritySearchField, SearchField, SearchQuery, SimpleSearchField, SortOrder,
};
pub use version::SpecVersion;
