//! solrkit Client Library
//!
//! Async connection to a Solr server: pushes XML update payloads, runs
//! queries and decodes their results.

mod connection;
mod executor;

pub use connection::{ConfiguredDefaults, Connection, DefaultFieldsInjector};
pub use executor::{HttpExecutor, HttpRequest, HttpResponse, Method, ReqwestExecutor, USER_AGENT};
pub use solrkit_core::{Document, Field, Query, SearchQuery, SearchResult, SpecVersion};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Unable to connect to Solr: {0}")]
    Connection(String),

    #[error("Unable to determine the Solr spec version: {0}")]
    VersionUnavailable(String),

    #[error(transparent)]
    Core(#[from] solrkit_core::Error),
}

impl ClientError {
    /// HTTP status carried by a server error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
