//! Site adapters that turn a listing page into feed items.
//!
//! Every adapter implements [`Source`]: one GET of its home page, a scan of
//! the repeating entries on it, and optionally one follow-up GET per entry.
//!
//! - [`http`] - client construction and size-capped page retrieval
//! - [`extract`] - strict and soft field extraction on parsed documents
//! - [`listing`] - selector-driven listings (one CSS selector per field)
//! - [`year_index`] - archive pages where entries are the siblings of a year anchor
//!
//! # Failure policy
//!
//! Title, date and link are strict: the first entry missing one of them
//! aborts the whole call with an [`ExtractError`] and no items are returned.
//! Fields filled by a follow-up request are soft: any failure leaves them
//! empty. There are no retries.

mod extract;
mod http;
mod listing;
mod year_index;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::feed::Item;
use crate::util::DateFormat;

pub use http::HttpSettings;
pub use listing::{DescriptionRule, ListingRules, ListingSource};
pub use year_index::{FollowUpDate, YearIndexSource};

/// A scraped site.
///
/// Implementations hold only read-only configuration, so the same source may
/// be fetched repeatedly and different sources may be fetched concurrently.
#[async_trait]
pub trait Source: Send + Sync {
    /// Human-readable label, used in the feed title and the output filename.
    fn name(&self) -> &str;

    /// The page that is scraped, also published as the channel link.
    fn home_url(&self) -> &str;

    /// Retrieve the home page and extract its entries in page order.
    async fn fetch(&self) -> Result<Vec<Item>, FetchError>;
}

/// The required fields of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Date,
    Link,
    Description,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Title => "title",
            Field::Date => "date",
            Field::Link => "link",
            Field::Description => "description",
        })
    }
}

/// The markup no longer has the shape the adapter expects.
///
/// `index` is the zero-based position of the offending entry on the page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("missing {field} element at entry {index}")]
    Missing { field: Field, index: usize },

    #[error("empty {field} at entry {index}")]
    Empty { field: Field, index: usize },

    #[error("cannot parse date {token:?} as {format} at entry {index}")]
    InvalidDate {
        token: String,
        format: DateFormat,
        index: usize,
    },
}

impl ExtractError {
    pub fn field(&self) -> Field {
        match self {
            ExtractError::Missing { field, .. } | ExtractError::Empty { field, .. } => *field,
            ExtractError::InvalidDate { .. } => Field::Date,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            ExtractError::Missing { index, .. }
            | ExtractError::Empty { index, .. }
            | ExtractError::InvalidDate { index, .. } => *index,
        }
    }
}

/// A source definition that cannot be used.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("invalid URL {url:?}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("source {0:?} sets both `description` and `description_page`")]
    ConflictingDescription(String),
}

/// Errors that end a source's run. Nothing is published for that source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be configured
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    /// Request construction, DNS, connection or TLS failure
    #[error("Request failed: {0}")]
    Network(#[source] reqwest::Error),
    /// The request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Any status other than 200 OK
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Body exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Fewer bytes arrived than Content-Length announced
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// The adapter itself is misconfigured
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    /// A strict field was missing, empty or malformed
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl FetchError {
    pub(crate) fn from_request(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e)
        }
    }
}

/// The sites this tool ships with, in publication order.
pub fn builtin_sources(http: &HttpSettings) -> Result<Vec<Arc<dyn Source>>, DefinitionError> {
    Ok(vec![
        Arc::new(ListingSource::gabriel_albiac(http.clone())?),
        Arc::new(ListingSource::rory_sutherland(http.clone())?),
        Arc::new(YearIndexSource::kir_shatrov(http.clone())?),
    ])
}
