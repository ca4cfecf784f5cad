//! Failure taxonomy for resolution, fetching, and parsing.

use std::io;

use thiserror::Error;
use url::Url;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by resolution, fetching, and parsing.
///
/// Per-source misses during chain iteration are normal control flow and
/// never appear here; only exhaustion of a whole chain does.
#[derive(Debug, Error)]
pub enum Error {
    /// No source in the chain produced the named resource.
    #[error("could not find resource {0}")]
    NotFound(String),

    /// No source in the chain could resolve the qualified type name.
    #[error("cannot find type: {0}")]
    TypeNotFound(String),

    /// The locator has no local-file representation.
    #[error("resource at {0} has no local file path")]
    NotAFile(Url),

    /// The supplied address could not be parsed as an absolute URL.
    #[error("invalid url {url}")]
    InvalidUrl {
        /// The address as supplied by the caller.
        url: String,
        /// Parse failure reported by the URL parser.
        #[source]
        source: url::ParseError,
    },

    /// The address scheme is not fetchable.
    #[error("unsupported url scheme {scheme:?} in {url}")]
    UnsupportedScheme {
        /// The address that was rejected.
        url: Url,
        /// Its scheme.
        scheme: String,
    },

    /// Transport failure while fetching a direct address.
    #[error("failed to fetch {url}")]
    Fetch {
        /// The address being fetched.
        url: Url,
        /// Underlying transport error, propagated unchanged.
        #[source]
        source: reqwest::Error,
    },

    /// Underlying I/O failure, propagated unchanged.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Malformed properties input.
    #[error("malformed properties input at line {line}: {reason}")]
    Properties {
        /// One-based logical line where parsing failed.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Configuration layer failure.
    #[error(transparent)]
    Config(#[from] ::config::ConfigError),
}
