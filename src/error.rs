//! Typed errors for the export and read paths.
//!
//! Only [`RemoteFetchError`] and [`ExportError`] are ever surfaced to a
//! caller as failures. [`AssetFetchError`], [`SnapshotReadError`] and
//! [`MalformedEntity`] are recovered where they occur (degrade-and-continue)
//! and exist as types so the recovery sites can log them precisely.

use std::path::PathBuf;

use thiserror::Error;

/// A request to the Contentful Content Delivery API failed.
#[derive(Debug, Error)]
pub enum RemoteFetchError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout).
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-2xx status.
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The query succeeded but matched no entry.
    #[error("entry not found: {id}")]
    NotFound { id: String },

    /// The response body was not valid JSON.
    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// A single asset could not be downloaded to disk.
#[derive(Debug, Error)]
#[error("failed to fetch asset {url} into {file_name}: {reason}")]
pub struct AssetFetchError {
    /// Normalized (absolute) URL that was requested.
    pub url: String,
    /// Local file name the asset was meant to be written to.
    pub file_name: String,
    pub reason: String,
}

/// The persisted snapshot could not be used.
#[derive(Debug, Error)]
pub enum SnapshotReadError {
    #[error("snapshot not found at {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read snapshot {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse snapshot {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// An entity reference that cannot be projected (no id, dangling link,
/// wrong kind).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed entity '{id}': {reason}")]
pub struct MalformedEntity {
    pub id: String,
    pub reason: &'static str,
}

/// Fatal failures of an export run. Nothing is written when one occurs.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to fetch home page: {0}")]
    RemoteFetch(#[from] RemoteFetchError),

    #[error("home page entry '{id}' is missing or malformed in the API response")]
    MissingHome { id: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}
