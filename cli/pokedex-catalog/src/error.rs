//! Error handling for catalog API operations.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single request against the catalog API.
///
/// Every variant represents a network-level failure from the point of view
/// of the caller: the request was issued once and did not produce a usable
/// response. Nothing is retried at this layer.
#[derive(Debug, Error)]
pub enum CatalogClientError {
    #[error("invalid catalog url '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to '{url}' failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("'{url}' responded with {status}")]
    Status { url: String, status: StatusCode },
    #[error("could not decode response from '{url}'")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{0}")]
    Other(String),
}

impl CatalogClientError {
    /// The HTTP status of the response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CatalogClientError::Status { status, .. } => Some(*status),
            CatalogClientError::Transport { source, .. }
            | CatalogClientError::Decode { source, .. } => source.status(),
            _ => None,
        }
    }

    pub(crate) fn not_found(url: impl Into<String>) -> Self {
        CatalogClientError::Status {
            url: url.into(),
            status: StatusCode::NOT_FOUND,
        }
    }
}

/// Failure to read or write persisted favorites.
#[derive(Debug, Error)]
pub enum FavoritesError {
    #[error("favorites stored in an invalid location: {0}")]
    InvalidLocation(PathBuf),
    #[error("failed to read stored favorites")]
    Read(#[source] std::io::Error),
    #[error("failed to acquire lock on stored favorites")]
    Lock(#[source] std::io::Error),
    #[error("failed to write temporary favorites file")]
    Write(#[source] std::io::Error),
    #[error("failed to rename temporary favorites file")]
    Persist(#[source] tempfile::PersistError),
    #[error("stored favorites are malformed")]
    Decode(#[source] serde_json::Error),
}
