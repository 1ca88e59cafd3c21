//! Error taxonomy for a load.
//!
//! Tree and body fetch failures, render failures and store rejections are all
//! fatal to a fail-fast [`crate::loader::Loader::load`]. An extension with no
//! registered processor is *not* an error: it degrades to an empty render with
//! `metadata.error` set (see [`crate::processor`]).

use thiserror::Error;

/// Error returned by render functions. Boxed so processors can surface any error type.
pub type RenderError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by [`crate::contract::Store`] implementations.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum LoaderError {
    /// Transport-level failure reaching the remote host.
    #[error("network error: {0}")]
    Network(String),

    /// A configured base URL could not be turned into a request URL.
    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// Non-success response or unparseable payload from the remote API.
    #[error("remote API error: {status} - {message}")]
    RemoteApi {
        /// HTTP status code
        status: u16,
        /// Error message from the API, or the parse failure
        message: String,
    },

    /// A registered render function failed.
    #[error("render failed for {path} (.{extension}): {message}")]
    Render {
        path: String,
        extension: String,
        message: String,
    },

    /// The host's digest function produced an empty fingerprint.
    #[error("digest for {path} is empty")]
    EmptyDigest { path: String },

    /// The store rejected an upsert.
    #[error("store rejected record {id}: {message}")]
    Store { id: String, message: String },
}

impl LoaderError {
    /// HTTP status of a remote API failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            LoaderError::RemoteApi { status, .. } => Some(*status),
            _ => None,
        }
    }
}
