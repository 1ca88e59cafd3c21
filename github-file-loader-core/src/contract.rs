//! # contract: seams between the loader and its collaborators
//!
//! Two traits, both async and both mockable through `mockall`:
//! - [`RepositoryClient`]: lists the remote tree and fetches raw file bodies.
//!   [`crate::remote::GitHubClient`] is the production implementation.
//! - [`Store`]: the host's content store, upserting one [`FileRecord`] per id.
//!   [`crate::store::MemoryStore`] is a reference implementation.
//!
//! Mocks (`MockRepositoryClient`, `MockStore`) are exported behind the
//! `test-export-mocks` feature so downstream crates can use them in tests.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{LoaderError, StoreError};
use crate::record::{FileRecord, TreeEntry};

/// Remote repository access, fixed to one owner/repo/branch at construction.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Full recursive listing of the branch. One request per call.
    async fn fetch_tree(&self) -> Result<Vec<TreeEntry>, LoaderError>;

    /// Raw text of the file at `path`. One request per call.
    async fn fetch_file_body(&self, path: &str) -> Result<String, LoaderError>;
}

/// Content store supplied by the host.
///
/// `set` replaces any record with the same id wholesale. Implementations used
/// with concurrent loads must tolerate concurrent calls for distinct ids.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Store: Send + Sync {
    async fn set(&self, record: FileRecord) -> Result<(), StoreError>;
}
