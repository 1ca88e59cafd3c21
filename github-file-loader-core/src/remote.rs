//! remote
//!
//! GitHub implementation of [`RepositoryClient`].
//!
//! # Endpoints
//!
//! - Tree: `GET {api_base}/repos/{owner}/{repo}/git/trees/{branch}?recursive=1`
//! - Raw file: `GET {raw_base}/{owner}/{repo}/{branch}/{path}`
//!
//! Raw file paths are percent-encoded one segment at a time, so names containing
//! `#`, `?` or `%` address the file rather than a fragment or query.
//!
//! Each call issues exactly one request. There is no caching, retry or
//! rate-limit handling: a transport failure maps to [`LoaderError::Network`]
//! and a non-2xx or unparseable response to [`LoaderError::RemoteApi`].
//! Truncated tree listings are logged but not paginated.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::contract::RepositoryClient;
use crate::error::LoaderError;
use crate::record::TreeEntry;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default base URL for raw file contents.
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// Default branch to load.
pub const DEFAULT_BRANCH: &str = "main";

/// GitHub rejects API requests without a User-Agent.
const USER_AGENT_VALUE: &str = "github-file-loader";

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    owner: String,
    repo: String,
    branch: String,
    api_base: String,
    raw_base: String,
}

impl GitHubClient {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            owner: owner.into(),
            repo: repo.into(),
            branch: DEFAULT_BRANCH.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            raw_base: DEFAULT_RAW_BASE.to_string(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Overrides the API base (GitHub Enterprise, test servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_raw_base(mut self, raw_base: impl Into<String>) -> Self {
        self.raw_base = raw_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn tree_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_base, self.owner, self.repo, self.branch
        )
    }

    pub fn raw_url(&self, path: &str) -> Result<Url, LoaderError> {
        let invalid = |message: String| LoaderError::InvalidUrl {
            url: self.raw_base.clone(),
            message,
        };
        let mut url = Url::parse(&self.raw_base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("base cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend([self.owner.as_str(), self.repo.as_str()])
            .extend(self.branch.split('/'))
            .extend(path.split('/'));
        Ok(url)
    }

    async fn get(&self, url: &str, accept: &'static str) -> Result<Response, LoaderError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| LoaderError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        };
        Err(LoaderError::RemoteApi {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RepositoryClient for GitHubClient {
    async fn fetch_tree(&self) -> Result<Vec<TreeEntry>, LoaderError> {
        let url = self.tree_url();
        debug!(url = %url, "Fetching repository tree");

        let response = self.get(&url, "application/vnd.github+json").await?;
        let status = response.status();
        let data: TreeResponse = response.json().await.map_err(|e| LoaderError::RemoteApi {
            status: status.as_u16(),
            message: format!("Failed to parse tree response: {}", e),
        })?;

        if data.truncated {
            warn!(
                owner = %self.owner,
                repo = %self.repo,
                entries = data.tree.len(),
                "Tree listing was truncated by the API; some files will not be loaded"
            );
        }
        debug!(entries = data.tree.len(), "Fetched repository tree");
        Ok(data.tree)
    }

    async fn fetch_file_body(&self, path: &str) -> Result<String, LoaderError> {
        let url = self.raw_url(path)?;
        debug!(url = %url, "Fetching raw file");

        let response = self.get(url.as_str(), "text/plain").await?;
        let status = response.status();
        response.text().await.map_err(|e| LoaderError::RemoteApi {
            status: status.as_u16(),
            message: format!("Failed to read body of {}: {}", path, e),
        })
    }
}
