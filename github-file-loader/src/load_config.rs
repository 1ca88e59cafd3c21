/// `load_config` module: loads the static YAML config that drives one `sync` run.
///
/// This is the only place where user-supplied YAML is parsed. It maps the file onto
/// [`CliConfig`], from which the CLI builds the GitHub client and the host configuration
/// handed to every processor.
///
/// # Accepted schema
///
/// ```yaml
/// username: namesakefyi        # repository owner
/// repo: policies
/// branch: main                 # optional, default "main"
/// api_base: https://api.github.com               # optional
/// raw_base: https://raw.githubusercontent.com    # optional
/// output: ./content/policies.json
/// resilient: false             # optional, continue past per-file failures
/// markdown:                    # optional, passed to processors as host config
///   gfm: true
///   smartypants: false
///   footnotes: false
/// ```
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use github_file_loader_core::processor::HostConfig;
use github_file_loader_core::remote::{GitHubClient, DEFAULT_BRANCH};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::processors::MarkdownOptions;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CliConfig {
    pub username: String,
    pub repo: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub raw_base: Option<String>,
    pub output: PathBuf,
    #[serde(default)]
    pub resilient: bool,
    #[serde(default)]
    pub markdown: MarkdownOptions,
}

impl CliConfig {
    pub fn branch(&self) -> &str {
        self.branch.as_deref().unwrap_or(DEFAULT_BRANCH)
    }

    /// Host configuration passed unmodified to every processor.
    pub fn host_config(&self) -> HostConfig {
        json!({ "markdown": self.markdown })
    }

    pub fn client(&self) -> GitHubClient {
        let mut client =
            GitHubClient::new(self.username.clone(), self.repo.clone()).with_branch(self.branch());
        if let Some(api_base) = &self.api_base {
            client = client.with_api_base(api_base.clone());
        }
        if let Some(raw_base) = &self.raw_base {
            client = client.with_raw_base(raw_base.clone());
        }
        client
    }
}

/// Loads a static YAML config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if config.username.trim().is_empty() || config.repo.trim().is_empty() {
        error!(config_path = ?path_ref, "Config is missing username or repo");
        return Err(anyhow::anyhow!(
            "Config {:?} must set a non-empty username and repo",
            path_ref
        ));
    }

    Ok(config)
}
