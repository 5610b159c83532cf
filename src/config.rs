use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ExporterError, Result};

/// Configuration file structure for the exporter.
///
/// Loaded once at startup from the path given by `--config`; there is
/// no hot reload. Each account entry becomes one independent poller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// TravisCI accounts (users or organizations) to poll
    pub accounts: Vec<Account>,
}

/// One TravisCI identity to poll: a name, its API token, and which API
/// variant (public or organization-hosted) the token belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Account {
    /// TravisCI username or organization name
    pub name: String,

    /// TravisCI API token for this account
    pub token: String,

    /// Which API endpoint this account lives on
    #[serde(default)]
    pub endpoint: Endpoint,
}

/// TravisCI API endpoint variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    /// The public open-source API at api.travis-ci.org
    #[default]
    Public,
    /// The hosted (private/organization) API at api.travis-ci.com
    Hosted,
}

impl Endpoint {
    pub fn base_url(&self) -> &'static str {
        match self {
            Endpoint::Public => "https://api.travis-ci.org",
            Endpoint::Hosted => "https://api.travis-ci.com",
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// Any failure here is fatal at startup: a missing, unreadable, or
    /// malformed file aborts the process before any poller starts.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ExporterError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let config: Config = serde_yaml::from_str(&contents)?;

        if config.accounts.is_empty() {
            return Err(ExporterError::Config(format!(
                "No accounts configured in {}",
                path.display()
            )));
        }

        Ok(config)
    }
}
