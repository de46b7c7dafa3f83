use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use redirect_proto::RedirectRule;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Root directory holding one subdirectory per category.
    #[serde(default = "default_database_dir")]
    pub database_dir: PathBuf,
    /// Every category the store should load.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Categories whose members are redirected.  Must be a subset of
    /// `categories`; checked at startup.
    #[serde(default)]
    pub block: Vec<String>,
    /// Identities in any of these groups are never redirected.
    #[serde(default)]
    pub exempt_groups: Vec<String>,
    /// Redirect requests whose host is a literal IP address.
    #[serde(default)]
    pub block_ip_hosts: bool,
    /// How to build the redirect target.  Leaving this unset is fatal as
    /// soon as a redirect is actually needed.
    #[serde(default)]
    pub redirect: Option<RedirectRule>,
    /// group(5) file consulted for exempt-group membership.
    #[serde(default = "default_group_file")]
    pub group_file: PathBuf,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_dir: default_database_dir(),
            categories: Vec::new(),
            block: Vec::new(),
            exempt_groups: Vec::new(),
            block_ip_hosts: false,
            redirect: None,
            group_file: default_group_file(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default-value functions used by serde
// ---------------------------------------------------------------------------

fn default_database_dir() -> PathBuf {
    PathBuf::from("db")
}

fn default_group_file() -> PathBuf {
    PathBuf::from("/etc/group")
}

fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load configuration from a YAML file.
///
/// If the file does not exist a default configuration is returned and a
/// warning is emitted, so the helper can run against a pre-built database
/// with command-line overrides only.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "configuration file not found; using defaults"
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

    let config: Config = serde_yml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;

    Ok(config)
}
