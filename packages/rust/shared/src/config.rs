//! Application configuration for ContextFunnel.
//!
//! User config lives at `~/.contextfunnel/contextfunnel.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FunnelError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "contextfunnel.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".contextfunnel";

// ---------------------------------------------------------------------------
// Config structs (matching contextfunnel.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// GitHub API settings.
    #[serde(default)]
    pub github: GithubConfig,

    /// Scholarly-identifier resolver settings.
    #[serde(default)]
    pub scholarly: ScholarlyConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding per-run artifact directories and the run history db.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Timeout applied to every outbound fetch, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_data_dir() -> String {
    "~/.contextfunnel/runs".into()
}
fn default_fetch_timeout_secs() -> u64 {
    30
}

/// `[github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// REST API base URL.
    #[serde(default = "default_github_api_base")]
    pub api_base: String,

    /// Raw-content base URL.
    #[serde(default = "default_github_raw_base")]
    pub raw_base: String,

    /// Name of the env var holding the token (never store the token itself).
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api_base(),
            raw_base: default_github_raw_base(),
            token_env: default_github_token_env(),
        }
    }
}

fn default_github_api_base() -> String {
    "https://api.github.com".into()
}
fn default_github_raw_base() -> String {
    "https://raw.githubusercontent.com".into()
}
fn default_github_token_env() -> String {
    "GITHUB_TOKEN".into()
}

/// `[scholarly]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScholarlyConfig {
    /// Crossref works API base, used for DOI resolution.
    #[serde(default = "default_crossref_base")]
    pub crossref_base: String,

    /// NCBI E-utilities base, used for PubMed ids.
    #[serde(default = "default_ncbi_base")]
    pub ncbi_base: String,
}

impl Default for ScholarlyConfig {
    fn default() -> Self {
        Self {
            crossref_base: default_crossref_base(),
            ncbi_base: default_ncbi_base(),
        }
    }
}

fn default_crossref_base() -> String {
    "https://api.crossref.org".into()
}
fn default_ncbi_base() -> String {
    "https://eutils.ncbi.nlm.nih.gov".into()
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

fn default_server_host() -> String {
    "127.0.0.1".into()
}
fn default_server_port() -> u16 {
    5001
}

// ---------------------------------------------------------------------------
// Crawl parameters (runtime)
// ---------------------------------------------------------------------------

/// Runtime crawl parameters. The webpage dispatch path pins depth and the
/// PDF/EPUB policy; tests and library callers may vary them.
#[derive(Debug, Clone)]
pub struct CrawlParams {
    /// Maximum crawl depth from the seed URL (seed is depth 0).
    pub max_depth: u32,
    /// Extract text from PDF resources (always traversal leaves).
    pub include_pdfs: bool,
    /// Skip EPUB resources entirely.
    pub ignore_epubs: bool,
    /// Per-fetch timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CrawlParams {
    fn default() -> Self {
        Self {
            max_depth: 2,
            include_pdfs: true,
            ignore_epubs: true,
            timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl From<&AppConfig> for CrawlParams {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.defaults.fetch_timeout_secs,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.contextfunnel/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FunnelError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.contextfunnel/contextfunnel.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FunnelError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| FunnelError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FunnelError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FunnelError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FunnelError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` against the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| FunnelError::config("could not determine home directory"))?;
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(path))
}

/// Resolve the data directory from config, expanding `~`.
pub fn data_dir(config: &AppConfig) -> Result<PathBuf> {
    expand_home(&config.defaults.data_dir)
}
