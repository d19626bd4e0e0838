//! TOML configuration with environment overrides.
//!
//! Every setting has a default except the Contentful credentials and the
//! home page id, which usually come from the environment (or a `.env`
//! file loaded by the CLI) rather than from the config file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the snapshot file inside `export.data_dir`.
pub const SNAPSHOT_FILE_NAME: &str = "data.json";

/// Highest `include` depth the Content Delivery API accepts.
pub const MAX_INCLUDE_DEPTH: u8 = 10;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub contentful: ContentfulConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub content: ContentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentfulConfig {
    #[serde(default)]
    pub space_id: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub home_page_id: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ContentfulConfig {
    fn default() -> Self {
        Self {
            space_id: String::new(),
            access_token: String::new(),
            environment: default_environment(),
            home_page_id: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_environment() -> String {
    "master".to_string()
}
fn default_base_url() -> String {
    "https://cdn.contentful.com".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    #[serde(default = "default_export_include_depth")]
    pub include_depth: u8,
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// URL prefix under which the storefront serves `assets_dir`.
    #[serde(default = "default_public_asset_prefix")]
    pub public_asset_prefix: String,
    /// File name used when an asset carries none.
    #[serde(default = "default_file_name")]
    pub default_file_name: String,
    #[serde(default = "default_routes_path")]
    pub routes_path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            include_depth: default_export_include_depth(),
            assets_dir: default_assets_dir(),
            data_dir: default_data_dir(),
            public_asset_prefix: default_public_asset_prefix(),
            default_file_name: default_file_name(),
            routes_path: default_routes_path(),
        }
    }
}

impl ExportConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE_NAME)
    }
}

fn default_export_include_depth() -> u8 {
    5
}
fn default_assets_dir() -> PathBuf {
    PathBuf::from("src/assets/contentful")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("src/assets/data")
}
fn default_public_asset_prefix() -> String {
    "/assets/contentful".to_string()
}
fn default_file_name() -> String {
    "image.jpg".to_string()
}
fn default_routes_path() -> PathBuf {
    PathBuf::from("src/assets/routes.json")
}

/// Settings for the read path.
#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    #[serde(default = "default_content_include_depth")]
    pub include_depth: u8,
    /// Overrides `export.data_dir/data.json`.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            include_depth: default_content_include_depth(),
            snapshot_path: None,
        }
    }
}

fn default_content_include_depth() -> u8 {
    10
}

impl Config {
    /// Snapshot file read by the content facade.
    pub fn snapshot_path(&self) -> PathBuf {
        self.content
            .snapshot_path
            .clone()
            .unwrap_or_else(|| self.export.snapshot_path())
    }

    /// Apply `CONTENTFUL_*` overrides. `lookup` is `std::env::var` in
    /// production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let cf = &mut self.contentful;
        let targets: [(&str, &mut String); 5] = [
            ("CONTENTFUL_SPACE_ID", &mut cf.space_id),
            ("CONTENTFUL_ACCESS_TOKEN", &mut cf.access_token),
            ("CONTENTFUL_ENVIRONMENT", &mut cf.environment),
            ("CONTENTFUL_HOME_PAGE_ID", &mut cf.home_page_id),
            ("CONTENTFUL_BASE_URL", &mut cf.base_url),
        ];
        for (key, slot) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let cf = &self.contentful;
        for (name, env, value) in [
            ("contentful.space_id", "CONTENTFUL_SPACE_ID", &cf.space_id),
            ("contentful.access_token", "CONTENTFUL_ACCESS_TOKEN", &cf.access_token),
            ("contentful.home_page_id", "CONTENTFUL_HOME_PAGE_ID", &cf.home_page_id),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("Missing required configuration: {} (or {})", name, env);
            }
        }

        if cf.environment.trim().is_empty() {
            anyhow::bail!("contentful.environment must not be empty");
        }

        if self.export.include_depth > MAX_INCLUDE_DEPTH {
            anyhow::bail!("export.include_depth must be <= {}", MAX_INCLUDE_DEPTH);
        }
        if self.content.include_depth > MAX_INCLUDE_DEPTH {
            anyhow::bail!("content.include_depth must be <= {}", MAX_INCLUDE_DEPTH);
        }

        if self.export.default_file_name.contains(['/', '\\']) {
            anyhow::bail!("export.default_file_name must be a bare file name");
        }

        Ok(())
    }
}

/// Parse TOML configuration text without touching the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

/// Load configuration from `path` (if it exists), apply environment
/// overrides, and validate.
///
/// A missing file is not an error: defaults plus `CONTENTFUL_*` variables
/// are enough to run.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        Config::default()
    };

    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Load a `.env` file from the working directory (or a parent) into the
/// process environment. Variables that are already set win.
///
/// Returns the file that was loaded. A missing file is `Ok(None)`; an
/// unreadable or malformed one is an error.
pub fn load_dotenv() -> Result<Option<PathBuf>> {
    dotenv_outcome(dotenvy::dotenv())
}

fn dotenv_outcome(result: dotenvy::Result<PathBuf>) -> Result<Option<PathBuf>> {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).context("Failed to load .env file"),
    }
}
