//! Configuration loading
//!
//! Settings are read from a TOML file. Every section is optional and falls
//! back to defaults, so an empty file (or no file at all) is a valid config.
//!
//! ```toml
//! [source]
//! root = "~/src/MudBlazor"
//! repository_url = "https://github.com/MudBlazor/MudBlazor.git"
//! branch = "dev"
//!
//! [index]
//! include_internal = false
//! max_examples_per_component = 20
//!
//! [cache]
//! sliding_expiration_secs = 1800
//! absolute_expiration_secs = 7200
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheOptions;
use crate::categories::CategoryTable;

/// Config file looked up in the working directory
pub const CONFIG_FILE: &str = "mudscope.toml";

/// Per-user config directory under the home directory
pub const USER_CONFIG_DIR: &str = ".mudscope";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub index: IndexConfig,
    pub cache: CacheConfig,
    pub layout: LayoutConfig,
    /// Curated category table (defaults to the built-in table)
    pub categories: CategoryTable,
}

/// Where the library source tree lives and how to obtain it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Local checkout of the library source tree
    pub root: PathBuf,
    /// Clone/pull from here when set
    pub repository_url: Option<String>,
    /// Branch to clone (None = remote default)
    pub branch: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("MudBlazor"),
            repository_url: None,
            branch: None,
        }
    }
}

/// Indexing behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Index `internal` and `[Obsolete]` components too
    pub include_internal: bool,
    /// Keep at most this many examples per component (sorted by file name)
    pub max_examples_per_component: usize,
    /// Standard component name prefix, omitted in display names
    pub component_prefix: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            include_internal: false,
            max_examples_per_component: 20,
            component_prefix: "Mud".to_string(),
        }
    }
}

/// Result cache expiration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 0 disables sliding expiration
    pub sliding_expiration_secs: u64,
    /// 0 disables absolute expiration
    pub absolute_expiration_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sliding_expiration_secs: 30 * 60,
            absolute_expiration_secs: 2 * 60 * 60,
        }
    }
}

impl CacheConfig {
    pub fn options(&self) -> CacheOptions {
        let secs = |s: u64| (s > 0).then(|| Duration::from_secs(s));
        CacheOptions {
            sliding_expiration: secs(self.sliding_expiration_secs),
            absolute_expiration: secs(self.absolute_expiration_secs),
        }
    }
}

/// Relative locations inside the source tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Component declarations (`*.razor.cs`, `*.cs`, `*.razor`)
    pub components_dir: PathBuf,
    /// Extra directories scanned for API types only (enums, options classes)
    pub api_dirs: Vec<PathBuf>,
    /// Documentation pages, one directory per component (`Button/ButtonPage.razor`)
    pub docs_pages_dir: PathBuf,
    /// Example subdirectory name inside each documentation page directory
    pub examples_subdir: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            components_dir: PathBuf::from("src/MudBlazor/Components"),
            api_dirs: vec![PathBuf::from("src/MudBlazor/Enums")],
            docs_pages_dir: PathBuf::from("src/MudBlazor.Docs/Pages/Components"),
            examples_subdir: "Examples".to_string(),
        }
    }
}

impl Config {
    /// Parse a config from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse config TOML")
    }

    /// Load a config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load config from the explicit path, `./mudscope.toml`, or
    /// `~/.mudscope/config.toml`, in that order. Falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Self::load_file(&local);
        }

        if let Some(home) = dirs::home_dir() {
            let user = home.join(USER_CONFIG_DIR).join("config.toml");
            if user.exists() {
                return Self::load_file(&user);
            }
        } else {
            log::debug!("Could not determine home directory");
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.index.max_examples_per_component, 20);
        assert_eq!(config.index.component_prefix, "Mud");
        assert!(!config.index.include_internal);
        assert!(!config.categories.entries.is_empty());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
            [source]
            root = "/tmp/mud"

            [index]
            include_internal = true

            [cache]
            sliding_expiration_secs = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.source.root, PathBuf::from("/tmp/mud"));
        assert!(config.index.include_internal);
        assert_eq!(config.index.max_examples_per_component, 20);

        let options = config.cache.options();
        assert!(options.sliding_expiration.is_none());
        assert_eq!(options.absolute_expiration, Some(Duration::from_secs(7200)));
    }

    #[test]
    fn test_load_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mudscope.toml");
        std::fs::write(&path, "[index]\nmax_examples_per_component = 3\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.index.max_examples_per_component, 3);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::from_toml("[index\n").is_err());
    }
}
