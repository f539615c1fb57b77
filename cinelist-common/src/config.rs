//! Configuration loading and config file resolution
//!
//! Values are resolved in this order (later wins):
//! 1. Compiled defaults
//! 2. TOML config file
//! 3. Environment variables
//! 4. Command-line flags (applied by the binary after [`load_config`])
//!
//! The result is validated once, after every layer has been applied.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CINELIST_CONFIG";

/// Maximum number of candidates shown in one interactive choice
pub const MAX_CHOICE_OPTIONS: usize = 5;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite database file holding the catalog
    pub database_path: PathBuf,
    /// HTTP bind address for the transport adapter
    pub bind: String,
    /// Provider locales in priority order; the first one is the primary locale
    pub search_locales: Vec<String>,
    /// Lifetime of an interactive choice, in seconds
    pub choice_ttl_secs: u64,
    /// Reject queries without a trailing year instead of searching unfiltered
    pub require_year: bool,
    /// Lowest accepted query year
    pub year_min: i32,
    /// Highest accepted query year
    pub year_max: i32,
    /// Normalized title similarity (0.0-1.0) below which a candidate is
    /// demoted behind closer titles in a similar-title prompt
    pub similar_title_threshold: f64,
    /// Metadata provider settings
    pub tmdb: TmdbConfig,
}

/// TMDb client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TmdbConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Total attempts for transient failures (5xx, network), including the first
    pub max_attempts: u32,
    /// Rows kept from one search page
    pub search_result_limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind: "127.0.0.1:5780".to_string(),
            search_locales: vec!["ru".to_string(), "en".to_string()],
            choice_ttl_secs: 120,
            require_year: false,
            year_min: 1888,
            year_max: 2100,
            similar_title_threshold: 0.8,
            tmdb: TmdbConfig::default(),
        }
    }
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.themoviedb.org/3".to_string(),
            timeout_secs: 10,
            max_attempts: 2,
            search_result_limit: 10,
        }
    }
}

impl CatalogConfig {
    /// Primary display/search locale
    pub fn primary_locale(&self) -> &str {
        self.search_locales
            .first()
            .map(String::as_str)
            .unwrap_or("en")
    }

    /// Interactive choice lifetime
    pub fn choice_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.choice_ttl_secs)
    }

    /// Apply environment variable overrides
    ///
    /// Unparseable numeric or boolean values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("CINELIST_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(bind) = std::env::var("CINELIST_BIND") {
            self.bind = bind;
        }
        if let Ok(locales) = std::env::var("CINELIST_LOCALES") {
            self.search_locales = parse_locale_list(&locales);
        }
        if let Ok(ttl) = std::env::var("CINELIST_CHOICE_TTL") {
            match ttl.trim().parse() {
                Ok(secs) => self.choice_ttl_secs = secs,
                Err(_) => warn!(value = %ttl, "Ignoring invalid CINELIST_CHOICE_TTL"),
            }
        }
        if let Ok(flag) = std::env::var("CINELIST_REQUIRE_YEAR") {
            match parse_bool(&flag) {
                Some(value) => self.require_year = value,
                None => warn!(value = %flag, "Ignoring invalid CINELIST_REQUIRE_YEAR"),
            }
        }
        if let Ok(key) = std::env::var("TMDB_KEY") {
            if !key.trim().is_empty() {
                self.tmdb.api_key = Some(key.trim().to_string());
            }
        }
    }

    /// Validate the fully resolved configuration
    pub fn validate(&self) -> Result<()> {
        if self.search_locales.is_empty() {
            return Err(Error::Config(
                "search_locales must contain at least one locale".to_string(),
            ));
        }
        if self.choice_ttl_secs == 0 {
            return Err(Error::Config("choice_ttl_secs must be > 0".to_string()));
        }
        if self.year_min > self.year_max {
            return Err(Error::Config(format!(
                "year_min ({}) must not exceed year_max ({})",
                self.year_min, self.year_max
            )));
        }
        if !(0.0..=1.0).contains(&self.similar_title_threshold) {
            return Err(Error::Config(
                "similar_title_threshold must be in [0.0, 1.0]".to_string(),
            ));
        }
        if self.tmdb.max_attempts == 0 {
            return Err(Error::Config("tmdb.max_attempts must be >= 1".to_string()));
        }
        if self.tmdb.search_result_limit == 0 {
            return Err(Error::Config(
                "tmdb.search_result_limit must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration: defaults, then `path` (if any), then environment overrides
///
/// A missing file is not an error; the service starts on defaults and logs a
/// warning. A file that exists but does not parse is an error.
pub fn load_config(path: Option<&Path>) -> Result<CatalogConfig> {
    let mut config = match path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(path)?;
            let parsed: CatalogConfig =
                toml::from_str(&content).map_err(|source| Error::ConfigParse {
                    path: path.to_path_buf(),
                    source,
                })?;
            info!("Loaded config file: {}", path.display());
            parsed
        }
        Some(path) => {
            warn!("Config file not found: {} (using defaults)", path.display());
            CatalogConfig::default()
        }
        None => {
            info!("No config file found, using defaults");
            CatalogConfig::default()
        }
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Resolve the config file location
///
/// **Priority:** explicit path → `CINELIST_CONFIG` → `<config dir>/cinelist/config.toml`
/// (only when it exists) → none.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("cinelist").join("config.toml"))
        .filter(|p| p.exists())
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cinelist").join("cinelist.db"))
        .unwrap_or_else(|| PathBuf::from("./cinelist_data/cinelist.db"))
}

/// Split a comma-separated locale list, dropping empty entries
pub fn parse_locale_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CatalogConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.primary_locale(), "ru");
        assert_eq!(config.choice_ttl(), std::time::Duration::from_secs(120));
        assert!(!config.require_year);
    }

    #[test]
    fn test_parse_locale_list_skips_empty() {
        assert_eq!(parse_locale_list("en, ,de,"), vec!["en", "de"]);
        assert!(parse_locale_list("").is_empty());
    }

    #[test]
    fn test_parse_bool_variants() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_validate_rejects_empty_locales() {
        let config = CatalogConfig {
            search_locales: vec![],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let config = CatalogConfig {
            choice_ttl_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_threshold_out_of_range() {
        let config = CatalogConfig {
            similar_title_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: CatalogConfig = toml::from_str(
            r#"
            search_locales = ["en"]

            [tmdb]
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.search_locales, vec!["en"]);
        assert_eq!(config.choice_ttl_secs, 120);
        assert_eq!(config.tmdb.timeout_secs, 5);
        assert_eq!(config.tmdb.max_attempts, 2);
    }
}
