use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub codes: CodesConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8061".to_string()
}

/// Pagination settings for list endpoints.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    30
}
fn default_max_page_size() -> u32 {
    500
}

/// Bounds for randomly drawn facility codes.
#[derive(Debug, Deserialize, Clone)]
pub struct CodesConfig {
    #[serde(default = "default_facility_min")]
    pub facility_min: i64,
    #[serde(default = "default_facility_max")]
    pub facility_max: i64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for CodesConfig {
    fn default() -> Self {
        Self {
            facility_min: default_facility_min(),
            facility_max: default_facility_max(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_facility_min() -> i64 {
    10_000
}
fn default_facility_max() -> i64 {
    1_000_000
}
fn default_max_attempts() -> u32 {
    100
}

/// N-gram bounds published in the search index settings.
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_min_gram")]
    pub min_gram: u32,
    #[serde(default = "default_max_gram")]
    pub max_gram: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_gram: default_min_gram(),
            max_gram: default_max_gram(),
        }
    }
}

fn default_min_gram() -> u32 {
    4
}
fn default_max_gram() -> u32 {
    15
}

impl Config {
    /// Default settings around a database file, for tests and embedding.
    pub fn for_database(path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig { path: path.into() },
            server: ServerConfig::default(),
            api: ApiConfig::default(),
            codes: CodesConfig::default(),
            search: SearchConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.page_size == 0 {
            anyhow::bail!("api.page_size must be > 0");
        }
        if self.api.max_page_size < self.api.page_size {
            anyhow::bail!("api.max_page_size must be >= api.page_size");
        }

        if self.codes.facility_min < 0 || self.codes.facility_min > self.codes.facility_max {
            anyhow::bail!("codes.facility_min must be in [0, codes.facility_max]");
        }
        if self.codes.max_attempts == 0 {
            anyhow::bail!("codes.max_attempts must be > 0");
        }

        if self.search.min_gram == 0 {
            anyhow::bail!("search.min_gram must be > 0");
        }
        if self.search.min_gram > self.search.max_gram {
            anyhow::bail!("search.min_gram must be <= search.max_gram");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = toml::from_str("[db]\npath = \"./data/registry.sqlite\"\n").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8061");
        assert_eq!(config.api.page_size, 30);
        assert_eq!(config.codes.facility_min, 10_000);
        assert_eq!(config.codes.facility_max, 1_000_000);
        assert_eq!(config.search.min_gram, 4);
        assert_eq!(config.search.max_gram, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_ngram_bounds() {
        let config: Config = toml::from_str(
            "[db]\npath = \"x.sqlite\"\n[search]\nmin_gram = 9\nmax_gram = 3\n",
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_gram"));
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let config: Config =
            toml::from_str("[db]\npath = \"x.sqlite\"\n[api]\npage_size = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_code_range() {
        let mut config = Config::for_database("x.sqlite");
        config.codes.facility_min = 500;
        config.codes.facility_max = 10;
        assert!(config.validate().is_err());
    }
}
