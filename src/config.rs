use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateApiConfig {
    pub base_url: String,
    /// Empty means "take it from the EXCHANGERATE_API_KEY environment
    /// variable at fetch time".
    #[serde(default)]
    pub api_key: String,
}

impl ExchangeRateApiConfig {
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var("EXCHANGERATE_API_KEY").unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub coingecko: Option<CoinGeckoConfig>,
    pub exchangerate: Option<ExchangeRateApiConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: Some(CoinGeckoConfig {
                base_url: "https://api.coingecko.com".to_string(),
            }),
            exchangerate: Some(ExchangeRateApiConfig {
                base_url: "https://v6.exchangerate-api.com".to_string(),
                api_key: String::new(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Snapshots older than this are flagged stale; queries still succeed.
    #[serde(default = "default_rates_ttl")]
    pub rates_ttl_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Overrides the platform data directory; mainly for tests.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            rates_ttl_seconds: default_rates_ttl(),
            request_timeout_seconds: default_request_timeout(),
            data_dir: None,
        }
    }
}

fn default_rates_ttl() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    10
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file found, using defaults");
            return Ok(AppConfig::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "valutatrade", "valutatrade")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "valutatrade", "valutatrade")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// The resolved data directory: explicit override or the platform dir.
    pub fn data_path(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::default_data_path(),
        }
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(config.rates_ttl_seconds, 300);
        assert_eq!(config.request_timeout_seconds, 10);
        assert!(config.data_dir.is_none());
        assert!(config.providers.coingecko.is_some());
        assert!(config.providers.exchangerate.is_some());
    }

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
providers:
  coingecko:
    base_url: "http://example.com/gecko"
  exchangerate:
    base_url: "http://example.com/fx"
    api_key: "abc123"
rates_ttl_seconds: 60
data_dir: "/tmp/vt-data"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(
            config.providers.coingecko.unwrap().base_url,
            "http://example.com/gecko"
        );
        let fx = config.providers.exchangerate.unwrap();
        assert_eq!(fx.base_url, "http://example.com/fx");
        assert_eq!(fx.resolved_api_key(), "abc123");
        assert_eq!(config.rates_ttl_seconds, 60);
        assert_eq!(config.data_dir.unwrap(), PathBuf::from("/tmp/vt-data"));
    }

    #[test]
    fn test_provider_sections_can_be_disabled() {
        let yaml_str = r#"
providers:
  coingecko: null
  exchangerate: null
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert!(config.providers.coingecko.is_none());
        assert!(config.providers.exchangerate.is_none());
    }
}
