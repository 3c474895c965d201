use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub pool_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_period")]
    pub default_period: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            default_period: default_period(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    60
}
fn default_period() -> String {
    "today".to_string()
}

impl AppConfig {
    /// Reject configurations that would fail at request time.
    pub fn validate(&self) -> Result<(), String> {
        crate::metrics::period::PeriodToken::from_str(&self.metrics.default_period).map_err(
            |_| {
                format!(
                    "metrics.default_period '{}' is not a recognized period token",
                    self.metrics.default_period
                )
            },
        )?;
        Ok(())
    }

    pub fn load(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        // Load from config file
        let path = config_path.unwrap_or("config.toml");
        builder = builder.add_source(File::with_name(path).required(false));

        // Overlay with environment variables (FUNNELBOARD__SERVER__PORT=3001, etc.)
        builder = builder.add_source(
            Environment::with_prefix("FUNNELBOARD")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_default_period() {
        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5400,
            },
            database: DatabaseConfig {
                path: PathBuf::from("funnelboard.db"),
                pool_size: 4,
            },
            metrics: MetricsConfig {
                cache_ttl_secs: 60,
                default_period: "fortnight".to_string(),
            },
        };
        assert!(config.validate().is_err());
    }
}
