use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;

// CONFIGURATION
// Every field has a default, so a config file only needs the keys it overrides.

pub const DEFAULT_ENDPOINT_URL: &str = "https://api.coingecko.com/api/v3/coins/markets?vs_currency=usd&order=market_cap_desc&per_page=50&page=1&sparkline=false";
pub const DEFAULT_OUTPUT_PATH: &str = "crypto_live_data.xlsx";
pub const DEFAULT_SHEET_NAME: &str = "Sheet";

// Spreadsheet applications refuse tab names longer than this.
const MAX_SHEET_NAME_LEN: usize = 31;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint_url: String,         // market data endpoint, query string included
    pub output_path: PathBuf,         // e.g., "crypto_live_data.xlsx"
    pub poll_interval_seconds: u64,   // wait between cycles, e.g., 300
    pub request_timeout_seconds: u64, // upper bound on one HTTP call
    pub sheet_name: String,           // the tab that is replaced every cycle
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            poll_interval_seconds: 300,
            request_timeout_seconds: 30,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        }
    }
}

/// Values coming from the command line or the environment. `None` keeps
/// whatever the defaults or the config file already provided.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub endpoint_url: Option<String>,
    pub output_path: Option<PathBuf>,
    pub poll_interval_seconds: Option<u64>,
    pub request_timeout_seconds: Option<u64>,
    pub sheet_name: Option<String>,
}

impl AppConfig {
    /// Reads a JSON config file. Missing keys fall back to the defaults.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        // serde_json scans the bytes anyway, no need for a UTF-8 pass first.
        let content = fs::read(path).await.map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_slice(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, then the optional file, then the overrides. The result is validated.
    pub async fn resolve(
        config_file: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let base = match config_file {
            Some(path) => Self::load(path).await?,
            None => Self::default(),
        };
        let config = base.with_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(url) = overrides.endpoint_url {
            self.endpoint_url = url;
        }
        if let Some(path) = overrides.output_path {
            self.output_path = path;
        }
        if let Some(secs) = overrides.poll_interval_seconds {
            self.poll_interval_seconds = secs;
        }
        if let Some(secs) = overrides.request_timeout_seconds {
            self.request_timeout_seconds = secs;
        }
        if let Some(name) = overrides.sheet_name {
            self.sheet_name = name;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint_url.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint_url must not be empty".into()));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output_path must not be empty".into()));
        }
        if self.poll_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_seconds must be greater than zero".into(),
            ));
        }
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_seconds must be greater than zero".into(),
            ));
        }
        let name_len = self.sheet_name.chars().count();
        if name_len == 0 || name_len > MAX_SHEET_NAME_LEN {
            return Err(ConfigError::Invalid(format!(
                "sheet_name must be 1 to {} characters, got {:?}",
                MAX_SHEET_NAME_LEN, self.sheet_name
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scratch_dir;

    #[test]
    fn defaults_match_reference_constants() {
        let config = AppConfig::default();
        assert_eq!(config.endpoint_url, DEFAULT_ENDPOINT_URL);
        assert!(config.endpoint_url.contains("per_page=50"));
        assert!(config.endpoint_url.contains("order=market_cap_desc"));
        assert_eq!(config.output_path, PathBuf::from("crypto_live_data.xlsx"));
        assert_eq!(config.poll_interval(), Duration::from_secs(300));
        assert_eq!(config.sheet_name, "Sheet");
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = scratch_dir();
        let path = dir.path().join("partial.json");
        tokio::fs::write(&path, br#"{ "poll_interval_seconds": 60 }"#)
            .await
            .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.poll_interval_seconds, 60);
        assert_eq!(config.output_path, PathBuf::from(DEFAULT_OUTPUT_PATH));
    }

    #[tokio::test]
    async fn overrides_win_over_file() {
        let dir = scratch_dir();
        let path = dir.path().join("layered.json");
        tokio::fs::write(
            &path,
            br#"{ "output_path": "from_file.xlsx", "poll_interval_seconds": 60 }"#,
        )
        .await
        .unwrap();

        let overrides = ConfigOverrides {
            output_path: Some(PathBuf::from("from_cli.xlsx")),
            ..Default::default()
        };
        let config = AppConfig::resolve(Some(path.as_path()), overrides).await.unwrap();
        assert_eq!(config.output_path, PathBuf::from("from_cli.xlsx"));
        assert_eq!(config.poll_interval_seconds, 60);
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let dir = scratch_dir();
        let err = AppConfig::load(dir.path().join("does-not-exist.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn malformed_file_is_a_parse_error() {
        let dir = scratch_dir();
        let path = dir.path().join("broken.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let err = AppConfig::load(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = AppConfig::default().with_overrides(ConfigOverrides {
            poll_interval_seconds: Some(0),
            ..Default::default()
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn long_sheet_name_is_rejected() {
        let config = AppConfig {
            sheet_name: "x".repeat(32),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
