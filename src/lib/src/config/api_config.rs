use crate::constants::{API_KEY_ENV_VAR, DEFAULT_HOST, HOST_ENV_VAR};
use crate::error::RestoreError;
use crate::util;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const API_CONFIG_FILENAME: &str = "api_config.toml";

/// Where the RestoreDB server lives and the key to present to it.
///
/// Resolution order, later wins:
/// 1. built in defaults
/// 2. `~/.config/restoredb/api_config.toml`
/// 3. `RESTOREDB_HOST` / `RESTOREDB_API_KEY` (a `.env` file in the working directory is loaded first)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: DEFAULT_HOST.to_string(),
            api_key: None,
        }
    }
}

impl ApiConfig {
    pub fn new(host: impl AsRef<str>, api_key: Option<String>) -> ApiConfig {
        ApiConfig {
            host: host.as_ref().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_path(path: &Path) -> Result<ApiConfig, RestoreError> {
        let contents = util::fs::read_from_path(path)?;
        let config: ApiConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn default_path() -> Result<PathBuf, RestoreError> {
        Ok(util::fs::restoredb_config_dir()?.join(API_CONFIG_FILENAME))
    }

    pub fn get() -> Result<ApiConfig, RestoreError> {
        if let Err(err) = dotenv::dotenv() {
            log::trace!("no .env file loaded: {}", err);
        }
        let config_file = Self::default_path()?;
        Self::get_from(&config_file)
    }

    /// File values with environment overrides applied. A missing file is not an error.
    pub fn get_from(config_file: &Path) -> Result<ApiConfig, RestoreError> {
        log::debug!("looking for config file in...{:?}", config_file);
        let mut config = if config_file.exists() {
            Self::from_path(config_file)?
        } else {
            log::debug!("no config file at {:?}, using defaults", config_file);
            ApiConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var(HOST_ENV_VAR) {
            if !host.is_empty() {
                log::debug!("host overridden by {HOST_ENV_VAR}");
                self.host = host.trim_end_matches('/').to_string();
            }
        }
        if let Ok(key) = std::env::var(API_KEY_ENV_VAR) {
            if !key.is_empty() {
                log::debug!("api key overridden by {API_KEY_ENV_VAR}");
                self.api_key = Some(key);
            }
        }
    }

    pub fn save_default(&self) -> Result<(), RestoreError> {
        let config_file = Self::default_path()?;
        log::debug!("Saving config to {:?}", config_file);
        self.save(&config_file)
    }

    pub fn save(&self, path: &Path) -> Result<(), RestoreError> {
        let toml = toml::to_string(&self)?;
        util::fs::write_to_path(path, toml)?;
        Ok(())
    }

    pub fn set_host(&mut self, host: impl AsRef<str>) {
        self.host = host.as_ref().trim_end_matches('/').to_string();
    }

    pub fn set_api_key(&mut self, api_key: impl AsRef<str>) {
        let api_key = api_key.as_ref();
        self.api_key = if api_key.is_empty() {
            None
        } else {
            Some(api_key.to_string())
        };
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use crate::config::ApiConfig;
    use crate::constants::{API_KEY_ENV_VAR, DEFAULT_HOST, HOST_ENV_VAR};
    use crate::error::RestoreError;

    #[test]
    #[serial]
    fn test_missing_file_falls_back_to_defaults() -> Result<(), RestoreError> {
        std::env::remove_var(HOST_ENV_VAR);
        std::env::remove_var(API_KEY_ENV_VAR);
        let dir = tempfile::tempdir()?;

        let config = ApiConfig::get_from(&dir.path().join("nope.toml"))?;
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.api_key, None);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_saved_config_is_read_back() -> Result<(), RestoreError> {
        std::env::remove_var(HOST_ENV_VAR);
        std::env::remove_var(API_KEY_ENV_VAR);
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("api_config.toml");

        let mut config = ApiConfig::default();
        config.set_host("https://restore.example.com/");
        config.set_api_key("secret");
        config.save(&path)?;

        let loaded = ApiConfig::get_from(&path)?;
        assert_eq!(loaded.host, "https://restore.example.com");
        assert_eq!(loaded.api_key, Some("secret".to_string()));
        Ok(())
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() -> Result<(), RestoreError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("api_config.toml");
        ApiConfig::new("http://file-host:8080", Some("file-key".to_string())).save(&path)?;

        std::env::set_var(HOST_ENV_VAR, "http://env-host:9000/");
        std::env::set_var(API_KEY_ENV_VAR, "env-key");
        let loaded = ApiConfig::get_from(&path);
        std::env::remove_var(HOST_ENV_VAR);
        std::env::remove_var(API_KEY_ENV_VAR);

        let loaded = loaded?;
        assert_eq!(loaded.host, "http://env-host:9000");
        assert_eq!(loaded.api_key, Some("env-key".to_string()));
        Ok(())
    }

    #[test]
    fn test_empty_api_key_clears_it() {
        let mut config = ApiConfig::new("http://localhost:8080", Some("k".to_string()));
        config.set_api_key("");
        assert_eq!(config.api_key, None);
    }
}
