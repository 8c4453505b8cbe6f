//! CLI configuration

use config::{Config, ConfigError, Environment, File, Map};
use portal_http::ClientConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Base URL variable used by the web dashboard build
pub const LEGACY_BASE_URL_ENV: &str = "VITE_API_BASE_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Backend connection settings
    pub api: ClientConfig,
}

impl PortalConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// Environment variables use the `PORTAL_` prefix with `__` between
    /// sections, e.g. `PORTAL_API__BASE_URL`.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(config_file, None)
    }

    /// Load with an explicit environment; `None` reads the process environment
    fn load_from(
        config_file: Option<&Path>,
        env: Option<&Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Start with defaults
        builder = builder.add_source(Config::try_from(&Self::default())?);

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(false));
        }

        let legacy_base_url = match env {
            Some(env) => env.get(LEGACY_BASE_URL_ENV).cloned(),
            None => std::env::var(LEGACY_BASE_URL_ENV).ok(),
        };
        if let Some(base_url) = legacy_base_url {
            // Its own layer, so PORTAL_ variables still win
            let legacy = Config::builder()
                .set_override("api.base_url", base_url)?
                .build()?;
            builder = builder.add_source(legacy);
        }

        // Add environment variables with PORTAL_ prefix (can override file settings)
        builder = builder.add_source(
            Environment::with_prefix("PORTAL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env.cloned()),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("portal.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"https://dashboard.example.com\"\ntimeout_secs = 10\n",
        )
        .unwrap();

        let config = PortalConfig::load(Some(&path)).unwrap();
        assert_eq!(config.api.timeout_secs, 10);
        assert!(config.api.user_agent.is_none());
    }

    fn env(vars: &[(&str, &str)]) -> Map<String, String> {
        vars.iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn test_legacy_base_url_overrides_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("portal.toml");
        std::fs::write(&path, "[api]\nbase_url = \"https://file.example.com\"\n").unwrap();

        let vars = env(&[(LEGACY_BASE_URL_ENV, "http://vite.example.com")]);
        let config = PortalConfig::load_from(Some(&path), Some(&vars)).unwrap();
        assert_eq!(config.api.base_url, "http://vite.example.com");
    }

    #[test]
    fn test_portal_environment_beats_legacy_base_url() {
        let vars = env(&[
            (LEGACY_BASE_URL_ENV, "http://vite.example.com"),
            ("PORTAL_API__BASE_URL", "http://portal.example.com"),
            ("PORTAL_API__TIMEOUT_SECS", "5"),
        ]);
        let config = PortalConfig::load_from(None, Some(&vars)).unwrap();
        assert_eq!(config.api.base_url, "http://portal.example.com");
        assert_eq!(config.api.timeout_secs, 5);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config =
            PortalConfig::load_from(Some(&temp.path().join("absent.toml")), Some(&env(&[])))
                .unwrap();
        assert_eq!(config.api.timeout_secs, 30);
    }
}
