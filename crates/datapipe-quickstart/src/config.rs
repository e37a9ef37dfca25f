//! CLI configuration loaded from environment variables.

use serde::Deserialize;

/// Environment variables are prefixed with `DATAPIPE_`:
/// - `DATAPIPE_LOG_JSON`: emit logs as JSON lines (default: false)
/// - `DATAPIPE_LOG_FILTER`: filter used when `RUST_LOG` is unset
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info,datapipe_core=debug,datapipe_quickstart=debug".to_string()
}

impl CliConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("DATAPIPE_").from_env::<CliConfig>()
    }

    #[cfg(test)]
    fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed("DATAPIPE_").from_iter(vars)
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_json: false,
            log_filter: default_log_filter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(!config.log_json);
        assert_eq!(config.log_filter, "info,datapipe_core=debug,datapipe_quickstart=debug");
    }

    #[test]
    fn test_config_from_vars() {
        let config = CliConfig::from_vars([
            ("DATAPIPE_LOG_JSON".to_string(), "true".to_string()),
            ("DATAPIPE_LOG_FILTER".to_string(), "warn".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ])
        .unwrap();
        assert!(config.log_json);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_config_defaults_when_unset() {
        let config = CliConfig::from_vars(Vec::<(String, String)>::new()).unwrap();
        assert!(!config.log_json);
    }
}
