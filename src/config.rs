//! Interceptor configuration loading and validation

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Result};

/// Capture toggles for one installed interceptor. Immutable once installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptorConfig {
    #[serde(default = "default_true")]
    pub capture_request_body: bool,
    #[serde(default = "default_true")]
    pub capture_response_body: bool,
    #[serde(default = "default_true")]
    pub capture_headers: bool,
    /// Upper bound, in bytes, for any captured body attribute.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_body_size() -> usize {
    10_000
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            capture_request_body: default_true(),
            capture_response_body: default_true(),
            capture_headers: default_true(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl InterceptorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_body_size == 0 {
            return Err(
                ConfigError::Invalid("max_body_size must be greater than zero".to_string()).into(),
            );
        }

        if !self.capture_request_body && !self.capture_response_body && !self.capture_headers {
            tracing::warn!("All capture toggles are disabled, spans will only carry HTTP metadata");
        }

        Ok(())
    }

    /// Load configuration from a YAML file. Fields missing from the file keep
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()).into());
        }

        tracing::debug!(path = %path.display(), "Loading interceptor config");
        let content = fs::read_to_string(path)?;
        let config: InterceptorConfig = if content.trim().is_empty() {
            InterceptorConfig::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        };
        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = InterceptorConfig::default();
        assert!(config.capture_request_body);
        assert!(config.capture_response_body);
        assert!(config.capture_headers);
        assert_eq!(config.max_body_size, 10_000);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("fetchscope.yaml");

        fs::write(
            &config_path,
            r#"
capture_response_body: false
max_body_size: 2048
"#,
        )
        .unwrap();

        let config = InterceptorConfig::load(&config_path).unwrap();
        assert!(config.capture_request_body);
        assert!(!config.capture_response_body);
        assert!(config.capture_headers);
        assert_eq!(config.max_body_size, 2048);
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("fetchscope.yaml");
        fs::write(&config_path, "\n").unwrap();

        let config = InterceptorConfig::load(&config_path).unwrap();
        assert_eq!(config, InterceptorConfig::default());
    }

    #[test]
    fn test_load_config_not_found() {
        let dir = TempDir::new().unwrap();
        let result = InterceptorConfig::load(&dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(Error::Config(ConfigError::NotFound(_)))));
    }

    #[test]
    fn test_zero_max_body_size_rejected() {
        let config = InterceptorConfig {
            max_body_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("fetchscope.yaml");
        fs::write(&config_path, "max_body_size: [not, a, number]\n").unwrap();

        let result = InterceptorConfig::load(&config_path);
        assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
    }
}
