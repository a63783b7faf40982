//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::RelayProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG";
/// OAuth client identifier handed to the auth collaborator.
pub const CLIENT_ID_ENV: &str = "RELAY_CLIENT_ID";
/// OAuth redirect URI handed to the auth collaborator.
pub const REDIRECT_URI_ENV: &str = "RELAY_REDIRECT_URI";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text, applying env overrides.
pub fn parse_config(content: &str) -> Result<RelayProxyConfig, ConfigError> {
    let mut config: RelayProxyConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load from `path` if given, else from `$RELAY_CONFIG`, else built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<RelayProxyConfig, ConfigError> {
    if let Some(path) = path {
        return load_config(path);
    }
    if let Ok(env_path) = std::env::var(CONFIG_PATH_ENV) {
        return load_config(Path::new(&env_path));
    }

    let mut config = RelayProxyConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn apply_env_overrides<F>(config: &mut RelayProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(client_id) = lookup(CLIENT_ID_ENV).filter(|v| !v.is_empty()) {
        config.auth.client_id = Some(client_id);
    }
    if let Some(redirect_uri) = lookup(REDIRECT_URI_ENV).filter(|v| !v.is_empty()) {
        config.auth.redirect_uri = Some(redirect_uri);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_auth() {
        let mut config = RelayProxyConfig::default();
        apply_env_overrides(&mut config, |key| match key {
            CLIENT_ID_ENV => Some("client-123".to_string()),
            REDIRECT_URI_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.auth.client_id.as_deref(), Some("client-123"));
        assert_eq!(config.auth.redirect_uri, None);
    }

    #[test]
    fn test_validation_error_surfaces() {
        let err = parse_config(
            r#"
            [retries]
            max_attempts = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("retries.max_attempts"));
    }

    #[test]
    fn test_parse_error_surfaces() {
        let err = parse_config("relays = 7").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
