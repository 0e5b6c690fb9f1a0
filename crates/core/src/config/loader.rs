use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError, StoreBackend};

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("TORNELLO_").split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config =
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate cross-field constraints
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.scanner.in_flight_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "scanner.in_flight_timeout_secs must be positive".to_string(),
        ));
    }

    if config.store.backend == StoreBackend::Sqlite && config.store.path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "store.path must be set when using the sqlite backend".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[store]
backend = "sqlite"
path = "/var/lib/tornello/tickets.db"

[scanner]
cooldown_secs = 5
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(
            config.store.path,
            PathBuf::from("/var/lib/tornello/tickets.db")
        );
        assert_eq!(config.scanner.cooldown_secs, 5);
        assert_eq!(config.scanner.in_flight_timeout_secs, 10);
    }

    #[test]
    fn test_load_config_from_str_empty_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_zero_in_flight_timeout_rejected() {
        let toml = r#"
[scanner]
in_flight_timeout_secs = 0
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_sqlite_backend_requires_path() {
        let toml = r#"
[store]
backend = "sqlite"
path = ""
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[store]
backend = "memory"

[scanner]
cooldown_secs = 2
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.scanner.cooldown_secs, 2);
    }
}
