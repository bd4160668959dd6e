/// Configuration loading from TOML file with environment overrides
use std::path::Path;

use crate::error::{KiteError, Result};
use crate::types::Config;

/// Load configuration. A missing file is not fatal as long as the
/// environment supplies the credentials (container deployments set
/// `KITE_API_KEY` / `KITE_ACCESS_TOKEN` and no file exists).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let mut config = if path.as_ref().exists() {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| KiteError::Config(format!("Failed to read config file: {}", e)))?;
        parse_config(&content)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

pub(crate) fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| KiteError::Config(format!("Failed to parse config: {}", e)))
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(api_key) = std::env::var("KITE_API_KEY") {
        if !api_key.is_empty() {
            config.api_key = api_key;
        }
    }
    if let Ok(access_token) = std::env::var("KITE_ACCESS_TOKEN") {
        if !access_token.is_empty() {
            config.access_token = access_token;
        }
    }
    if let Ok(port) = std::env::var("PORT") {
        if let Ok(port) = port.parse() {
            config.port = port;
        }
    }
}

fn validate_config(config: &Config) -> Result<()> {
    if config.api_key.is_empty() {
        return Err(KiteError::Config(
            "api_key is empty; set it in config.toml or KITE_API_KEY".to_string(),
        ));
    }

    if config.exchange.is_empty() {
        return Err(KiteError::Config("exchange is empty".to_string()));
    }

    if config.refresh_interval_secs == 0 {
        return Err(KiteError::Config(
            "refresh_interval_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
api_key = "key"
api_secret = "secret"
access_token = "token"
exchange = "NFO"
port = 8080
refresh_interval_secs = 10
"#,
        )
        .unwrap();

        assert_eq!(config.api_key, "key");
        assert_eq!(config.port, 8080);
        assert_eq!(config.refresh_interval_secs, 10);
    }

    #[test]
    fn test_parse_applies_defaults() {
        let config = parse_config("api_key = \"key\"\n").unwrap();

        assert_eq!(config.exchange, "NFO");
        assert_eq!(config.port, 7860);
        assert_eq!(config.refresh_interval_secs, 5);
        assert!(config.access_token.is_empty());
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let config = parse_config("api_secret = \"secret\"\n").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_refresh_interval_rejected() {
        let config = parse_config("api_key = \"key\"\nrefresh_interval_secs = 0\n").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        assert!(matches!(parse_config("api_key = "), Err(KiteError::Config(_))));
    }
}
