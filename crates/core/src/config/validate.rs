use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - LMS timeout and page size are not 0
/// - Brain settings (see `BrainConfig::validate`)
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.lms.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "lms.timeout_secs cannot be 0".to_string(),
        ));
    }
    if config.lms.per_page == 0 {
        return Err(ConfigError::ValidationError(
            "lms.per_page cannot be 0".to_string(),
        ));
    }

    config
        .brain
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("brain: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::net::IpAddr;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse::<IpAddr>().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_lms_timeout_fails() {
        let mut config = Config::default();
        config.lms.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_brain_errors_are_prefixed() {
        let mut config = Config::default();
        config.brain.call_timeout_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("brain:"));
    }
}
