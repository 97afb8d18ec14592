use super::config::Config;

/// Validation errors for the application configuration
#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Refresh rate must be at least one second
    RefreshRateZero,
    /// Connect timeout must be at least one second
    ConnectTimeoutZero,
    /// A move gesture must be allowed some time
    SuppressTimeoutZero,
    /// Newznab site entries must not be blank
    BlankNewznabSite(usize),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::RefreshRateZero => {
                write!(f, "general.refresh_rate must be at least 1 second")
            }
            ValidationError::ConnectTimeoutZero => {
                write!(f, "connection.connect_timeout must be at least 1 second")
            }
            ValidationError::SuppressTimeoutZero => {
                write!(f, "reorder.suppress_timeout must be at least 1 second")
            }
            ValidationError::BlankNewznabSite(index) => {
                write!(f, "detection.newznab_sites[{}] is blank", index)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every problem
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.general.refresh_rate == 0 {
        errors.push(ValidationError::RefreshRateZero);
    }
    if config.connection.connect_timeout == 0 {
        errors.push(ValidationError::ConnectTimeoutZero);
    }
    if config.reorder.suppress_timeout == 0 {
        errors.push(ValidationError::SuppressTimeoutZero);
    }
    for (index, site) in config.detection.newznab_sites.iter().enumerate() {
        if site.trim().is_empty() {
            errors.push(ValidationError::BlankNewznabSite(index));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = Config::default();
        config.general.refresh_rate = 0;
        config.reorder.suppress_timeout = 0;
        config.detection.newznab_sites.push("  ".to_string());

        let errors = validate_config(&config).unwrap_err();

        assert_eq!(
            errors,
            vec![
                ValidationError::RefreshRateZero,
                ValidationError::SuppressTimeoutZero,
                ValidationError::BlankNewznabSite(2),
            ]
        );
    }
}
