use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShowcaseError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("SQL error: {0}")]
    SqlError(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("{service} returned {status}: {message}")]
    ServiceError {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Authentication error: {message}")]
    AuthError { message: String },

    #[error("Request signing failed: {message}")]
    SigningError { message: String },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },

    #[error("Background task failed: {message}")]
    TaskError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Service,
    Storage,
    Authentication,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ShowcaseError {
    pub fn service(service: &str, status: u16, message: impl Into<String>) -> Self {
        Self::ServiceError {
            service: service.to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::HttpError(_) => ErrorCategory::Network,
            Self::ServiceError { .. } => ErrorCategory::Service,
            Self::SqlError(_) | Self::IoError(_) => ErrorCategory::Storage,
            Self::AuthError { .. } | Self::SigningError { .. } => ErrorCategory::Authentication,
            Self::SerializationError(_) | Self::ProcessingError { .. } | Self::TaskError { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::HttpError(_) => ErrorSeverity::Medium,
            Self::ServiceError { status, .. } if *status >= 500 || *status == 429 => {
                ErrorSeverity::Medium
            }
            Self::ServiceError { .. } | Self::AuthError { .. } => ErrorSeverity::High,
            Self::SqlError(_)
            | Self::IoError(_)
            | Self::SerializationError(_)
            | Self::ProcessingError { .. } => ErrorSeverity::High,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::SigningError { .. }
            | Self::TaskError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ConfigError { message } => format!("Configuration problem: {}", message),
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            Self::MissingConfigError { field } => format!("Setting '{}' is required", field),
            Self::ServiceError {
                service, status, ..
            } => format!("{} rejected the request (HTTP {})", service, status),
            Self::HttpError(_) => "Could not reach a cloud service".to_string(),
            Self::AuthError { .. } => "Login failed".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the TOML config file and referenced environment variables",
            ErrorCategory::Network => "Check network connectivity and service endpoints, then retry",
            ErrorCategory::Service => "Check the service credentials and that the target resource exists",
            ErrorCategory::Storage => "Check that local files and databases exist and are readable",
            ErrorCategory::Authentication => "Check the account keys and identity provider settings",
            ErrorCategory::Internal => "Re-run with --verbose and inspect the logs",
        }
    }
}

pub type Result<T> = std::result::Result<T, ShowcaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_severity_depends_on_status() {
        assert_eq!(
            ShowcaseError::service("Blob", 503, "busy").severity(),
            ErrorSeverity::Medium
        );
        assert_eq!(
            ShowcaseError::service("Blob", 403, "denied").severity(),
            ErrorSeverity::High
        );
        assert_eq!(
            ShowcaseError::service("Cosmos DB", 429, "slow down").severity(),
            ErrorSeverity::Medium
        );
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = ShowcaseError::MissingConfigError {
            field: "storage.account_key".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.user_friendly_message(), "Setting 'storage.account_key' is required");
    }
}
