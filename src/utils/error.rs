use crate::domain::model::GeolocationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Geolocation failed: {0}")]
    Geolocation(#[from] GeolocationError),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Device,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LocatorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LocatorError::ApiError(_) | LocatorError::HttpStatus { .. } => ErrorCategory::Network,
            LocatorError::Geolocation(_) => ErrorCategory::Device,
            LocatorError::ConfigValidationError { .. }
            | LocatorError::InvalidConfigValueError { .. }
            | LocatorError::MissingConfigError { .. } => ErrorCategory::Configuration,
            LocatorError::SerializationError(_) => ErrorCategory::Data,
            LocatorError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路與定位錯誤可重試
            LocatorError::ApiError(_)
            | LocatorError::HttpStatus { .. }
            | LocatorError::Geolocation(_) => ErrorSeverity::Medium,
            LocatorError::SerializationError(_) => ErrorSeverity::High,
            LocatorError::ConfigValidationError { .. }
            | LocatorError::InvalidConfigValueError { .. }
            | LocatorError::MissingConfigError { .. } => ErrorSeverity::High,
            LocatorError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// 給使用者看的訊息（不含內部細節）
    pub fn user_friendly_message(&self) -> String {
        match self {
            LocatorError::ApiError(_) | LocatorError::HttpStatus { .. } => {
                "Could not reach the clinic directory. Showing the last results we had.".to_string()
            }
            LocatorError::Geolocation(e) => e.user_message().to_string(),
            LocatorError::SerializationError(_) => {
                "The clinic directory sent a response we could not read.".to_string()
            }
            LocatorError::ConfigValidationError { field, .. }
            | LocatorError::InvalidConfigValueError { field, .. }
            | LocatorError::MissingConfigError { field } => {
                format!("Configuration problem with '{}'.", field)
            }
            LocatorError::IoError(e) => format!("File system error: {}", e),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check your connection and the api.base_url setting, then search again.",
            ErrorCategory::Device => "Allow location access or enter a location manually.",
            ErrorCategory::Configuration => "Fix the configuration file and restart.",
            ErrorCategory::Data => "Check that the API version matches this client.",
            ErrorCategory::System => "Check file paths and permissions.",
        }
    }
}

pub type Result<T> = std::result::Result<T, LocatorError>;
