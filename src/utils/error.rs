use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParse(#[from] crate::core::date::DateParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Failed to fetch {source_name}: {message}")]
    UpstreamFetchError {
        source_name: String,
        message: String,
    },

    #[error("Failed to persist record: {message}")]
    PersistenceError { message: String },

    #[error("Unknown entity '{name}'")]
    UnknownEntity { name: String },
}

/// 錯誤分類，用於日誌與退出碼判斷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Upstream,
    Persistence,
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

impl OpsError {
    pub fn upstream(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamFetchError {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            OpsError::ConfigError { .. }
            | OpsError::ConfigValidationError { .. }
            | OpsError::InvalidConfigValueError { .. }
            | OpsError::MissingConfigError { .. }
            | OpsError::UnknownEntity { .. } => ErrorCategory::Configuration,
            OpsError::HttpError(_) | OpsError::UpstreamFetchError { .. } => ErrorCategory::Upstream,
            OpsError::PersistenceError { .. } => ErrorCategory::Persistence,
            OpsError::CsvError(_) | OpsError::SerializationError(_) | OpsError::DateParse(_) => {
                ErrorCategory::Data
            }
            OpsError::IoError(_) | OpsError::ZipError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Persistence => ErrorSeverity::Low,
            ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the configuration file and command line arguments",
            ErrorCategory::Upstream => "Check that the record source is reachable and try again",
            ErrorCategory::Persistence => "Re-run the import for the rows that failed",
            ErrorCategory::Data => "Check the input file format and the offending values",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            OpsError::UpstreamFetchError { source_name, .. } => {
                format!("Could not load {} from the record source", source_name)
            }
            OpsError::UnknownEntity { name } => {
                format!("'{}' is not a known entity (use chat-log, stock or warranty)", name)
            }
            OpsError::DateParse(e) => format!("Date filter is not a valid date: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OpsError>;
