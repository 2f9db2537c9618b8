use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

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

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Input file {} has no data rows", .path.display())]
    InputFileEmpty { path: PathBuf },

    #[error("Input file {} is malformed: {reason}", .path.display())]
    InputFileMalformed { path: PathBuf, reason: String },

    #[error("Acquisition timed out: {cause}{}", snapshot_note(.diagnostic))]
    AcquisitionTimeout {
        cause: String,
        diagnostic: Option<PathBuf>,
    },

    #[error("Authorization failed: {cause}")]
    AuthorizationFailed { cause: String },

    #[error("Analytics tool failure: {cause}{}", snapshot_note(.diagnostic))]
    ApiFailure {
        cause: String,
        diagnostic: Option<PathBuf>,
    },
}

fn snapshot_note(diagnostic: &Option<PathBuf>) -> String {
    match diagnostic {
        Some(path) => format!(" (see {})", path.display()),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Acquisition,
    Authorization,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::InputFileEmpty { .. }
            | EtlError::InputFileMalformed { .. }
            | EtlError::CsvError(_) => ErrorCategory::Input,
            EtlError::AcquisitionTimeout { .. }
            | EtlError::ApiFailure { .. }
            | EtlError::HttpError(_) => ErrorCategory::Acquisition,
            EtlError::AuthorizationFailed { .. } => ErrorCategory::Authorization,
            EtlError::IoError(_) | EtlError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // Finished countries are already on disk, a restart with --resume picks up the rest.
            ErrorCategory::Acquisition => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input | ErrorCategory::Authorization => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::InputFileEmpty { .. } => {
                "Add at least one data row below the header of the input table"
            }
            EtlError::InputFileMalformed { .. } | EtlError::CsvError(_) => {
                "Check the delimiter (';' for input tables) and the column layout of the file"
            }
            EtlError::AcquisitionTimeout { .. } => {
                "Inspect the diagnostic screenshot, then rerun with --resume to skip finished countries"
            }
            EtlError::ApiFailure { .. } | EtlError::HttpError(_) => {
                "Make sure the WebDriver server is running and reachable, then rerun with --resume"
            }
            EtlError::AuthorizationFailed { .. } => {
                "Verify the credentials file (login:password) and the login URL"
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => "Review the TOML configuration file and CLI flags",
            EtlError::IoError(_) => "Check file permissions and free disk space",
            EtlError::SerializationError(_) => "Report the malformed payload together with the logs",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Input problem: {}", self),
            ErrorCategory::Acquisition => format!("Data acquisition stopped: {}", self),
            ErrorCategory::Authorization => format!("Login failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
