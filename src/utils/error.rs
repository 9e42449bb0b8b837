use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

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

    #[error("Invalid preference '{field}' = '{value}': {reason}")]
    InvalidPreference {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid recovery date '{value}', expected YYYY-MM-DD")]
    InvalidRecoveryDate { value: String },

    #[error("Unknown association: {id}")]
    UnknownAssociation { id: String },

    #[error("Preference submission for {date} is closed")]
    SubmissionClosed { date: String },

    #[error("Assignment for {date} is not available before the submission deadline")]
    AllocationNotReady { date: String },

    #[error("No bikes found for recovery date {date}")]
    NoBikes { date: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Schedule,
    Configuration,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AllocError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AllocError::InvalidPreference { .. }
            | AllocError::InvalidRecoveryDate { .. }
            | AllocError::UnknownAssociation { .. } => ErrorCategory::Input,
            AllocError::SubmissionClosed { .. }
            | AllocError::AllocationNotReady { .. }
            | AllocError::NoBikes { .. } => ErrorCategory::Schedule,
            AllocError::ConfigError { .. }
            | AllocError::ConfigValidationError { .. }
            | AllocError::InvalidConfigValueError { .. }
            | AllocError::MissingConfigError { .. } => ErrorCategory::Configuration,
            AllocError::IoError(_)
            | AllocError::SerializationError(_)
            | AllocError::CsvError(_)
            | AllocError::StorageError { .. } => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Schedule => ErrorSeverity::Low,
            ErrorCategory::Input => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    /// True for errors caused by the submitted data rather than by the system.
    pub fn is_invalid_input(&self) -> bool {
        self.category() == ErrorCategory::Input
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AllocError::InvalidPreference { field, .. } => {
                format!("The preference for '{}' is not valid, nothing was recorded", field)
            }
            AllocError::InvalidRecoveryDate { value } => {
                format!("'{}' is not a valid recovery date", value)
            }
            AllocError::UnknownAssociation { id } => {
                format!("Association '{}' is not configured", id)
            }
            AllocError::SubmissionClosed { date } => {
                format!("Preferences for the recovery of {} can no longer be sent", date)
            }
            AllocError::AllocationNotReady { date } => {
                format!("The bikes for {} are assigned after the submission deadline", date)
            }
            AllocError::NoBikes { date } => {
                format!("There are no bike photos for the recovery of {}", date)
            }
            AllocError::ConfigError { .. }
            | AllocError::ConfigValidationError { .. }
            | AllocError::InvalidConfigValueError { .. }
            | AllocError::MissingConfigError { .. } => format!("Configuration problem: {}", self),
            _ => "The server could not complete the requested operation".to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check the submitted values and send them again",
            ErrorCategory::Schedule => "Check the recovery date and its submission deadline",
            ErrorCategory::Configuration => "Fix the configuration file and restart",
            ErrorCategory::Storage => "Check the data directory permissions and free space, then retry",
        }
    }
}

pub type Result<T> = std::result::Result<T, AllocError>;
