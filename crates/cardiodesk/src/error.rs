//! Error types for cardiodesk.
//!
//! This module defines all error types used throughout the cardiodesk crate,
//! providing detailed context for debugging and user-facing messages.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// The main error type for cardiodesk operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Patient Errors ===
    /// A patient with the same name and birth date is already registered.
    #[error("patient {first_name} {last_name} born {birth_date} already exists")]
    DuplicatePatient {
        /// Last name of the conflicting record.
        last_name: String,
        /// First name of the conflicting record.
        first_name: String,
        /// Birth date of the conflicting record.
        birth_date: String,
    },

    /// No patient exists with the given id.
    #[error("patient {id} not found")]
    PatientNotFound {
        /// The requested id.
        id: i64,
    },

    /// Submitted patient data failed validation.
    #[error("invalid patient data: {}", format_field_errors(.errors))]
    Validation {
        /// One entry per offending field.
        errors: Vec<FieldError>,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Analysis Errors ===
    /// The analysis program could not be started.
    #[error("failed to start analysis program '{program}': {source}")]
    AnalysisSpawn {
        /// Program that was invoked.
        program: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The analysis program exited unsuccessfully.
    #[error("analysis of patient {patient_id} failed ({status}): {stderr}")]
    AnalysisFailed {
        /// Patient that was analysed.
        patient_id: i64,
        /// Exit status of the program.
        status: ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The analysis finished but produced no result file.
    #[error("analysis result not found at {path}")]
    ResultMissing {
        /// Expected location of the result file.
        path: PathBuf,
    },

    /// The result file exists but could not be interpreted.
    #[error("malformed analysis result in {path}: {message}")]
    ResultMalformed {
        /// Path of the result file.
        path: PathBuf,
        /// Description of what was wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An operation timed out.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
    },

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Form field name.
    pub field: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl FieldError {
    /// Create a new field error.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A specialized Result type for cardiodesk operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a malformed result error.
    #[must_use]
    pub fn result_malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ResultMalformed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a duplicate-patient conflict.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicatePatient { .. })
    }

    /// Check if this error is caused by user input rather than the system.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error was raised by the analysis pipeline.
    #[must_use]
    pub fn is_analysis_error(&self) -> bool {
        matches!(
            self,
            Self::AnalysisSpawn { .. }
                | Self::AnalysisFailed { .. }
                | Self::ResultMissing { .. }
                | Self::ResultMalformed { .. }
        )
    }

    /// Field errors carried by a validation failure, empty otherwise.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation { errors } => errors,
            _ => &[],
        }
    }
}
