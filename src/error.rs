//! Error types for the distributor package builder.
//!
//! This module defines the error types used throughout the crate, providing
//! enough context to tell which distro, file, region or AWS call failed.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for distributor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the distributor package builder.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Distro Table Errors
    // ========================================================================
    /// Error parsing a distro table file.
    #[error("Failed to parse distro table '{path}': {message}")]
    DistroTableParse {
        /// Path to the distro table
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// The distro table is structurally invalid.
    #[error("Invalid distro table: {0}")]
    InvalidDistroTable(String),

    // ========================================================================
    // Script Errors
    // ========================================================================
    /// A script template could not be found.
    #[error("Script template not found: {0}")]
    ScriptNotFound(PathBuf),

    // ========================================================================
    // Packaging Errors
    // ========================================================================
    /// Creating a package archive failed.
    #[error("Failed to create archive '{path}': {message}")]
    Archive {
        /// Archive path
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // AWS Errors
    // ========================================================================
    /// An AWS API call failed.
    #[error("{service} {operation} failed: {message}")]
    Aws {
        /// Service name (s3, ssm, account)
        service: &'static str,
        /// Operation name
        operation: &'static str,
        /// Error message
        message: String,
    },

    /// A distributor document reached the `Failed` state.
    #[error("Distributor package: {package} {version} failed during creation in {region}. Reason: {reason}")]
    DocumentFailed {
        /// Package name
        package: String,
        /// Package version
        version: String,
        /// Region
        region: String,
        /// Status information reported by SSM
        reason: String,
    },

    /// Regions did not become active in time.
    #[error("The following regions are still missing the distributor package: {}", .regions.join(", "))]
    RegionsPending {
        /// Regions still missing the package
        regions: Vec<String>,
    },

    // ========================================================================
    // Custom Resource Errors
    // ========================================================================
    /// The custom resource request is invalid.
    #[error("{0}")]
    InvalidRequest(String),

    /// Sending the custom resource response failed.
    #[error("Failed to send custom resource response: {0}")]
    ResponseDelivery(String),

    // ========================================================================
    // Environment Errors
    // ========================================================================
    /// Missing required environment variable.
    #[error("{0} environment variable not set.")]
    MissingEnv(String),

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Zip writer error.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new AWS error.
    pub fn aws(
        service: &'static str,
        operation: &'static str,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Aws {
            service,
            operation,
            message: message.to_string(),
        }
    }

    /// Creates a new archive error.
    pub fn archive(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new distro table parse error.
    pub fn distro_table_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DistroTableParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Aws { .. } => 2,
            Error::DocumentFailed { .. } | Error::RegionsPending { .. } => 3,
            Error::DistroTableParse { .. } | Error::InvalidDistroTable(_) => 4,
            Error::MissingEnv(_) => 5,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
