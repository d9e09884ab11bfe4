//! Error types for the Halberd library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`HalberdError`] enum. Condition evaluators never fail: they log and
//! report a non-match instead, so these errors surface only from request
//! parsing, template compilation, loaders, and the orchestrator.
//!
//! # Examples
//!
//! ```
//! use halberd::error::{HalberdError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(HalberdError::invalid_argument("Invalid input"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Halberd operations.
#[derive(Error, Debug)]
pub enum HalberdError {
    /// I/O errors (file operations, directory listing, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Query DSL errors (malformed request, invalid shape)
    #[error("Query error: {0}")]
    Query(String),

    /// Template compile or execution errors
    #[error("Template error: {0}")]
    Template(String),

    /// Loader errors that do not invalidate the request
    #[error("Loader error: {0}")]
    Loader(String),

    /// The query carries no composite, so the loader cannot scope its scan
    #[error("query configuration missing 'Composite'")]
    MissingComposite,

    /// Index or engine configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Aggregation request errors
    #[error("Aggregation error: {0}")]
    Aggregation(String),

    /// Operation cancelled
    #[error("Operation cancelled: {0}")]
    OperationCancelled(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with HalberdError.
pub type Result<T> = std::result::Result<T, HalberdError>;

impl HalberdError {
    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        HalberdError::Query(msg.into())
    }

    /// Create a new template error.
    pub fn template<S: Into<String>>(msg: S) -> Self {
        HalberdError::Template(msg.into())
    }

    /// Create a new loader error.
    pub fn loader<S: Into<String>>(msg: S) -> Self {
        HalberdError::Loader(msg.into())
    }

    /// Create a new configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        HalberdError::Configuration(msg.into())
    }

    /// Create a new aggregation error.
    pub fn aggregation<S: Into<String>>(msg: S) -> Self {
        HalberdError::Aggregation(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        HalberdError::InvalidArgument(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        HalberdError::Other(msg.into())
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        HalberdError::OperationCancelled(msg.into())
    }

    /// Whether this error must abort a whole union instead of skipping one query.
    pub fn is_fatal_configuration(&self) -> bool {
        matches!(
            self,
            HalberdError::MissingComposite | HalberdError::Configuration(_)
        )
    }

    /// Whether this error reports a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HalberdError::OperationCancelled(_))
    }

    /// HTTP status code a request surface should report for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            HalberdError::Query(_) | HalberdError::Json(_) | HalberdError::InvalidArgument(_) => {
                400
            }
            HalberdError::OperationCancelled(_) => 499,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = HalberdError::query("Test query error");
        assert_eq!(error.to_string(), "Query error: Test query error");

        let error = HalberdError::template("function \"foo\" not defined");
        assert_eq!(
            error.to_string(),
            "Template error: function \"foo\" not defined"
        );

        let error = HalberdError::MissingComposite;
        assert!(error.to_string().contains("missing 'Composite'"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let halberd_error = HalberdError::from(io_error);

        match halberd_error {
            HalberdError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(HalberdError::query("bad").status_code(), 400);
        assert_eq!(HalberdError::MissingComposite.status_code(), 500);
        assert_eq!(HalberdError::loader("boom").status_code(), 500);
        assert_eq!(HalberdError::cancelled("stop").status_code(), 499);
    }

    #[test]
    fn test_fatal_configuration() {
        assert!(HalberdError::MissingComposite.is_fatal_configuration());
        assert!(HalberdError::configuration("index configuration missing 'fields'")
            .is_fatal_configuration());
        assert!(!HalberdError::loader("not found").is_fatal_configuration());
    }
}
