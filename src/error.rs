//! Unified error handling for the routebook library.
//!
//! Every fallible operation returns [`RouteError`]. Per-item failures
//! (fetch, parse, reconcile) are recovered by the importer and recorded in
//! its outcomes; only a failed outer transaction ([`RouteError::Batch`] or
//! [`RouteError::BatchCommit`]) aborts a whole batch.

use thiserror::Error;

/// Unified error type for routebook operations.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Network or authentication failure reaching the tour source
    #[error("{}", fetch_message(.message, .status_code))]
    Fetch {
        message: String,
        status_code: Option<u16>,
    },

    /// Malformed track file
    #[error("Failed to parse {element}: {message}")]
    Parse { element: String, message: String },

    /// Tour record is missing required fields or cannot be mapped
    #[error("Cannot reconcile tour '{record_id}': {message}")]
    Reconcile { record_id: String, message: String },

    /// Degenerate geometry while segmenting
    #[error("Geometry error: {message}")]
    Geometry { message: String },

    /// The outer batch transaction could not be opened, or an item could not
    /// be rolled back inside it
    #[error("Batch transaction failed: {0}")]
    Batch(#[source] rusqlite::Error),

    /// The outer batch transaction failed to commit
    #[error("Batch commit failed: {0}")]
    BatchCommit(#[source] rusqlite::Error),

    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn fetch_message(message: &str, status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!("Fetch error ({}): {}", code, message),
        None => format!("Fetch error: {}", message),
    }
}

impl RouteError {
    pub fn fetch(message: impl Into<String>) -> Self {
        RouteError::Fetch {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn parse(element: impl Into<String>, message: impl Into<String>) -> Self {
        RouteError::Parse {
            element: element.into(),
            message: message.into(),
        }
    }

    pub fn reconcile(record_id: impl Into<String>, message: impl Into<String>) -> Self {
        RouteError::Reconcile {
            record_id: record_id.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        RouteError::Config {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        RouteError::Serialization {
            message: message.into(),
        }
    }

    /// Whether this error aborts a whole batch rather than a single item.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            RouteError::Batch(_) | RouteError::BatchCommit(_) | RouteError::Config { .. }
        )
    }
}

impl From<serde_json::Error> for RouteError {
    fn from(e: serde_json::Error) -> Self {
        RouteError::serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for RouteError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        RouteError::serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for RouteError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        RouteError::serialization(e.to_string())
    }
}

/// Result type alias for routebook operations.
pub type Result<T> = std::result::Result<T, RouteError>;

/// Extension trait for converting Option to RouteError.
pub trait OptionExt<T> {
    /// Convert a missing required tour field into a reconcile error.
    fn ok_or_missing_field(self, record_id: &str, field: &str) -> Result<T>;

    /// Convert a missing value into a configuration error.
    fn ok_or_config(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_missing_field(self, record_id: &str, field: &str) -> Result<T> {
        self.ok_or_else(|| RouteError::reconcile(record_id, format!("missing field `{}`", field)))
    }

    fn ok_or_config(self, message: &str) -> Result<T> {
        self.ok_or_else(|| RouteError::config(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RouteError::reconcile("42", "missing field `name`");
        assert_eq!(
            err.to_string(),
            "Cannot reconcile tour '42': missing field `name`"
        );

        let err = RouteError::Fetch {
            message: "Unauthorized".to_string(),
            status_code: Some(401),
        };
        assert_eq!(err.to_string(), "Fetch error (401): Unauthorized");

        let err = RouteError::fetch("connection reset");
        assert_eq!(err.to_string(), "Fetch error: connection reset");

        let err = RouteError::parse("trkpt #3", "invalid float literal");
        assert!(err.to_string().contains("trkpt #3"));
    }

    #[test]
    fn test_option_ext() {
        let some: Option<i32> = Some(42);
        assert_eq!(some.ok_or_missing_field("1", "name").unwrap(), 42);

        let none: Option<i32> = None;
        match none.ok_or_missing_field("7", "name") {
            Err(RouteError::Reconcile { record_id, message }) => {
                assert_eq!(record_id, "7");
                assert!(message.contains("name"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        let none: Option<i32> = None;
        assert!(matches!(
            none.ok_or_config("KOMOOT_EMAIL is not set"),
            Err(RouteError::Config { .. })
        ));
    }

    #[test]
    fn test_batch_fatal() {
        let commit = RouteError::BatchCommit(rusqlite::Error::InvalidQuery);
        assert!(commit.is_batch_fatal());
        assert!(RouteError::Batch(rusqlite::Error::InvalidQuery).is_batch_fatal());
        assert!(!RouteError::Persistence(rusqlite::Error::InvalidQuery).is_batch_fatal());
        assert!(!RouteError::reconcile("1", "x").is_batch_fatal());
        assert!(!RouteError::fetch("timeout").is_batch_fatal());
    }
}
