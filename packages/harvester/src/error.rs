//! Error types for the harvester.
//!
//! `HarvesterError` covers everything that can abort a harvest run or reject
//! a record. Per-record anomalies that only degrade a field are not errors;
//! they are collected as [`crate::types::Warnings`] instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::http::TransportError;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// Invalid date format.
    #[error("Invalid date format: '{0}'. Expected YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ")]
    InvalidDate(String),

    /// A required source setting is missing.
    #[error("Missing {field} for source '{source_id}'")]
    MissingSourceConfig {
        source_id: String,
        field: &'static str,
    },

    /// A source setting is present but unusable.
    #[error("Invalid configuration for source '{source_id}': {message}")]
    InvalidSourceConfig { source_id: String, message: String },

    /// The requested source is not configured.
    #[error("Unknown source: '{0}'")]
    UnknownSource(String),

    /// HTTP client construction failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A request kept failing until the retry budget ran out.
    #[error("Request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// A single transport failure, surfaced when it is not retried.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// The pre-transform rejected or failed on a page.
    #[error("Pre-transformation failed: {0}")]
    PreTransform(String),

    /// The repository answered with an OAI-PMH error.
    #[error("OAI-PMH error {code}: {message}")]
    Protocol { code: String, message: String },

    /// A record has no identifier and cannot be indexed.
    #[error("Record is missing its {schema} identifier")]
    MissingIdentifier { schema: &'static str },

    /// The run was cancelled between pages.
    #[error("Harvest of '{0}' cancelled")]
    Cancelled(String),

    /// The record sink refused a record.
    #[error("Record sink failed: {0}")]
    Sink(String),

    /// The durable state store could not be read or written.
    #[error("State store failed: {0}")]
    State(String),

    /// Could not allocate a unique temporary file.
    #[error("Could not create temp file in {dir} after {attempts} attempts")]
    TempFile { dir: PathBuf, attempts: u32 },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML configuration could not be read.
    #[error("Configuration parse failed: {0}")]
    ConfigParse(#[from] serde_yaml_ng::Error),

    /// JSON (de)serialization failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarvesterError {
    /// Whether the error was caused by unparseable page or record content.
    #[must_use]
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::XmlParse(_) | Self::PreTransform(_))
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HarvesterError::MissingSourceConfig {
            source_id: "museum".to_string(),
            field: "url",
        };
        assert_eq!(err.to_string(), "Missing url for source 'museum'");
    }

    #[test]
    fn test_retries_exhausted_display() {
        let err = HarvesterError::RetriesExhausted {
            attempts: 5,
            message: "Server error: 503".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Request failed after 5 attempts: Server error: 503"
        );
    }

    #[test]
    fn test_parse_failure_classification() {
        assert!(HarvesterError::PreTransform("bad".into()).is_parse_failure());
        assert!(!HarvesterError::Cancelled("museum".into()).is_parse_failure());
    }
}
