//! Error handling.

use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tracing::{event, Level};

use crate::config::Backend;

/// Wellbore provider error type
///
/// This type encapsulates the various errors that may occur while talking to the backends or
/// persisting extracted data.
///
/// Backend unavailability and unexpected payload shapes are not represented here: the
/// extractor absorbs them into empty tables. What remains are caller misuse, local failures and
/// the fatal batch listing failures.
#[derive(Debug, Error)]
pub enum WellboreError {
    /// Authorization was refused by the identity service
    #[error("could not connect to {backend}: {error}")]
    AuthorizationDenied {
        backend: Backend,
        error: String,
        description: Option<String>,
    },

    /// Error accessing the in-memory provider cache
    #[error("provider cache error {error}")]
    CacheError { error: String },

    /// Error reading or writing CSV data
    #[error("failed to process CSV data")]
    Csv(#[from] csv::Error),

    /// The device code flow could not be started or completed
    #[error("device code flow failed: {message}")]
    DeviceFlow { message: String },

    /// Error reading the dotenv configuration file
    #[error("failed to read configuration file")]
    DotEnv(#[from] dotenvy::Error),

    /// A request returned a status that the caller cannot continue from
    #[error("request to {endpoint} failed with status {status}")]
    FetchFailed { endpoint: String, status: u16 },

    /// HTTP transport error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Error converting a credential into an HTTP header
    #[error("invalid HTTP header value")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// Invalid arguments supplied by the caller (single error)
    #[error("invalid argument")]
    InvalidArgumentSingle(#[from] validator::ValidationError),

    /// Invalid arguments supplied by the caller (multiple errors)
    #[error("invalid argument")]
    InvalidArgument(#[from] validator::ValidationErrors),

    /// Error reading or writing local files
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// Error (de)serialising JSON
    #[error("failed to process JSON data")]
    Json(#[from] serde_json::Error),

    /// A wellbore listing request failed, the batch run cannot continue
    #[error("listing {endpoint} failed with status {status}, a re-start is needed")]
    ListingFailed { endpoint: String, status: u16 },

    /// A required configuration key is absent
    #[error("missing configuration key {key}")]
    MissingConfig { key: String },

    /// Error formatting a timestamp
    #[error("failed to format timestamp")]
    TimeFormat(#[from] time::error::Format),

    /// Error parsing a URL
    #[error("invalid URL")]
    Url(#[from] url::ParseError),
}

/// Printable summary of an error and its causes
///
/// Implements serde (de)serialise.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct ErrorReport {
    /// Main error message
    pub message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<Vec<String>>,
}

impl ErrorReport {
    /// Return a new ErrorReport
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    pub fn new<E>(error: &E) -> Self
    where
        E: std::error::Error,
    {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorReport { message, caused_by }
    }
}

impl From<&WellboreError> for ErrorReport {
    fn from(error: &WellboreError) -> Self {
        ErrorReport::new(error)
    }
}

/// Log an error and each of its causes at ERROR level.
pub fn log_error(error: &WellboreError) {
    event!(Level::ERROR, "{}", error.to_string());
    if let WellboreError::AuthorizationDenied {
        description: Some(description),
        ..
    } = error
    {
        event!(Level::ERROR, "{}", description);
    }
    let mut current = error.source();
    while let Some(source) = current {
        event!(Level::ERROR, "Caused by: {}", source.to_string());
        current = source.source();
    }
}
