// src/error.rs

use thiserror::Error;

/// Failures that abort an invocation. Recoverable conditions (missing
/// columns, empty filter results) are reported as [`crate::filter::Warning`]
/// values instead.
#[derive(Debug, Error)]
pub enum BillingError {
    /// The uploaded content cannot be read as tabular data at all.
    #[error("Error processing file: {0}")]
    Ingestion(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid billing month: {0} (expected 1-12)")]
    InvalidDate(u8),

    /// Anything that goes wrong while assembling or serializing the PDF.
    #[error("Failed to render invoice: {0}")]
    Rendering(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl BillingError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BillingError::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<csv::Error> for BillingError {
    fn from(e: csv::Error) -> Self {
        BillingError::Ingestion(e.to_string())
    }
}

impl From<lopdf::Error> for BillingError {
    fn from(e: lopdf::Error) -> Self {
        BillingError::Rendering(e.to_string())
    }
}
