//! Error taxonomy for a digest run.
//!
//! Every variant except [`DigestError::AuditWrite`] is fatal: the pipeline
//! stops at the first one and nothing is published.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DigestError>;

#[derive(Error, Debug)]
pub enum DigestError {
    /// A feed page could not be fetched or decoded.
    #[error("upstream feed error: {0}")]
    Upstream(String),

    /// Settings or template missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The publish call failed.
    #[error("publish failed: {0}")]
    Publish(String),

    /// The audit record could not be written. Logged, never propagated out of a run.
    #[error("audit write failed: {0}")]
    AuditWrite(String),
}

impl From<serde_yaml::Error> for DigestError {
    fn from(e: serde_yaml::Error) -> Self {
        DigestError::Config(e.to_string())
    }
}

impl From<url::ParseError> for DigestError {
    fn from(e: url::ParseError) -> Self {
        DigestError::Config(format!("invalid url: {e}"))
    }
}
