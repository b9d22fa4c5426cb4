//! Ingest error types

use thiserror::Error;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestError {
    /// The delivery failed signature verification. Hard reject; the
    /// upstream does not retry 401s.
    #[error("Webhook signature mismatch")]
    SignatureMismatch,

    /// The body is not a decodable structured event.
    #[error("Malformed webhook payload: {0}")]
    InvalidPayload(String),

    /// The queue insert failed; surfaced as 500 so the upstream retries.
    #[error("Storage failure: {0}")]
    Db(#[from] callbridge_db::DbError),
}

/// Result type for ingestion
pub type IngestResult<T> = Result<T, IngestError>;
