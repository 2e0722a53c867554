//! Domain error taxonomy.

use thiserror::Error;

/// Errors surfaced by the party core.
///
/// Every variant except [`DomainError::Unavailable`] is deterministic for the
/// same inputs and must not be retried automatically.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    /// True only for transient failures that a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Unavailable(_))
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        DomainError::NotFound(what.into())
    }

    pub fn forbidden(why: impl Into<String>) -> Self {
        DomainError::Forbidden(why.into())
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound("Resource not found".into()),
            sqlx::Error::PoolTimedOut => {
                DomainError::Unavailable("Timed out acquiring a database connection".into())
            }
            sqlx::Error::PoolClosed => DomainError::Unavailable("Database pool is closed".into()),
            sqlx::Error::Io(e) => DomainError::Unavailable(format!("Database I/O error: {}", e)),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // query_canceled (statement_timeout), serialization_failure, deadlock_detected
                Some("57014") | Some("40001") | Some("40P01") => {
                    DomainError::Unavailable(format!("Transient database error: {}", db_err))
                }
                Some("23505") => DomainError::InvalidState("Resource already exists".into()),
                Some("23503") => DomainError::NotFound("Referenced resource not found".into()),
                _ => DomainError::Storage(format!("Database error: {}", db_err)),
            },
            other => DomainError::Storage(format!("Database error: {}", other)),
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();

        DomainError::Validation(messages.join(", "))
    }
}
