use models::validator::FieldErrors;
use thiserror::Error;

/// Failure taxonomy for subscription operations.
///
/// Store failures are classified once, at the repository boundary; callers
/// only match on these variants.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("validation failed: {}", summarize(.0))]
    Validation(FieldErrors),
    #[error("record not found")]
    NotFound,
    #[error("edit conflict")]
    EditConflict,
    #[error("store operation timed out")]
    Timeout,
    /// Detail is for logs only.
    #[error("store error: {0}")]
    Store(String),
}

impl SubscriptionError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            SubscriptionError::Validation(_) => 2001,
            SubscriptionError::NotFound => 2002,
            SubscriptionError::EditConflict => 2003,
            SubscriptionError::Timeout => 2101,
            SubscriptionError::Store(_) => 2200,
        }
    }
}

impl From<FieldErrors> for SubscriptionError {
    fn from(errors: FieldErrors) -> Self {
        SubscriptionError::Validation(errors)
    }
}

impl From<sea_orm::DbErr> for SubscriptionError {
    fn from(e: sea_orm::DbErr) -> Self {
        SubscriptionError::Store(e.to_string())
    }
}

fn summarize(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, msg)| format!("{field} {msg}"))
        .collect::<Vec<_>>()
        .join("; ")
}
