use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid date {input:?}: expected MM-YYYY")]
    InvalidDate { input: String },
    #[error("database error: {0}")]
    Db(String),
}
