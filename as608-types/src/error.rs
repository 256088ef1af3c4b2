pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while interpreting reply payloads
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
