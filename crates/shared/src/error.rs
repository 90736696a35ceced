use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlError {
    pub message: String,
}

impl GraphqlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Failure to read the header of a GraphQL document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("empty document")]
    Empty,
    #[error("unexpected end of document")]
    UnexpectedEnd,
    #[error("unexpected character '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("unknown operation type '{0}'")]
    UnknownOperationType(String),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("variable '${0}' was not provided")]
    MissingVariable(String),
}

impl From<OperationError> for GraphqlError {
    fn from(value: OperationError) -> Self {
        Self::new(value.to_string())
    }
}
