use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("HTTP method can not be empty")]
    EmptyMethod,
    #[error("path must begin with '/': {0:?}")]
    InvalidPattern(String),
    #[error("catch-all segment must be the last segment: {0:?}")]
    CatchAllNotLast(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),
    #[error("Internal error: {0}")]
    InternalError(String),
    #[error("Panic: {0}")]
    PanicError(String),
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl ServerError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::BadRequest(_) => 400,
            ServerError::PayloadTooLarge(_) => 413,
            ServerError::EmptyMethod
            | ServerError::InvalidPattern(_)
            | ServerError::CatchAllNotLast(_)
            | ServerError::Config(_)
            | ServerError::IoError(_)
            | ServerError::InternalError(_)
            | ServerError::PanicError(_) => 500,
        }
    }

    /// True for the errors raised while registering routes.
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            ServerError::EmptyMethod
                | ServerError::InvalidPattern(_)
                | ServerError::CatchAllNotLast(_)
        )
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
