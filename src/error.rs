use thiserror::Error;

use crate::validation::forms::FieldError;

/// Errors returned by client operations that touch the network, the
/// credential store, or the environment. Pure validators never produce one.
#[derive(Debug, Error)]
pub enum SolarDetectError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("session expired or invalid, please log in again")]
    Unauthorized,

    #[error("request quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("unexpected response format: {0}")]
    UnexpectedContent(String),

    #[error("prediction response carried no image URL")]
    MissingImageUrl,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("credential store error: {0}")]
    Credentials(String),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("failed to decode: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, SolarDetectError>;
