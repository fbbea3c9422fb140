use thiserror::Error;

/// Failures raised by the Snowflake Cortex REST clients.
#[derive(Debug, Error)]
pub enum CortexError {
    #[error("request to Snowflake failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Snowflake returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("statement did not complete synchronously (code {code})")]
    StatementPending { code: String },

    #[error("unexpected response shape: {0}")]
    ResponseShape(String),
}

impl CortexError {
    pub fn response_shape<S: Into<String>>(detail: S) -> Self {
        CortexError::ResponseShape(detail.into())
    }
}
