use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("network error: {status} {status_text}")]
    Network { status: u16, status_text: String },

    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body could not be decoded as the expected JSON shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        ApiError::Network {
            status: status.as_u16(),
            status_text: status
                .canonical_reason()
                .unwrap_or("Unknown Status")
                .to_string(),
        }
    }

    /// Whether this error came from an HTTP response rather than a failure
    /// to reach the server at all.
    pub fn is_http(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }
}
