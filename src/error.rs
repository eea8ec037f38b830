use rmcp::ErrorData as McpError;

#[derive(Debug, thiserror::Error)]
pub enum PlexError {
    /// Transport failures (connect, TLS, timeout, body read).
    #[error("request to {path} failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// Non-success HTTP status after retries.
    #[error("Plex returned HTTP {status} for {path}")]
    Status { status: u16, path: String },
    /// Response body was not the JSON we asked for.
    #[error("invalid JSON from {path}: {message}")]
    Decode { path: String, message: String },
    /// Startup configuration problems.
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
}

impl From<PlexError> for McpError {
    fn from(err: PlexError) -> Self {
        match err {
            PlexError::InvalidArgument(msg) => McpError::invalid_params(msg, None),
            PlexError::NotFound(msg) => McpError::resource_not_found(msg, None),
            other => McpError::internal_error(other.to_string(), None),
        }
    }
}
