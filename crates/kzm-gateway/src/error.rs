//! Errors surfaced by gateway calls.

/// An error talking to the chat gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request to gateway endpoint {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("gateway endpoint {endpoint} rejected the call: {message} ({wording})")]
    Failed { endpoint: String, message: String, wording: String },

    #[error("failed to resolve local file path: {0}")]
    Io(#[from] std::io::Error),
}
