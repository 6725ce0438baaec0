#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("event is missing required field {0:?}")]
    MissingField(&'static str),

    #[error("event field {field:?} had an unexpected shape: {detail}")]
    MalformedField { field: &'static str, detail: String },

    #[error("unknown post_type {0:?}")]
    UnknownPostType(String),

    #[error(transparent)]
    Gateway(#[from] kzm_gateway::GatewayError),
}
