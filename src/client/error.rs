//! Errors raised while talking to the content API

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content API endpoint is not configured (set api.endpoint or PRISMIC_API_ENDPOINT)")]
    MissingEndpoint,

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("endpoint cannot be used as a base URL: {0}")]
    InvalidEndpoint(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("content API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("content API exposes no master ref")]
    NoMasterRef,

    #[error("pagination cursor does not point at the content API: {0}")]
    ForeignCursor(String),
}

pub type Result<T> = std::result::Result<T, ContentError>;
