use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no name supplied")]
    EmptyName,
    #[error("polling interval must be non-zero")]
    ZeroInterval,
    #[error("dependency [{0}] already registered")]
    DuplicateDependency(String),
    #[error("no dependency registered as [{0}]")]
    NotFound(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to encode status: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("invalid config: {0}")]
    Config(String),
}

/// Failures talking to a remote health endpoint.
///
/// A non-200 response is an unhealthy observation, never one of these.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("malformed URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("undecodable status body: {0}")]
    Decode(#[from] serde_json::Error),
}
