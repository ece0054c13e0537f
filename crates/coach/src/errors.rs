use thiserror::Error;

/// Failures talking to the upstream completion service.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider answered with a non-success status. The body is kept for
    /// server-side logging only.
    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The provider reported a failure inside an already open stream.
    #[error("Upstream stream error ({kind}): {message}")]
    Stream { kind: String, message: String },

    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failures between the chat client and the relay.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Relay returned {0}")]
    Status(u16),

    #[error("Relay request failed: {0}")]
    Request(#[from] reqwest::Error),
}
