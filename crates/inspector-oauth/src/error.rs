use inspector_types::InspectorError;

/// Result alias for this crate.
pub type OAuthResult<T> = std::result::Result<T, OAuthError>;

/// Failures raised while driving the authorization state machine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OAuthError {
    #[error("discovery request to {url} failed: {message}")]
    Discovery { url: String, message: String },

    #[error("client registration failed: {0}")]
    Registration(String),

    #[error("token request failed: {0}")]
    Token(String),

    #[error("state parameter mismatch on authorization callback")]
    StateMismatch,

    #[error("no authorization server metadata available")]
    MissingMetadata,

    #[error("operation attempted from step {0:?}")]
    WrongStep(&'static str),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<OAuthError> for InspectorError {
    fn from(err: OAuthError) -> Self {
        InspectorError::auth(err.to_string())
    }
}
