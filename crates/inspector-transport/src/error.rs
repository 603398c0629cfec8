use inspector_types::InspectorError;

/// Transport-local error classification. Every variant maps to
/// [`InspectorError::transport`] or [`InspectorError::connection_closed`] at
/// the session boundary; callers outside this crate only see the unified type.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport is not open")]
    NotOpen,

    #[error("transport already open")]
    AlreadyOpen,

    #[error("failed to spawn child process: {0}")]
    Spawn(String),

    #[error("child process stdin/stdout was not piped")]
    StreamsNotPiped,

    #[error("http request failed: {0}")]
    Http(String),

    #[error("server returned status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("event stream closed unexpectedly")]
    StreamClosed,

    #[error("exceeded {0} reconnect attempts")]
    ReconnectExhausted(u32),

    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    #[error("io error: {0}")]
    Io(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

impl From<TransportError> for InspectorError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotOpen | TransportError::AlreadyOpen => {
                InspectorError::invalid_argument(err.to_string())
            }
            _ => InspectorError::transport(err.to_string()),
        }
    }
}
