//! Error types shared across the engine, the settings service and the stores.

/// Failure talking to the host over the message channel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChannelError {
    /// The channel is permanently gone (extension reloaded or updated).
    #[error("host context invalidated")]
    ContextInvalidated,

    #[error("message send failed: {reason}")]
    Send { reason: String },

    #[error("host replied with an error: {message}")]
    Remote { message: String },
}

impl ChannelError {
    pub fn send(reason: impl Into<String>) -> Self {
        Self::Send {
            reason: reason.into(),
        }
    }

    /// Whether the error means the channel can never be used again.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ContextInvalidated)
    }
}

/// Failure of a page-side resource the engine asked the host for.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("audio graph unavailable: {reason}")]
    AudioGraph { reason: String },

    #[error("frame capture failed: {reason}")]
    Capture { reason: String },

    #[error("picture-in-picture unavailable: {reason}")]
    PictureInPicture { reason: String },

    #[error("element {0} is no longer in the document")]
    Detached(u64),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("settings store I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("settings document is not valid JSON: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("no settings location available: {reason}")]
    Location { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LoopError {
    #[error("set both loop points (A and B) first")]
    MissingPoints,

    #[error("loop point B must be after point A")]
    InvalidOrder,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unexpected response to `{request}`")]
    UnexpectedResponse { request: &'static str },
}
