use thiserror::Error;

/// Inbound pingback failures, one per protocol fault code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PingbackError {
    #[error("The source or target URI is invalid.")]
    MalformedInput,

    #[error("The source URI does not exist.")]
    SourceUnreachable,

    #[error("The source URI does not contain a link to the target URI, and so cannot be used as a source.")]
    LinkNotFound,

    #[error("The specified target URI does not exist.")]
    UnknownTarget,

    #[error("The specified target URI cannot be used as a target.")]
    TargetNotPingable,

    #[error("The pingback has already been registered.")]
    AlreadyRegistered,

    #[error("internal error: {0}")]
    Internal(String),
}

impl PingbackError {
    /// Integer code returned to pingback clients.
    pub fn code(&self) -> i32 {
        match self {
            Self::MalformedInput | Self::Internal(_) => 0,
            Self::SourceUnreachable => 16,
            Self::LinkNotFound => 17,
            Self::UnknownTarget => 32,
            Self::TargetNotPingable => 33,
            Self::AlreadyRegistered => 48,
        }
    }
}
