use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connect timeout")]
    ConnectTimeout,

    #[error("request timeout")]
    RequestTimeout,

    #[error("too many redirects")]
    RedirectLoop,

    #[error("http error {status}")]
    Http { status: reqwest::StatusCode },

    #[error("body too large ({0} bytes)")]
    BodyTooLarge(u64),

    #[error("io error: {0}")]
    Io(String),

    #[error("client setup failed: {0}")]
    Client(String),

    #[error("unknown: {0}")]
    Unknown(String),
}

impl FetchError {
    /// Timeouts are reported separately from refused connections in logs, but
    /// both mean the remote resource could not be reached.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout | Self::RequestTimeout)
    }

    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            if err.is_connect() {
                Self::ConnectTimeout
            } else {
                Self::RequestTimeout
            }
        } else if err.is_redirect() {
            Self::RedirectLoop
        } else if let Some(status) = err.status() {
            Self::Http { status }
        } else if err.is_connect() || err.is_request() {
            Self::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Io(err.to_string())
        } else if err.is_builder() {
            Self::Client(err.to_string())
        } else {
            Self::Unknown(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_classified() {
        assert!(FetchError::ConnectTimeout.is_timeout());
        assert!(FetchError::RequestTimeout.is_timeout());
        assert!(!FetchError::BodyTooLarge(10).is_timeout());
        assert!(
            !FetchError::Http {
                status: reqwest::StatusCode::BAD_GATEWAY
            }
            .is_timeout()
        );
    }

    #[test]
    fn display_includes_context() {
        let err = FetchError::Http {
            status: reqwest::StatusCode::NOT_FOUND,
        };
        assert_eq!(err.to_string(), "http error 404 Not Found");
        assert_eq!(
            FetchError::UnsupportedScheme("ftp".into()).to_string(),
            "unsupported scheme: ftp"
        );
    }
}
