use std::fmt;

use reqwest::StatusCode;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    Http(reqwest::Error),
    /// Upstream rejected the credentials or returned an unusable session.
    Auth(String),
    Upstream(StatusCode, String),
    NotFound(String),
    Config(String),
    Timeout(std::time::Duration),
    Cancelled,
}

impl Error {
    /// Rejected credentials, malformed or empty session responses.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::Auth(_))
            || matches!(self, Error::Upstream(status, _) if *status == StatusCode::UNAUTHORIZED)
    }

    /// Transport-level failures reaching the upstream, including cancellation.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Timeout(_) | Error::Cancelled)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Json(err) => write!(f, "json error: {err}"),
            Error::Http(err) => write!(f, "http error: {err}"),
            Error::Auth(msg) => write!(f, "authentication failed: {msg}"),
            Error::Upstream(status, body) => {
                write!(f, "upstream returned status {status}: {body}")
            }
            Error::NotFound(msg) => write!(f, "not found: {msg}"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::Timeout(after) => write!(f, "timed out after {after:?}"),
            Error::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}
