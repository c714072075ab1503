use thiserror::Error;

/// Failure to retrieve a page. Never retried by this crate.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} timed out")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("network error fetching {url}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// HTTP status code, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Network { source, .. } | FetchError::Timeout { source, .. } => {
                source.status().map(|s| s.as_u16())
            }
            FetchError::InvalidUrl { .. } | FetchError::Client(_) => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::InvalidUrl { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Timeout { url, .. }
            | FetchError::Network { url, .. } => Some(url),
            FetchError::Client(_) => None,
        }
    }
}

/// Input or configuration the extractors cannot work with.
///
/// Malformed markup is not an error: the HTML5 parser always recovers a tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("HTML input is empty")]
    EmptyInput,

    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid heading tag `{0}` (expected h1..h6)")]
    InvalidHeadingTag(String),

    #[error("no element matches root selector `{0}`")]
    RootNotFound(String),
}
