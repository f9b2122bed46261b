use std::fmt;

use sweep_core::{Msg, Source, Timestamp};

/// Something the page collaborator saw, before it is stamped and turned
/// into a [`Msg`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// A URL string reduced straight to its host.
    Url { url: String, source: Source },
    /// A text blob to scan.
    Text { text: String, source: Source },
}

impl Observation {
    pub fn url(url: impl Into<String>, source: Source) -> Self {
        Observation::Url {
            url: url.into(),
            source,
        }
    }

    pub fn text(text: impl Into<String>, source: Source) -> Self {
        Observation::Text {
            text: text.into(),
            source,
        }
    }

    pub fn source(&self) -> Source {
        match self {
            Observation::Url { source, .. } | Observation::Text { source, .. } => *source,
        }
    }

    pub fn into_msg(self, at: Timestamp) -> Msg {
        match self {
            Observation::Url { url, source } => Msg::UrlObserved { url, source, at },
            Observation::Text { text, source } => Msg::TextObserved { text, source, at },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
