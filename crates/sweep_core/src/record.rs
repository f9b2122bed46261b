use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Where a hostname was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    /// Outgoing request URL seen by the host.
    #[serde(rename = "URL")]
    Url,
    /// Body of a fetched sub-resource.
    Content,
    /// URL-bearing attribute in page markup.
    #[serde(rename = "HTML")]
    Html,
    /// Inline script text.
    JavaScript,
    /// Inline stylesheet text.
    #[serde(rename = "CSS")]
    Css,
    /// Target of a fetch-style call made by the page.
    Fetch,
    /// Target of an XHR-style call made by the page.
    #[serde(rename = "AJAX")]
    Ajax,
    /// Markup inserted after the initial load.
    Dynamic,
    /// Manually injected for diagnostics.
    Test,
}

impl Source {
    pub const ALL: [Source; 9] = [
        Source::Url,
        Source::Content,
        Source::Html,
        Source::JavaScript,
        Source::Css,
        Source::Fetch,
        Source::Ajax,
        Source::Dynamic,
        Source::Test,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Url => "URL",
            Source::Content => "Content",
            Source::Html => "HTML",
            Source::JavaScript => "JavaScript",
            Source::Css => "CSS",
            Source::Fetch => "Fetch",
            Source::Ajax => "AJAX",
            Source::Dynamic => "Dynamic",
            Source::Test => "Test",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSource(pub String);

impl fmt::Display for UnknownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source tag {:?}", self.0)
    }
}

impl std::error::Error for UnknownSource {}

impl FromStr for Source {
    type Err = UnknownSource;

    /// Accepts the wire tag in any ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownSource(s.to_string()))
    }
}

/// Delivery state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordState {
    #[default]
    New,
    Pending,
    InFlight,
    Acked,
    Dropped,
}

/// One accepted hostname discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubdomainRecord {
    pub domain: String,
    pub source: Source,
    pub timestamp: Timestamp,
    /// Host of the page the discovery was made on, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub state: RecordState,
}

impl SubdomainRecord {
    pub fn new(domain: impl Into<String>, source: Source, timestamp: Timestamp) -> Self {
        Self {
            domain: domain.into(),
            source,
            timestamp,
            origin: None,
            retry_count: 0,
            state: RecordState::New,
        }
    }

    pub fn with_origin(mut self, origin: Option<String>) -> Self {
        self.origin = origin;
        self
    }

    /// Identity key used for deduplication: the domain alone.
    pub fn key(&self) -> &str {
        &self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_parses_wire_tags_case_insensitively() {
        assert_eq!("URL".parse::<Source>(), Ok(Source::Url));
        assert_eq!("javascript".parse::<Source>(), Ok(Source::JavaScript));
        assert_eq!(" ajax ".parse::<Source>(), Ok(Source::Ajax));
        assert!("Telnet".parse::<Source>().is_err());
    }

    #[test]
    fn record_serializes_with_wire_field_names() {
        let record = SubdomainRecord::new("api.example.com", Source::Css, 42);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["domain"], "api.example.com");
        assert_eq!(json["source"], "CSS");
        assert_eq!(json["retryCount"], 0);
        assert_eq!(json["state"], "NEW");
        assert!(json.get("origin").is_none());
    }

    #[test]
    fn legacy_snapshot_without_delivery_fields_deserializes() {
        let record: SubdomainRecord = serde_json::from_str(
            r#"{"domain":"cdn.example.com","source":"Content","timestamp":1700000000000}"#,
        )
        .unwrap();
        assert_eq!(record.retry_count, 0);
        assert_eq!(record.state, RecordState::New);
        assert_eq!(record.origin, None);
    }
}
