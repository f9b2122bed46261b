use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: &'static str,
    /// Malformed sequences were replaced with U+FFFD.
    pub lossy: bool,
}

/// Decodes a fetched body for scanning: BOM, then Content-Type charset, then
/// detection. Never fails; malformed input is replaced, since a partially
/// garbled script can still contain hostnames.
pub fn decode_text(bytes: &[u8], content_type: Option<&str>) -> DecodedText {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| {
            content_type
                .and_then(charset_param)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or_else(|| detect(bytes));

    let (text, used, lossy) = encoding.decode(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding_label: used.name(),
        lossy,
    }
}

fn detect(bytes: &[u8]) -> &'static Encoding {
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']).to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_param_is_case_insensitive_and_unquoted() {
        assert_eq!(
            charset_param("text/javascript; CharSet=\"windows-1252\"").as_deref(),
            Some("windows-1252")
        );
        assert_eq!(charset_param("text/css"), None);
    }

    #[test]
    fn header_charset_is_used_without_bom() {
        let bytes = b"var host = 'caf\xe9.example.com';";
        let decoded = decode_text(bytes, Some("application/javascript; charset=iso-8859-1"));
        assert!(decoded.text.contains("café.example.com"));
        assert_eq!(decoded.encoding_label, "windows-1252");
        assert!(!decoded.lossy);
    }

    #[test]
    fn bom_wins_over_header() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("api.example.com".as_bytes());
        let decoded = decode_text(&bytes, Some("text/plain; charset=utf-16le"));
        assert_eq!(decoded.text, "api.example.com");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn plain_utf8_is_detected() {
        let decoded = decode_text("ünï.example.com".as_bytes(), None);
        assert_eq!(decoded.text, "ünï.example.com");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }
}
