use url::Url;

const DEFAULT_SCHEME_PREFIX: &str = "https://";

/// Resolves a candidate to the host component of a URL.
///
/// Candidates with a leading `/` get the serialized origin of `origin`
/// prepended, so `//host/path` stays on the page's host; candidates without
/// `://` get `https://` prepended; anything else is parsed as-is. Returns `None` on any parse failure or when the URL has no host.
pub fn normalize_host(candidate: &str, origin: Option<&Url>) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    let url = if candidate.starts_with('/') {
        let origin = origin?.origin().ascii_serialization();
        Url::parse(&format!("{origin}{candidate}")).ok()?
    } else if !candidate.contains("://") {
        Url::parse(&format!("{DEFAULT_SCHEME_PREFIX}{candidate}")).ok()?
    } else {
        Url::parse(candidate).ok()?
    };

    url.host_str()
        .filter(|host| !host.is_empty())
        .map(ToOwned::to_owned)
}

/// Top two labels of a hostname, used to scope a collection session.
pub fn registrable_domain(host: &str) -> Option<String> {
    let host = host.trim_end_matches('.');
    if host.is_empty() {
        return None;
    }
    let labels: Vec<&str> = host.rsplit('.').take(2).collect();
    Some(labels.into_iter().rev().collect::<Vec<_>>().join("."))
}

/// Registrable domain of a page URL.
pub fn page_domain(page: &Url) -> Option<String> {
    page.host_str().and_then(registrable_domain)
}

const CONTENT_EXTENSIONS: [&str; 6] = [".js", ".html", ".htm", ".css", ".json", ".xml"];

/// Whether the body behind a request URL is worth fetching and scanning.
///
/// Extensions match in any case; `api` and `ajax` only in lower case.
pub fn should_analyze_content(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    CONTENT_EXTENSIONS.iter().any(|ext| lower.contains(ext))
        || url.contains("api")
        || url.contains("ajax")
}
