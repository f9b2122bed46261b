use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use sweep_core::{discover_hosts, normalize_host, scan, Validator, ValidatorPolicy};
use url::Url;

fn set(hosts: &[&str]) -> BTreeSet<String> {
    hosts.iter().map(|h| h.to_string()).collect()
}

#[test]
fn accepted_set_is_union_of_families_after_normalize_and_validate() {
    let text = r#"
        <script src="https://static.example.com/app.js"></script>
        <a href="/about">about</a>
        var api = "api.example.com";
        redirect=https%3A%2F%2Flogin.example.org%2Fcb
        ping 10.0.0.1 and 192.168.1.1
        .hidden.example.com
    "#;
    let validator = Validator::new(ValidatorPolicy::Base);

    let expected: BTreeSet<String> = scan(text)
        .filter_map(|candidate| normalize_host(candidate.text, None))
        .filter(|host| validator.accepts(host))
        .collect();
    let discovered = discover_hosts(text, None, &validator);

    assert_eq!(discovered, expected);
    assert!(discovered.contains("static.example.com"));
    assert!(discovered.contains("api.example.com"));
    assert!(discovered.contains("login.example.org"));
    assert!(discovered.contains("hidden.example.com"));
    assert!(!discovered.iter().any(|h| h.starts_with("10.") || h.starts_with("192.")));
}

#[test]
fn output_is_independent_of_duplicate_matches() {
    let validator = Validator::default();
    let once = discover_hosts("\"cdn.example.net\"", None, &validator);
    let many = discover_hosts(
        "\"cdn.example.net\" https://cdn.example.net cdn.example.net %2F%2Fcdn.example.net",
        None,
        &validator,
    );
    assert_eq!(once, set(&["cdn.example.net"]));
    assert_eq!(many, once);
}

#[test]
fn malformed_candidates_do_not_stop_the_scan() {
    let validator = Validator::default();
    let origin = Url::parse("https://example.com/").unwrap();
    let discovered = discover_hosts(
        "https://bad_host!.com then ok.example.com",
        Some(&origin),
        &validator,
    );
    assert!(discovered.contains("ok.example.com"));
}

#[test]
fn uppercase_hosts_are_lowered_by_url_parsing() {
    let validator = Validator::default();
    let discovered = discover_hosts("see API.Example.COM", None, &validator);
    assert_eq!(discovered, set(&["api.example.com"]));
}

#[test]
fn text_without_hosts_yields_nothing() {
    let validator = Validator::default();
    assert!(discover_hosts("", None, &validator).is_empty());
    assert!(discover_hosts("plain words, version 1.2.3", None, &validator).is_empty());
}
