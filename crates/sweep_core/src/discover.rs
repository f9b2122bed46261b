use std::collections::BTreeSet;

use url::Url;

use crate::host::normalize_host;
use crate::scan::scan;
use crate::validate::Validator;

/// Every host in `text` that some pattern family produces, that normalizes,
/// and that the validator accepts. Candidates failing any step are skipped.
pub fn discover_hosts(text: &str, origin: Option<&Url>, validator: &Validator) -> BTreeSet<String> {
    scan(text)
        .filter_map(|candidate| normalize_host(candidate.text, origin))
        .filter(|host| validator.accepts(host))
        .collect()
}
