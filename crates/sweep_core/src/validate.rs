use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static DOTTED_QUAD: LazyLock<Regex> = LazyLock::new(|| compile(r"^\d+\.\d+\.\d+\.\d+$"));
static STRICT_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$")
});

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("built-in validator pattern failed to compile: {err}"),
    }
}

/// Which rule set the validator applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidatorPolicy {
    /// Dot present, no leading/trailing dot, not an IPv4 literal, longer than 3.
    #[default]
    Base,
    /// Base rules plus an anchored `label(.label)*.tld` shape check.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Validator {
    policy: ValidatorPolicy,
}

impl Validator {
    pub fn new(policy: ValidatorPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ValidatorPolicy {
        self.policy
    }

    pub fn accepts(&self, host: &str) -> bool {
        let base = host.contains('.')
            && !host.starts_with('.')
            && !host.ends_with('.')
            && !DOTTED_QUAD.is_match(host)
            && host.len() > 3;
        match self.policy {
            ValidatorPolicy::Base => base,
            ValidatorPolicy::Strict => base && STRICT_SHAPE.is_match(host),
        }
    }
}
