//! key=value token patterns embedded in free-text log messages.

use regex::Regex;
use std::sync::OnceLock;

fn user_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"user=(\w+)").expect("user pattern is valid"))
}

// Octets are not range-checked: src=999.999.999.999 is captured as-is.
fn source_ip_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"src=(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})").expect("source ip pattern is valid")
    })
}

/// First `user=<word>` token in the message
pub fn capture_user(message: &str) -> Option<&str> {
    user_pattern()
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// First `src=<dotted quad>` token in the message
pub fn capture_source_ip(message: &str) -> Option<&str> {
    source_ip_pattern()
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
