//! Deterministic failure-pattern hints.
//!
//! A small regex table over well-known failure signatures. A match produces
//! an advisory hint that is folded into the classification prompt; it never
//! bypasses the classifier and never drives control flow on its own.

use std::sync::OnceLock;

use regex::Regex;

/// Hints the healer can use when repairing HTTP-level test errors.
pub const HEALING_HINTS: &[&str] = &[
    "Check the endpoint URL against the API documentation",
    "Verify the HTTP method (GET/POST/PUT/DELETE)",
    "Check request headers and content-type",
    "Verify authentication token or credentials",
    "Check response structure assumptions",
];

fn table() -> &'static Vec<(Regex, &'static str)> {
    static TABLE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        [
            (
                r"ConnectionRefusedError|Connection refused",
                "the application was unreachable; the failure may not reflect either the test or the application logic",
            ),
            (
                r"404.*Not Found|assert 404",
                "a 404 on a documented route usually means the test used the wrong URL",
            ),
            (
                r"500.*Internal Server Error|assert 500",
                "a 500 response usually indicates a server-side failure in the application",
            ),
            (
                r"ImportError|ModuleNotFoundError",
                "an import failure is almost always a defect in the test's own setup",
            ),
            (
                r"TimeoutExpired|timed out",
                "the run exceeded its time budget; consider a timing issue in the test before blaming the application",
            ),
            (
                r"AssertionError",
                "compare the asserted value against the documented behavior before assuming an application bug",
            ),
        ]
        .into_iter()
        .filter_map(|(pattern, hint)| {
            Regex::new(&format!("(?i){pattern}")).ok().map(|re| (re, hint))
        })
        .collect()
    })
}

/// Returns the hint for the first matching failure signature, if any.
pub fn pre_classify(diagnostic: &str) -> Option<&'static str> {
    table()
        .iter()
        .find(|(re, _)| re.is_match(diagnostic))
        .map(|(_, hint)| *hint)
}
