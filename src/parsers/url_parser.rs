use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

// Scheme-prefixed URIs, `www`-prefixed hosts and bare `host.tld/` forms.
// Balanced parentheses (two levels) stay inside the match; trailing
// punctuation and unbalanced closers do not. Word boundaries and classes are
// ASCII so a link glued to non-ASCII text still starts at its scheme.
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?-u:\b)((?:[a-z][a-z0-9_-]+:(?:/{1,3}|[a-z0-9%])|www[0-9]{0,3}[.]|[a-z0-9.\-]+[.][a-z]{2,4}/)(?:[^\s()<>]+|\(([^\s()<>]+|(\([^\s()<>]+\)))*\))+(?:\(([^\s()<>]+|(\([^\s()<>]+\)))*\)|[^\s`!()\[\]{};:'".,<>?«»“”‘’]))"#,
    )
    .expect("url pattern is valid")
});

/// Every URL-looking substring of `text`, left to right. Repeats are kept.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Structural check applied to extracted candidates: only absolute URLs
/// with a non-empty host survive.
pub fn parse_candidate(candidate: &str) -> Option<Url> {
    let url = Url::parse(candidate).ok()?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}
