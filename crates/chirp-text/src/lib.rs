//! Shared text patterns for status composition.
//!
//! Compiled matchers for the three special token shapes a status can carry:
//! URLs, @mentions and #hashtags. Consumers own the compiled values and
//! decide match order; nothing here is global state.

use regex::Regex;

const URL: &str = r"(?i)\b(?:https?://|www\.)[a-z0-9][a-z0-9\-._~%]*(?::\d{1,5})?(?:[/?#][^\s]*)?";

const MENTION: &str = r"(?:^|[^A-Za-z0-9_])[@＠][A-Za-z0-9_]{1,20}";

const HASHTAG: &str = r"(?i)(?:^|[^&\w])[#＃][0-9a-z_]*[a-z_][0-9a-z_]*";

/// Matcher for http(s) and `www.` URLs, with optional port, path, query and
/// fragment.
pub fn url() -> Regex {
    Regex::new(URL).unwrap()
}

/// Matcher for @mentions: up to 20 word characters, not glued to a preceding
/// word character (so `mail@example.com` is not a mention). The fullwidth
/// `＠` sign counts too.
pub fn mention() -> Regex {
    Regex::new(MENTION).unwrap()
}

/// Matcher for #hashtags. A tag needs at least one non-digit, so `#123`
/// stays plain.
pub fn hashtag() -> Regex {
    Regex::new(HASHTAG).unwrap()
}
