//! Token classification.
//!
//! A stateless decision over a token's current text: the first pattern in
//! an ordered table that matches anywhere in the content decides the class,
//! and unmatched content is plain. The table is built once per composer and
//! never changes afterwards.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Semantic class of one composed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenClass {
    #[serde(rename = "url")]
    Url,
    #[serde(rename = "mention")]
    Mention,
    #[serde(rename = "hash")]
    Hashtag,
    #[serde(rename = "none")]
    Plain,
}

impl TokenClass {
    /// Class tag as rendered on a token element.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenClass::Url => "url",
            TokenClass::Mention => "mention",
            TokenClass::Hashtag => "hash",
            TokenClass::Plain => "none",
        }
    }
}

/// Ordered classification rule table.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    rules: Vec<(Regex, TokenClass)>,
}

impl ClassifierRules {
    /// Build a table from `(pattern, class)` pairs. Order is significant:
    /// the first matching pattern wins.
    pub fn new(rules: Vec<(Regex, TokenClass)>) -> Self {
        Self { rules }
    }

    /// The standard table: URL, then mention, then hashtag.
    pub fn standard() -> Self {
        Self::new(vec![
            (chirp_text::url(), TokenClass::Url),
            (chirp_text::mention(), TokenClass::Mention),
            (chirp_text::hashtag(), TokenClass::Hashtag),
        ])
    }

    /// Decide the class of `text`. Never fails; an empty or unmatched
    /// string is [`TokenClass::Plain`].
    pub fn classify(&self, text: &str) -> TokenClass {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.is_match(text))
            .map(|&(_, class)| class)
            .unwrap_or(TokenClass::Plain)
    }
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_the_standard_shapes() {
        let rules = ClassifierRules::standard();
        assert_eq!(rules.classify("check http://example.com now"), TokenClass::Url);
        assert_eq!(rules.classify("@jack says hi"), TokenClass::Mention);
        assert_eq!(rules.classify("#jsconf is fun"), TokenClass::Hashtag);
        assert_eq!(rules.classify("plain text"), TokenClass::Plain);
    }

    #[test]
    fn empty_content_is_plain() {
        let rules = ClassifierRules::standard();
        assert_eq!(rules.classify(""), TokenClass::Plain);
        assert_eq!(rules.classify("   "), TokenClass::Plain);
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = ClassifierRules::standard();
        // Both a mention and a hashtag are present; the table order decides.
        assert_eq!(rules.classify("@jack #rust"), TokenClass::Mention);

        let reversed = ClassifierRules::new(vec![
            (chirp_text::hashtag(), TokenClass::Hashtag),
            (chirp_text::mention(), TokenClass::Mention),
        ]);
        assert_eq!(reversed.classify("@jack #rust"), TokenClass::Hashtag);
    }

    #[test]
    fn class_tags_match_the_rendered_vocabulary() {
        assert_eq!(TokenClass::Url.as_str(), "url");
        assert_eq!(TokenClass::Mention.as_str(), "mention");
        assert_eq!(TokenClass::Hashtag.as_str(), "hash");
        assert_eq!(TokenClass::Plain.as_str(), "none");
    }
}
