//! Whole-word keyword matchers.
//!
//! A word character is any Unicode alphanumeric character or `_`. A keyword
//! matches when it occurs case-insensitively in the text and the characters
//! directly before and after the occurrence are not word characters (or are
//! the ends of the text). Keys that start or end with punctuation follow the
//! same rule, so `c++` matches in `I like c++.` but not in `abc++`.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use crate::{error::LoadError, reply::Reply};

#[derive(Debug, Clone)]
pub struct KeywordPattern {
    key: String,
    matcher: Regex,
    reply: Reply,
}

impl KeywordPattern {
    fn new(key: &str, reply: Reply) -> Result<Self, LoadError> {
        let matcher = RegexBuilder::new(&regex::escape(key))
            .case_insensitive(true)
            .build()
            .map_err(|source| LoadError::Pattern {
                key: key.to_owned(),
                source,
            })?;
        Ok(Self {
            key: key.to_owned(),
            matcher,
            reply,
        })
    }

    /// Normalized keyword this pattern was built from.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn reply(&self) -> &Reply {
        &self.reply
    }

    /// Whether the keyword occurs in `text` as a whole word.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        let mut start = 0;
        while let Some(found) = self.matcher.find_at(text, start) {
            if boundary_before(text, found.start()) && boundary_after(text, found.end()) {
                return true;
            }
            // Overlapping occurrences start no earlier than the next char.
            let step = text[found.start()..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            start = found.start() + step;
            if start > text.len() {
                break;
            }
        }
        false
    }
}

/// Builds matchers for every keyword, longest key first so that a phrase
/// like `world war` is tried before `war`. Equal lengths are ordered by key.
///
/// # Errors
///
/// [`LoadError::Pattern`] if a matcher cannot be built.
pub fn compile_patterns(keywords: &HashMap<String, Reply>) -> Result<Vec<KeywordPattern>, LoadError> {
    let mut entries: Vec<(&String, &Reply)> = keywords.iter().collect();
    entries.sort_by(|(a, _), (b, _)| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });
    entries
        .into_iter()
        .map(|(key, reply)| KeywordPattern::new(key, reply.clone()))
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn boundary_before(text: &str, at: usize) -> bool {
    text[..at].chars().next_back().is_none_or(|c| !is_word_char(c))
}

fn boundary_after(text: &str, at: usize) -> bool {
    text[at..].chars().next().is_none_or(|c| !is_word_char(c))
}
