//! String constraints.
//!
//! Case folding is ASCII-only, so byte offsets found in a folded string are
//! valid offsets into the original.

use serde::{Deserialize, Serialize};

/// Where in the candidate the pattern must be found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchLocation {
    #[default]
    Contains,
    Equals,
    StartsWith,
    EndsWith,
}

/// A text pattern with its matching options.
///
/// An empty pattern accepts everything, regardless of `negate`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StringConstraint {
    pub pattern: String,
    #[serde(default)]
    pub location: MatchLocation,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub whole_word: bool,
    #[serde(default)]
    pub negate: bool,
}

impl StringConstraint {
    pub fn new(pattern: &str, location: MatchLocation) -> Self {
        Self {
            pattern: pattern.to_string(),
            location,
            ..Default::default()
        }
    }

    pub fn contains(pattern: &str) -> Self {
        Self::new(pattern, MatchLocation::Contains)
    }

    pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    pub fn whole_word(mut self, whole_word: bool) -> Self {
        self.whole_word = whole_word;
        self
    }

    pub fn negated(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    /// This constraint with negation removed.
    pub fn positive(&self) -> Self {
        Self {
            negate: false,
            ..self.clone()
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        matches_string(candidate, self)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

/// Whether the match `text[start..end]` is delimited by non-word characters
/// (or the ends of `text`).
fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.map_or(false, is_word_char) && !after.map_or(false, is_word_char)
}

/// Find the first occurrence of `needle` in `text` at or after byte offset
/// `from`.
///
/// With `whole_word`, occurrences bordered by an alphanumeric character are
/// skipped and the search continues with the next occurrence.
pub fn find_text(
    text: &str,
    needle: &str,
    from: usize,
    case_insensitive: bool,
    whole_word: bool,
) -> Option<usize> {
    if needle.is_empty() || from > text.len() || !text.is_char_boundary(from) {
        return None;
    }
    let (haystack, needle) = if case_insensitive {
        (text.to_ascii_lowercase(), needle.to_ascii_lowercase())
    } else {
        (text.to_string(), needle.to_string())
    };
    let mut start = from;
    while let Some(offset) = haystack[start..].find(&needle) {
        let pos = start + offset;
        if !whole_word || is_whole_word(text, pos, pos + needle.len()) {
            return Some(pos);
        }
        // step past the first character of this occurrence
        start = pos + haystack[pos..].chars().next().map_or(1, char::len_utf8);
        if start > haystack.len() {
            break;
        }
    }
    None
}

fn prefix_matches(candidate: &str, pattern: &str, case_insensitive: bool) -> bool {
    match candidate.get(..pattern.len()) {
        Some(head) if case_insensitive => head.eq_ignore_ascii_case(pattern),
        Some(head) => head == pattern,
        None => false,
    }
}

fn suffix_matches(candidate: &str, pattern: &str, case_insensitive: bool) -> bool {
    if candidate.len() < pattern.len() {
        return false;
    }
    match candidate.get(candidate.len() - pattern.len()..) {
        Some(tail) if case_insensitive => tail.eq_ignore_ascii_case(pattern),
        Some(tail) => tail == pattern,
        None => false,
    }
}

/// Whether `candidate` satisfies `constraint`.
///
/// The positive match is computed first and then flipped if the constraint
/// is negated. An empty pattern always matches.
pub fn matches_string(candidate: &str, constraint: &StringConstraint) -> bool {
    let pattern = constraint.pattern.as_str();
    if pattern.is_empty() {
        return true;
    }
    let ci = constraint.case_insensitive;
    let found = match constraint.location {
        MatchLocation::Contains => {
            find_text(candidate, pattern, 0, ci, constraint.whole_word).is_some()
        }
        MatchLocation::Equals => {
            if ci {
                candidate.eq_ignore_ascii_case(pattern)
            } else {
                candidate == pattern
            }
        }
        MatchLocation::StartsWith => {
            prefix_matches(candidate, pattern, ci)
                && (!constraint.whole_word || is_whole_word(candidate, 0, pattern.len()))
        }
        MatchLocation::EndsWith => {
            suffix_matches(candidate, pattern, ci)
                && (!constraint.whole_word
                    || is_whole_word(candidate, candidate.len() - pattern.len(), candidate.len()))
        }
    };
    found != constraint.negate
}
