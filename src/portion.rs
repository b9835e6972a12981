//! Text portions: the substring between two optional markers.
//!
//! Used by the Parse verb to pull part of one field's text into another.

use serde::{Deserialize, Serialize};

use crate::constraints::string::find_text;

/// Where the portion begins relative to the left marker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeftMode {
    #[default]
    JustAfter,
    IncludingMarker,
}

/// Where the portion ends relative to the right marker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RightMode {
    #[default]
    UpTo,
    Including,
}

/// A portion of text delimited by an optional left and right marker. An
/// absent (or empty) left marker means the start of the text; an absent
/// right marker means its end.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPortion {
    #[serde(default)]
    pub left_marker: Option<String>,
    #[serde(default)]
    pub left_mode: LeftMode,
    #[serde(default)]
    pub right_marker: Option<String>,
    #[serde(default)]
    pub right_mode: RightMode,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub whole_word: bool,
}

impl TextPortion {
    pub fn between(left: Option<&str>, right: Option<&str>) -> Self {
        Self {
            left_marker: left.map(str::to_string),
            right_marker: right.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn including_left(mut self) -> Self {
        self.left_mode = LeftMode::IncludingMarker;
        self
    }

    pub fn including_right(mut self) -> Self {
        self.right_mode = RightMode::Including;
        self
    }

    pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    pub fn whole_word(mut self, whole_word: bool) -> Self {
        self.whole_word = whole_word;
        self
    }

    /// The extracted substring of `text`, if the markers are found.
    pub fn extract_from<'a>(&self, text: &'a str) -> Option<&'a str> {
        extract(text, self).map(|(offset, len)| &text[offset..offset + len])
    }

    /// `text` with the portion cut out, and the remainder trimmed.
    pub fn remove_from(&self, text: &str) -> Option<String> {
        let (offset, len) = extract(text, self)?;
        let mut remainder = String::with_capacity(text.len() - len);
        remainder.push_str(text[..offset].trim_end());
        let tail = text[offset + len..].trim_start();
        if !remainder.is_empty() && !tail.is_empty() {
            remainder.push(' ');
        }
        remainder.push_str(tail);
        Some(remainder.trim().to_string())
    }
}

fn marker(marker: &Option<String>) -> Option<&str> {
    marker.as_deref().filter(|m| !m.is_empty())
}

/// Locate `portion` in `text`, as a byte offset and length.
///
/// The right marker is searched for from the start of the portion, so an
/// included left marker may also hold the right marker. Returns `None` if
/// either present marker is not found.
pub fn extract(text: &str, portion: &TextPortion) -> Option<(usize, usize)> {
    let ci = portion.case_insensitive;
    let ww = portion.whole_word;
    let start = match marker(&portion.left_marker) {
        None => 0,
        Some(left) => {
            let pos = find_text(text, left, 0, ci, ww)?;
            match portion.left_mode {
                LeftMode::JustAfter => pos + left.len(),
                LeftMode::IncludingMarker => pos,
            }
        }
    };
    let end = match marker(&portion.right_marker) {
        None => text.len(),
        Some(right) => {
            let pos = find_text(text, right, start, ci, ww)?;
            match portion.right_mode {
                RightMode::UpTo => pos,
                RightMode::Including => pos + right.len(),
            }
        }
    };
    (end >= start).then(|| (start, end - start))
}
