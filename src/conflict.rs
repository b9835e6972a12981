//! Existing-text conflict resolution.
//!
//! Before a verb writes new text, the dispatcher runs every destination
//! field through a dry-run [`GetSample`]. If anything is already present, a
//! [`ConflictDecider`] picks one [`ExistingTextPolicy`] that is then used for
//! every write of the main pass. [`merge`] combines old and new text under a
//! policy, and [`ApplyValue`] bundles new text with the policy (or with a
//! substring to replace, for the Edit verb).
//!
//! [`ConflictDecider`]: crate::traits::ConflictDecider

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{model::ObjectId, traits::ConflictDecider};

/// Text inserted between old and new text by Append/Prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    None,
    Space,
    #[default]
    Semicolon,
    Comma,
    Colon,
}

impl Delimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Delimiter::None => "",
            Delimiter::Space => " ",
            Delimiter::Semicolon => "; ",
            Delimiter::Comma => ", ",
            Delimiter::Colon => ": ",
        }
    }

    /// The punctuation character of this delimiter, if it has one.
    fn punctuation(&self) -> Option<char> {
        match self {
            Delimiter::Semicolon => Some(';'),
            Delimiter::Comma => Some(','),
            Delimiter::Colon => Some(':'),
            Delimiter::None | Delimiter::Space => None,
        }
    }
}

/// What to do with text already present in a destination field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingTextPolicy {
    /// Abort the whole verb before any write.
    Cancel,
    ReplaceOld,
    LeaveOld,
    Append(Delimiter),
    Prefix(Delimiter),
}

impl std::fmt::Display for ExistingTextPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExistingTextPolicy::Cancel => write!(f, "cancel"),
            ExistingTextPolicy::ReplaceOld => write!(f, "replace"),
            ExistingTextPolicy::LeaveOld => write!(f, "leave"),
            ExistingTextPolicy::Append(delimiter) => write!(f, "append({:?})", delimiter),
            ExistingTextPolicy::Prefix(delimiter) => write!(f, "prefix({:?})", delimiter),
        }
    }
}

/// Join two fragments with a delimiter, trimming the whitespace around
/// both and not doubling punctuation `first` already ends with.
fn join_fragments(first: &str, second: &str, delimiter: Delimiter) -> String {
    let first = first.trim();
    let second = second.trim();
    if first.is_empty() {
        return second.to_string();
    }
    if second.is_empty() {
        return first.to_string();
    }
    match delimiter.punctuation() {
        Some(p) if first.ends_with(p) => format!("{} {}", first, second),
        _ => format!("{}{}{}", first, delimiter.as_str(), second),
    }
}

/// Combine the existing text of a field with new text under `policy`.
///
/// An absent or empty old value always yields the new text.
pub fn merge(old: Option<&str>, new: &str, policy: ExistingTextPolicy) -> String {
    let old = match old {
        Some(old) if !old.is_empty() => old,
        _ => return new.to_string(),
    };
    match policy {
        ExistingTextPolicy::ReplaceOld => new.to_string(),
        ExistingTextPolicy::LeaveOld | ExistingTextPolicy::Cancel => old.to_string(),
        ExistingTextPolicy::Append(delimiter) => join_fragments(old, new, delimiter),
        ExistingTextPolicy::Prefix(delimiter) => join_fragments(new, old, delimiter),
    }
}

/// Where the Edit verb looks for the text it replaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditLocation {
    #[default]
    Anywhere,
    Beginning,
    End,
}

/// Replace occurrences of `find` in `text` with `replacement`.
pub fn replace_text(
    text: &str,
    find: &str,
    replacement: &str,
    location: EditLocation,
    case_insensitive: bool,
) -> String {
    if find.is_empty() {
        return text.to_string();
    }
    let eq = |a: &str, b: &str| {
        if case_insensitive {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    };
    match location {
        EditLocation::Beginning => match text.get(..find.len()) {
            Some(head) if eq(head, find) => format!("{}{}", replacement, &text[find.len()..]),
            _ => text.to_string(),
        },
        EditLocation::End => {
            let split = text.len().saturating_sub(find.len());
            match text.get(split..) {
                Some(tail) if text.len() >= find.len() && eq(tail, find) => {
                    format!("{}{}", &text[..split], replacement)
                }
                _ => text.to_string(),
            }
        }
        EditLocation::Anywhere => {
            let haystack = if case_insensitive {
                text.to_ascii_lowercase()
            } else {
                text.to_string()
            };
            let needle = if case_insensitive {
                find.to_ascii_lowercase()
            } else {
                find.to_string()
            };
            let mut result = String::with_capacity(text.len());
            let mut last = 0;
            for (pos, _) in haystack.match_indices(&needle) {
                result.push_str(&text[last..pos]);
                result.push_str(replacement);
                last = pos + needle.len();
            }
            result.push_str(&text[last..]);
            result
        }
    }
}

/// New text plus how to combine it with what is already there.
///
/// With a non-empty `text_to_replace`, applying splices `new_text` in place
/// of each occurrence (the Edit verb). Otherwise the old and new text are
/// merged under `existing_text_policy`, defaulting to replacement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyValue {
    pub new_text: String,
    #[serde(default)]
    pub text_to_replace: Option<String>,
    #[serde(default)]
    pub existing_text_policy: Option<ExistingTextPolicy>,
    #[serde(default)]
    pub edit_location: EditLocation,
    #[serde(default)]
    pub case_insensitive: bool,
}

impl ApplyValue {
    pub fn new(new_text: &str) -> Self {
        Self {
            new_text: new_text.to_string(),
            ..Default::default()
        }
    }

    /// A value that replaces `find` with `replace`.
    pub fn edit(find: &str, replace: &str) -> Self {
        Self {
            new_text: replace.to_string(),
            text_to_replace: Some(find.to_string()),
            ..Default::default()
        }
    }

    pub fn with_policy(mut self, policy: ExistingTextPolicy) -> Self {
        self.existing_text_policy = Some(policy);
        self
    }

    pub fn at(mut self, location: EditLocation) -> Self {
        self.edit_location = location;
        self
    }

    pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// Whether this value splices into existing text rather than merging.
    pub fn is_replacement(&self) -> bool {
        self.text_to_replace.as_deref().map_or(false, |t| !t.is_empty())
    }

    /// The value a field should hold after applying this to `current`.
    ///
    /// `None` means there is nothing to replace in an empty field; an empty
    /// string means the field should be cleared.
    pub fn apply_to(&self, current: Option<&str>) -> Option<String> {
        match self.text_to_replace.as_deref() {
            Some(find) if !find.is_empty() => current.map(|text| {
                replace_text(
                    text,
                    find,
                    &self.new_text,
                    self.edit_location,
                    self.case_insensitive,
                )
            }),
            _ => Some(merge(
                current,
                &self.new_text,
                self.existing_text_policy
                    .unwrap_or(ExistingTextPolicy::ReplaceOld),
            )),
        }
    }
}

/// The result of a dry-run pass over destination fields.
///
/// `all_same` holds iff every non-empty value seen equals `sample_text`.
/// `visited` makes sure a destination object reachable along several paths
/// is only counted once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetSample {
    pub sample_text: Option<String>,
    pub num_found: usize,
    pub all_same: bool,
    pub visited: HashSet<ObjectId>,
}

impl Default for GetSample {
    fn default() -> Self {
        Self::new()
    }
}

impl GetSample {
    pub fn new() -> Self {
        Self {
            sample_text: None,
            num_found: 0,
            all_same: true,
            visited: HashSet::new(),
        }
    }

    /// Record the value found on one destination object. Returns `false` if
    /// the object was already visited.
    pub fn add(&mut self, id: ObjectId, value: Option<String>) -> bool {
        if !self.visited.insert(id) {
            return false;
        }
        let value = match value {
            Some(value) if !value.is_empty() => value,
            _ => return true,
        };
        self.num_found += 1;
        match &self.sample_text {
            None => self.sample_text = Some(value),
            Some(sample) if *sample != value => self.all_same = false,
            Some(_) => {}
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.num_found == 0
    }
}

/// Always answers with the same policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedPolicy(pub ExistingTextPolicy);

impl ConflictDecider for FixedPolicy {
    fn decide(&mut self, _sample: &GetSample) -> ExistingTextPolicy {
        self.0
    }
}

/// Cancels whenever existing text is found. This is the command line
/// tool's default when no policy was given.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CancelOnConflict;

impl ConflictDecider for CancelOnConflict {
    fn decide(&mut self, sample: &GetSample) -> ExistingTextPolicy {
        tracing::warn!(
            "{} destination field(s) already hold text (e.g. {:?}); no existing-text policy given",
            sample.num_found,
            sample.sample_text.as_deref().unwrap_or_default()
        );
        ExistingTextPolicy::Cancel
    }
}
