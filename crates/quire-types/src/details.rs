//! Details records: key/value metadata describing an object.
//!
//! A details record is separate from block content: it carries object-level
//! metadata (title, layout, icon, archived flag, …) as an open key→value map.
//! Values are `serde_json::Value` because the remote store's value space is
//! schemaless; well-known keys get typed accessors here instead of typed
//! fields, so unknown keys flow through untouched.
//!
//! The `layout` key is load-bearing: it selects the editor chrome for the
//! whole object, so a mutation that changes it invalidates more than one
//! record's row (see the converter's layout-changed rule).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::ObjectId;

/// Well-known details keys.
pub mod detail_keys {
    pub const NAME: &str = "name";
    pub const LAYOUT: &str = "layout";
    pub const ICON_EMOJI: &str = "iconEmoji";
    pub const TYPE: &str = "type";
    pub const DONE: &str = "done";
    pub const IS_ARCHIVED: &str = "isArchived";
    pub const LAST_MODIFIED: &str = "lastModifiedDate";
}

/// Object layout, selecting the editor chrome (closed set).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, strum::FromRepr,
)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum DetailsLayout {
    #[default]
    Basic = 0,
    Profile = 1,
    Todo = 2,
    Set = 3,
    Note = 4,
    Bookmark = 5,
}

impl DetailsLayout {
    /// Decode an integer wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::from_repr(code)
    }

    /// Decode a raw details value. The wire delivers layout as a number in
    /// practice, but a string name is accepted too.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .and_then(|c| i32::try_from(c).ok())
                .and_then(Self::from_code),
            Value::String(s) => match s.as_str() {
                "basic" => Some(DetailsLayout::Basic),
                "profile" => Some(DetailsLayout::Profile),
                "todo" => Some(DetailsLayout::Todo),
                "set" => Some(DetailsLayout::Set),
                "note" => Some(DetailsLayout::Note),
                "bookmark" => Some(DetailsLayout::Bookmark),
                _ => None,
            },
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailsLayout::Basic => "basic",
            DetailsLayout::Profile => "profile",
            DetailsLayout::Todo => "todo",
            DetailsLayout::Set => "set",
            DetailsLayout::Note => "note",
            DetailsLayout::Bookmark => "bookmark",
        }
    }
}

impl std::fmt::Display for DetailsLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key/value metadata for one object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Details {
    /// Object this record describes.
    pub id: ObjectId,
    /// Open key→value map, keys unique.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, Value>,
}

impl Details {
    /// Create an empty record.
    pub fn new(id: impl Into<ObjectId>) -> Self {
        Self { id: id.into(), values: BTreeMap::new() }
    }

    /// Builder-style: set one value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Look up a raw value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The object name, or empty if unset / not a string.
    pub fn name(&self) -> &str {
        self.get(detail_keys::NAME).and_then(Value::as_str).unwrap_or("")
    }

    /// The derived layout. Unset or undecodable layout values fall back to
    /// [`DetailsLayout::Basic`].
    pub fn layout(&self) -> DetailsLayout {
        self.get(detail_keys::LAYOUT)
            .and_then(DetailsLayout::from_value)
            .unwrap_or_default()
    }

    /// Whether the object is archived.
    pub fn is_archived(&self) -> bool {
        self.get(detail_keys::IS_ARCHIVED)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Merge entries in, new values winning on key conflicts (amend).
    pub fn merge(&mut self, entries: impl IntoIterator<Item = (String, Value)>) {
        for (k, v) in entries {
            self.values.insert(k, v);
        }
    }

    /// Delete the named keys (unset). Unknown keys are ignored.
    pub fn unset<S: AsRef<str>>(&mut self, keys: impl IntoIterator<Item = S>) {
        for k in keys {
            self.values.remove(k.as_ref());
        }
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_defaults_to_basic() {
        let details = Details::new("o1");
        assert_eq!(details.layout(), DetailsLayout::Basic);
    }

    #[test]
    fn test_layout_from_number_value() {
        let details = Details::new("o1").with(detail_keys::LAYOUT, 2);
        assert_eq!(details.layout(), DetailsLayout::Todo);

        // Wire structs deliver numbers as doubles.
        let details = Details::new("o1").with(detail_keys::LAYOUT, 3.0);
        assert_eq!(details.layout(), DetailsLayout::Set);
    }

    #[test]
    fn test_layout_from_string_value() {
        let details = Details::new("o1").with(detail_keys::LAYOUT, "note");
        assert_eq!(details.layout(), DetailsLayout::Note);
    }

    #[test]
    fn test_unknown_layout_falls_back_to_basic() {
        let details = Details::new("o1").with(detail_keys::LAYOUT, 99);
        assert_eq!(details.layout(), DetailsLayout::Basic);

        let details = Details::new("o1").with(detail_keys::LAYOUT, "mosaic");
        assert_eq!(details.layout(), DetailsLayout::Basic);
    }

    #[test]
    fn test_name_accessor() {
        assert_eq!(Details::new("o1").name(), "");
        assert_eq!(Details::new("o1").with(detail_keys::NAME, "Notes").name(), "Notes");
        // Non-string name is treated as unset, not coerced.
        assert_eq!(Details::new("o1").with(detail_keys::NAME, 7).name(), "");
    }

    #[test]
    fn test_merge_new_values_win() {
        let mut details = Details::new("o1").with("a", 1).with("b", "old");
        details.merge([
            ("b".to_string(), Value::from("new")),
            ("c".to_string(), Value::from(true)),
        ]);
        assert_eq!(details.get("a"), Some(&Value::from(1)));
        assert_eq!(details.get("b"), Some(&Value::from("new")));
        assert_eq!(details.get("c"), Some(&Value::from(true)));
    }

    #[test]
    fn test_merge_then_unset_leaves_other_keys() {
        let mut details = Details::new("o1").with("keep", "x");
        details.merge([("k".to_string(), Value::from("v"))]);
        details.unset(["k"]);
        assert_eq!(details.get("k"), None);
        assert_eq!(details.get("keep"), Some(&Value::from("x")));
    }

    #[test]
    fn test_unset_unknown_key_is_noop() {
        let mut details = Details::new("o1").with("a", 1);
        details.unset(["missing"]);
        assert_eq!(details.len(), 1);
    }

    #[test]
    fn test_is_archived() {
        assert!(!Details::new("o1").is_archived());
        assert!(Details::new("o1").with(detail_keys::IS_ARCHIVED, true).is_archived());
    }

    #[test]
    fn test_serde_roundtrip() {
        let details = Details::new("o1")
            .with(detail_keys::NAME, "Inbox")
            .with(detail_keys::LAYOUT, 2);
        let json = serde_json::to_string(&details).unwrap();
        let back: Details = serde_json::from_str(&json).unwrap();
        assert_eq!(back, details);
    }
}
