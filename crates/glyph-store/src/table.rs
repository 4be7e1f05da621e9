//! The ordered mapping table type
//!
//! A table is a sequence of `(key, value)` entries in file order. It is
//! deliberately not a map: duplicate keys must survive parsing so the
//! cleaner can report them, and entry order is the order written back to
//! disk (deterministic after canonical sorting).

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

use glyph_fs::MappingKind;

/// Length of a hash key: a 64-bit dHash rendered as binary digits.
pub const HASH_KEY_LEN: usize = 64;

/// Recognized image filename extensions, lowercase.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// One `key -> value` pair of a mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub key: String,
    pub value: String,
}

impl MappingEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An ordered mapping table, possibly containing duplicate keys until cleaned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<MappingEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Append an entry without any uniqueness check; callers guard merges.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push(MappingEntry::new(key, value));
    }

    /// The distinct values of the table, in code-point order.
    pub fn distinct_values(&self) -> BTreeSet<String> {
        self.entries.iter().map(|e| e.value.clone()).collect()
    }

    /// Whether any entry carries this value.
    pub fn contains_value(&self, value: &str) -> bool {
        self.entries.iter().any(|e| e.value == value)
    }

    /// All keys mapped to `value`, in entry order.
    pub fn keys_for_value(&self, value: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.value == value)
            .map(|e| e.key.as_str())
            .collect()
    }

    /// The lexicographically smallest key mapped to `value`.
    ///
    /// This is the representative selection rule of the reconciler: it must
    /// stay deterministic so repeated runs fetch the same image.
    pub fn representative_key(&self, value: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter(|e| e.value == value)
            .map(|e| e.key.as_str())
            .min()
    }

    /// Pretty serialization: 2-space indent, non-ASCII preserved, trailing
    /// newline. This is the committed on-disk form.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Compact serialization with `,`/`:` separators and no whitespace.
    pub fn to_compact_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for MappingTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key, &entry.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MappingTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = MappingTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object of string keys to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                // next_entry yields duplicate keys as separate pairs
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    entries.push(MappingEntry { key, value });
                }
                Ok(MappingTable { entries })
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Check that a key matches the schema of its table kind.
///
/// Filename keys must carry a recognized image extension; hash keys must be
/// exactly [`HASH_KEY_LEN`] binary digits.
///
/// # Errors
///
/// Returns a human-readable reason on mismatch.
pub fn validate_key(kind: MappingKind, key: &str) -> Result<(), String> {
    match kind {
        MappingKind::Filename => {
            let extension = key
                .rsplit_once('.')
                .map(|(stem, ext)| (stem, ext.to_ascii_lowercase()));
            match extension {
                Some((stem, ext)) if !stem.is_empty() && IMAGE_EXTENSIONS.contains(&ext.as_str()) => {
                    Ok(())
                }
                _ => Err("filename lacks a recognized image extension".to_string()),
            }
        }
        MappingKind::Hash => {
            if key.len() != HASH_KEY_LEN {
                Err(format!(
                    "hash must be {} characters, got {}",
                    HASH_KEY_LEN,
                    key.len()
                ))
            } else if !key.bytes().all(|b| b == b'0' || b == b'1') {
                Err("hash must contain only binary digits".to_string())
            } else {
                Ok(())
            }
        }
    }
}

/// Whether a label value falls in the CJK Unified Ideographs block.
pub(crate) fn is_cjk(value: &str) -> bool {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => ('\u{4e00}'..='\u{9fff}').contains(&c),
        _ => false,
    }
}
