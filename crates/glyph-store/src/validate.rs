//! Side-effect-free table validation
//!
//! Checks the key-uniqueness and hash-uniqueness invariants plus key/value
//! format without mutating the table. Errors are conditions `clean` would
//! repair or the loader would reject; warnings are informational (a
//! character with several filename entries is normal, for example).

use std::collections::BTreeMap;

use glyph_fs::MappingKind;

use crate::table::{MappingTable, is_cjk, validate_key};

/// Findings of a validation pass.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }
}

/// Validate a table against its kind's schema and invariants.
pub fn validate(table: &MappingTable, kind: MappingKind) -> ValidationReport {
    let mut report = ValidationReport::default();

    let mut key_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in table.entries() {
        *key_counts.entry(entry.key.as_str()).or_default() += 1;
    }
    for (key, count) in &key_counts {
        if *count > 1 {
            report.error(format!("duplicate key '{key}' appears {count} times"));
        }
    }

    for entry in table.entries() {
        if let Err(reason) = validate_key(kind, &entry.key) {
            report.error(format!("key '{}': {reason}", entry.key));
        }

        if entry.value.is_empty() {
            report.error(format!("key '{}' maps to an empty value", entry.key));
        } else if entry.value.chars().count() != 1 {
            report.warn(format!(
                "key '{}' maps to multi-character value '{}'",
                entry.key, entry.value
            ));
        } else if !is_cjk(&entry.value) {
            report.warn(format!(
                "key '{}' maps to non-CJK character '{}'",
                entry.key, entry.value
            ));
        }
    }

    let mut keys_per_value: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for entry in table.entries() {
        keys_per_value
            .entry(entry.value.as_str())
            .or_default()
            .push(entry.key.as_str());
    }
    for (value, keys) in &keys_per_value {
        if keys.len() > 1 {
            match kind {
                // One canonical hash per character is an invariant
                MappingKind::Hash => report.error(format!(
                    "character '{value}' has {} hash entries",
                    keys.len()
                )),
                // Many images per character are expected
                MappingKind::Filename => report.warn(format!(
                    "character '{value}' has {} filename entries",
                    keys.len()
                )),
            }
        }
    }

    tracing::debug!(
        kind = kind.label(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated table"
    );

    report
}
