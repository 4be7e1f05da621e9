//! Duplicate removal and canonical ordering
//!
//! `clean` brings a table into its committed form: entries grouped by
//! character in code-point order, keys sorted within each group, exact
//! duplicate pairs dropped, and conflicting entries resolved by keeping the
//! first entry in that canonical order. Resolving against the sorted order
//! (rather than input order) makes the output identical for every
//! permutation of the input.

use std::collections::BTreeSet;

use glyph_fs::MappingKind;

use crate::table::{MappingEntry, MappingTable};

/// A recoverable entry dropped by the cleaner. Always reported, never lost
/// silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Two different values stored under the same key; the first in
    /// canonical order was kept.
    DuplicateKey {
        key: String,
        kept: String,
        dropped: String,
    },
    /// Two different hashes stored for the same character; the first in
    /// canonical order was kept (hash-uniqueness invariant).
    DuplicateHashForCharacter {
        character: String,
        kept_hash: String,
        dropped_hash: String,
    },
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conflict::DuplicateKey { key, kept, dropped } => write!(
                f,
                "key '{key}' maps to both '{kept}' (kept) and '{dropped}' (dropped)"
            ),
            Conflict::DuplicateHashForCharacter {
                character,
                kept_hash,
                dropped_hash,
            } => write!(
                f,
                "character '{character}' has hashes {kept_hash} (kept) and {dropped_hash} (dropped)"
            ),
        }
    }
}

/// What `clean` changed, for the change record.
#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    /// Exact duplicate (key, value) pairs removed
    pub exact_duplicates: usize,
    /// Conflicting entries dropped (first-in-canonical-order kept)
    pub conflicts: Vec<Conflict>,
    /// Whether the cleaned table differs from the input at all
    pub changed: bool,
}

impl CleanReport {
    pub fn removed(&self) -> usize {
        self.exact_duplicates + self.conflicts.len()
    }
}

/// Clean a table: canonical sort, then duplicate and conflict removal.
///
/// Pure function; the input table is not modified. The output satisfies
/// key uniqueness, hash uniqueness (for [`MappingKind::Hash`]), and the
/// deterministic sort order, and is identical for every permutation of the
/// same input entries.
pub fn clean(table: &MappingTable, kind: MappingKind) -> (MappingTable, CleanReport) {
    let mut sorted: Vec<MappingEntry> = table.entries().to_vec();
    sorted.sort_by(|a, b| a.value.cmp(&b.value).then_with(|| a.key.cmp(&b.key)));

    let mut kept: Vec<MappingEntry> = Vec::with_capacity(sorted.len());
    let mut seen_pairs: BTreeSet<(String, String)> = BTreeSet::new();
    let mut report = CleanReport::default();

    for entry in sorted {
        if !seen_pairs.insert((entry.key.clone(), entry.value.clone())) {
            report.exact_duplicates += 1;
            continue;
        }

        if let Some(existing) = kept.iter().find(|e| e.key == entry.key) {
            report.conflicts.push(Conflict::DuplicateKey {
                key: entry.key.clone(),
                kept: existing.value.clone(),
                dropped: entry.value.clone(),
            });
            continue;
        }

        if kind == MappingKind::Hash {
            if let Some(existing) = kept.iter().find(|e| e.value == entry.value) {
                report.conflicts.push(Conflict::DuplicateHashForCharacter {
                    character: entry.value.clone(),
                    kept_hash: existing.key.clone(),
                    dropped_hash: entry.key.clone(),
                });
                continue;
            }
        }

        kept.push(entry);
    }

    let cleaned = MappingTable::from_entries(kept);
    report.changed = cleaned != *table;

    if report.removed() > 0 {
        tracing::info!(
            kind = kind.label(),
            exact_duplicates = report.exact_duplicates,
            conflicts = report.conflicts.len(),
            "cleaner dropped entries"
        );
    }

    (cleaned, report)
}
