//! Per-run change recording
//!
//! Every run accumulates what changed per domain and exports one summary
//! record, including a ready-made commit title and description for the
//! automation that commits the mapping files.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What one run changed in one domain.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DomainChanges {
    pub domain: String,
    pub hashes_created: usize,
    pub duplicates_removed: usize,
    pub conflicts_resolved: usize,
    pub files_written: usize,
    pub unresolved_characters: Vec<String>,
    pub orphaned_characters: Vec<String>,
}

impl DomainChanges {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }

    /// Whether anything on disk changed for this domain.
    pub fn has_changes(&self) -> bool {
        self.files_written > 0
    }
}

/// Totals across all domains of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeTotals {
    pub hashes_created: usize,
    pub duplicates_removed: usize,
    pub conflicts_resolved: usize,
    pub files_written: usize,
    pub unresolved_characters: usize,
}

/// The exported per-run change record.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeSummary {
    pub timestamp: DateTime<Utc>,
    pub has_changes: bool,
    pub commit_title: String,
    pub commit_description: String,
    pub totals: ChangeTotals,
    pub domains: Vec<DomainChanges>,
}

/// Accumulates [`DomainChanges`] over a run.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    domains: Vec<DomainChanges>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, changes: DomainChanges) {
        self.domains.push(changes);
    }

    /// Close out the run and produce the summary record.
    pub fn into_summary(self, timestamp: DateTime<Utc>) -> ChangeSummary {
        let mut totals = ChangeTotals::default();
        for d in &self.domains {
            totals.hashes_created += d.hashes_created;
            totals.duplicates_removed += d.duplicates_removed;
            totals.conflicts_resolved += d.conflicts_resolved;
            totals.files_written += d.files_written;
            totals.unresolved_characters += d.unresolved_characters.len();
        }

        let changed: Vec<&DomainChanges> =
            self.domains.iter().filter(|d| d.has_changes()).collect();
        let has_changes = !changed.is_empty();

        let commit_title = if has_changes {
            format!(
                "Update glyph mappings for {} domain{}",
                changed.len(),
                if changed.len() == 1 { "" } else { "s" }
            )
        } else {
            "No mapping changes".to_string()
        };

        let mut lines = Vec::new();
        for d in &changed {
            let mut parts = Vec::new();
            if d.hashes_created > 0 {
                parts.push(format!("{} hash entries added", d.hashes_created));
            }
            if d.duplicates_removed > 0 {
                parts.push(format!("{} duplicates removed", d.duplicates_removed));
            }
            if d.conflicts_resolved > 0 {
                parts.push(format!("{} conflicts resolved", d.conflicts_resolved));
            }
            if !d.unresolved_characters.is_empty() {
                parts.push(format!(
                    "{} characters unresolved",
                    d.unresolved_characters.len()
                ));
            }
            if parts.is_empty() {
                parts.push("files normalized".to_string());
            }
            lines.push(format!("- {}: {}", d.domain, parts.join(", ")));
        }
        let commit_description = lines.join("\n");

        ChangeSummary {
            timestamp,
            has_changes,
            commit_title,
            commit_description,
            totals,
            domains: self.domains,
        }
    }
}
