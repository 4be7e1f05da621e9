//! The run engine
//!
//! A run processes each selected domain through up to four phases:
//! validate, clean, synchronize, minify. Domains are processed
//! concurrently and in isolation; one domain failing never aborts the
//! others, and the run ends with a change summary either way.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;

use glyph_fs::io;
use glyph_store::{MappingKind, MappingStore, clean, validate};

use crate::changes::{ChangeSummary, ChangeTracker, DomainChanges};
use crate::config::DomainRegistry;
use crate::fetch::ImageSource;
use crate::limiter::RateLimiter;
use crate::reconcile::Reconciler;
use crate::{Error, Result};

/// Which phases a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Validate, clean, synchronize, and minify
    #[default]
    Full,
    /// Validate and clean only; no network, no minified copies
    ValidateOnly,
    /// Clean and synchronize; no minified copies
    SyncOnly,
}

/// What to run and how.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub mode: Mode,
    /// Compute everything but write nothing
    pub dry_run: bool,
    /// Restrict the run to these domains; `None` runs every discovered one
    pub domains: Option<Vec<String>>,
}

/// What happened to one domain.
#[derive(Debug, Clone)]
pub struct DomainReport {
    pub domain: String,
    pub validation_errors: Vec<String>,
    pub validation_warnings: Vec<String>,
    pub changes: DomainChanges,
    /// Set when the domain was aborted by an error; other domains continue
    pub failed: Option<String>,
}

/// The result of one run.
#[derive(Debug)]
pub struct RunSummary {
    pub reports: Vec<DomainReport>,
    pub changes: ChangeSummary,
}

impl RunSummary {
    /// Whether every domain was processed without error.
    pub fn all_ok(&self) -> bool {
        self.reports.iter().all(|r| r.failed.is_none())
    }
}

/// Runs the mapping pipeline over a mapping repository.
pub struct Pipeline {
    store: MappingStore,
    registry: DomainRegistry,
    source: Arc<dyn ImageSource>,
}

impl Pipeline {
    pub fn new(store: MappingStore, registry: DomainRegistry, source: Arc<dyn ImageSource>) -> Self {
        Self {
            store,
            registry,
            source,
        }
    }

    /// Run the pipeline.
    ///
    /// # Errors
    ///
    /// Fails only for run-level problems: an invalid mapping layout or a
    /// selected domain that does not exist. Per-domain failures are
    /// reported in the summary instead.
    pub async fn run(&self, options: &PipelineOptions) -> Result<RunSummary> {
        self.store.layout().validate()?;
        let discovered = self.store.layout().discover_domains()?;

        let domains = match &options.domains {
            Some(selected) => {
                for domain in selected {
                    if !discovered.contains(domain) {
                        return Err(Error::UnknownDomain {
                            domain: domain.clone(),
                        });
                    }
                }
                selected.clone()
            }
            None => discovered,
        };

        tracing::info!(
            mode = ?options.mode,
            dry_run = options.dry_run,
            domains = domains.len(),
            "starting run"
        );

        let tasks = domains
            .iter()
            .map(|domain| self.process_domain(domain, options));
        let reports = join_all(tasks).await;

        let mut tracker = ChangeTracker::new();
        for report in &reports {
            tracker.record(report.changes.clone());
        }
        let changes = tracker.into_summary(Utc::now());

        if !options.dry_run {
            let path = self.store.layout().change_summary_path();
            let mut content = serde_json::to_string_pretty(&changes)?;
            content.push('\n');
            io::write_atomic(&path, content.as_bytes())?;
        }

        let summary = RunSummary { reports, changes };
        tracing::info!(
            has_changes = summary.changes.has_changes,
            all_ok = summary.all_ok(),
            "run finished"
        );
        Ok(summary)
    }

    /// Process one domain; errors become a failed report, never a panic or
    /// an aborted run.
    async fn process_domain(&self, domain: &str, options: &PipelineOptions) -> DomainReport {
        match self.try_process_domain(domain, options).await {
            Ok(report) => report,
            Err(error) => {
                tracing::error!(domain, %error, "domain failed");
                DomainReport {
                    domain: domain.to_string(),
                    validation_errors: Vec::new(),
                    validation_warnings: Vec::new(),
                    changes: DomainChanges::new(domain),
                    failed: Some(error.to_string()),
                }
            }
        }
    }

    async fn try_process_domain(
        &self,
        domain: &str,
        options: &PipelineOptions,
    ) -> Result<DomainReport> {
        let filenames = self.store.load(domain, MappingKind::Filename)?;
        let hashes = self.store.load(domain, MappingKind::Hash)?;
        let mut changes = DomainChanges::new(domain);

        let mut validation_errors = Vec::new();
        let mut validation_warnings = Vec::new();
        for (table, kind) in [
            (&filenames, MappingKind::Filename),
            (&hashes, MappingKind::Hash),
        ] {
            let report = validate(table, kind);
            validation_errors.extend(report.errors);
            validation_warnings.extend(report.warnings);
        }

        let (filenames, f_report) = clean(&filenames, MappingKind::Filename);
        let (mut hashes, h_report) = clean(&hashes, MappingKind::Hash);
        changes.duplicates_removed = f_report.exact_duplicates + h_report.exact_duplicates;
        changes.conflicts_resolved = f_report.conflicts.len() + h_report.conflicts.len();

        if options.mode != Mode::ValidateOnly {
            match self.registry.get(domain) {
                Some(config) => {
                    let limiter = RateLimiter::from_secs_f64(config.rate_limit_delay);
                    let reconciler = Reconciler::new(config, self.source.as_ref(), &limiter);
                    let outcome = reconciler.reconcile(&filenames, &mut hashes).await;

                    changes.hashes_created = outcome.hashes_created;
                    changes.unresolved_characters = outcome
                        .unresolved
                        .iter()
                        .map(|u| u.character.clone())
                        .collect();
                    changes.orphaned_characters = outcome.orphaned_characters;
                }
                None => {
                    tracing::warn!(domain, "no fetch config; skipping synchronization");
                }
            }
            // new entries land in canonical position
            let (resorted, _) = clean(&hashes, MappingKind::Hash);
            hashes = resorted;
        }

        // conditions cleaning cannot repair (empty values, bad key shapes)
        // abort the domain before anything is written
        let mut final_errors = Vec::new();
        for (table, kind) in [
            (&filenames, MappingKind::Filename),
            (&hashes, MappingKind::Hash),
        ] {
            final_errors.extend(validate(table, kind).errors);
        }
        if !final_errors.is_empty() {
            return Err(Error::ValidationFailed {
                domain: domain.to_string(),
                message: final_errors.join("; "),
            });
        }

        if !options.dry_run {
            for (kind, table) in [
                (MappingKind::Filename, &filenames),
                (MappingKind::Hash, &hashes),
            ] {
                if self.store.save(domain, kind, table)? {
                    changes.files_written += 1;
                }
            }

            if options.mode == Mode::Full {
                for (kind, table) in [
                    (MappingKind::Filename, &filenames),
                    (MappingKind::Hash, &hashes),
                ] {
                    if self.store.save_minified(domain, kind, table)? {
                        changes.files_written += 1;
                    }
                }
            }
        }

        Ok(DomainReport {
            domain: domain.to_string(),
            validation_errors,
            validation_warnings,
            changes,
            failed: None,
        })
    }
}
