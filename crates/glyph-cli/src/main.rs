//! Glyph mapping pipeline CLI
//!
//! Validates, synchronizes, and minifies the per-domain mapping files of a
//! mapping repository.

mod cli;
mod error;

use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use glyph_fs::MappingLayout;
use glyph_store::MappingStore;
use glyph_sync::{
    DomainRegistry, HttpImageSource, Mode, Pipeline, PipelineOptions, RunSummary,
};

use cli::{Cli, Commands};
use error::{CliError, Result};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    }

    let store = MappingStore::new(MappingLayout::new(&cli.mappings_dir));

    let mut registry = DomainRegistry::with_builtins();
    if let Some(path) = &cli.config {
        registry.merge_file(path)?;
    }

    let source = Arc::new(HttpImageSource::new()?);
    let pipeline = Pipeline::new(store, registry, source);

    let mode = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => Mode::Full,
        Commands::Validate => Mode::ValidateOnly,
        Commands::Sync => Mode::SyncOnly,
    };
    let options = PipelineOptions {
        mode,
        dry_run: cli.dry_run,
        domains: (!cli.domains.is_empty()).then(|| cli.domains.clone()),
    };

    let summary = pipeline.run(&options).await?;
    print_summary(&summary, cli.dry_run);

    let failed = summary.reports.iter().filter(|r| r.failed.is_some()).count();
    if failed > 0 {
        return Err(CliError::user(format!(
            "{failed} domain{} failed",
            if failed == 1 { "" } else { "s" }
        )));
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    for report in &summary.reports {
        if let Some(reason) = &report.failed {
            println!("{} {}: {}", "failed".red().bold(), report.domain, reason);
            continue;
        }

        let c = &report.changes;
        let status = if c.has_changes() {
            "changed".yellow().bold()
        } else {
            "clean".green().bold()
        };
        println!(
            "{status} {}: {} hashes added, {} duplicates removed, {} conflicts resolved",
            report.domain, c.hashes_created, c.duplicates_removed, c.conflicts_resolved
        );

        for error in &report.validation_errors {
            println!("  {} {error}", "error:".red());
        }
        for warning in &report.validation_warnings {
            println!("  {} {warning}", "warning:".yellow());
        }
        for character in &c.unresolved_characters {
            println!("  {} '{character}' has no hash entry", "unresolved:".yellow());
        }
        for character in &c.orphaned_characters {
            println!(
                "  {} '{character}' has a hash entry but no filename entry",
                "orphaned:".yellow()
            );
        }
    }

    println!();
    if dry_run {
        println!("{} nothing written", "dry run:".cyan().bold());
    }
    println!("{}", summary.changes.commit_title.bold());
    if !summary.changes.commit_description.is_empty() {
        println!("{}", summary.changes.commit_description);
    }
}
