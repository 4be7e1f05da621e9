//! On-disk layout of the mapping repository
//!
//! A mapping root contains two category directories, one JSON file per
//! domain in each:
//!
//! ```text
//! <root>/
//!   filename-mappings/<domain>.json      image filename -> character
//!   hash-mappings/<domain>.json          content hash   -> character
//!   filename-mappings/<domain>.min.json  minified copies
//!   hash-mappings/<domain>.min.json
//!   change_summary.json                  per-run change record
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Suffix used for minified copies of mapping files
pub const MINIFIED_SUFFIX: &str = ".min.json";

/// File name of the exported change record
pub const CHANGE_SUMMARY_FILE: &str = "change_summary.json";

/// The two mapping table kinds, keyed differently but sharing one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    /// Image filename -> character
    Filename,
    /// Image content hash -> character
    Hash,
}

impl MappingKind {
    /// Directory name of this kind's category under the mapping root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            MappingKind::Filename => "filename-mappings",
            MappingKind::Hash => "hash-mappings",
        }
    }

    /// Human-readable label used in reports and log output.
    pub fn label(&self) -> &'static str {
        match self {
            MappingKind::Filename => "filename mapping",
            MappingKind::Hash => "hash mapping",
        }
    }
}

/// Resolves paths inside a mapping repository root.
#[derive(Debug, Clone)]
pub struct MappingLayout {
    root: PathBuf,
}

impl MappingLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one kind of mapping files.
    pub fn category_dir(&self, kind: MappingKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Path of a domain's mapping file for the given kind.
    pub fn mapping_path(&self, kind: MappingKind, domain: &str) -> PathBuf {
        self.category_dir(kind).join(format!("{domain}.json"))
    }

    /// Path of a domain's minified mapping file for the given kind.
    pub fn minified_path(&self, kind: MappingKind, domain: &str) -> PathBuf {
        self.category_dir(kind)
            .join(format!("{domain}{MINIFIED_SUFFIX}"))
    }

    /// Path of the exported change record.
    pub fn change_summary_path(&self) -> PathBuf {
        self.root.join(CHANGE_SUMMARY_FILE)
    }

    /// Check that both category directories exist and the filename category
    /// holds at least one mapping file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LayoutValidation`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        for kind in [MappingKind::Filename, MappingKind::Hash] {
            let dir = self.category_dir(kind);
            if !dir.is_dir() {
                return Err(Error::LayoutValidation {
                    message: format!("{} directory not found: {}", kind.label(), dir.display()),
                });
            }
        }

        if self.discover_domains()?.is_empty() {
            return Err(Error::LayoutValidation {
                message: format!(
                    "no mapping files found in {}",
                    self.category_dir(MappingKind::Filename).display()
                ),
            });
        }

        Ok(())
    }

    /// List domains that have a filename-mapping file, sorted.
    ///
    /// Minified copies, dotfiles, and backup files are not domains.
    pub fn discover_domains(&self) -> Result<Vec<String>> {
        let dir = self.category_dir(MappingKind::Filename);
        let entries = fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))?;

        let mut domains = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.')
                || name.ends_with(MINIFIED_SUFFIX)
                || name.contains(".backup")
                || !name.ends_with(".json")
            {
                continue;
            }
            if let Some(stem) = name.strip_suffix(".json") {
                domains.push(stem.to_string());
            }
        }

        domains.sort();
        tracing::debug!(count = domains.len(), "discovered mapping domains");
        Ok(domains)
    }
}
