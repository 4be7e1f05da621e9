//! Loading and saving mapping tables
//!
//! The store is the only component that touches mapping files on disk. It
//! enforces the table schema at the load boundary so malformed shapes never
//! reach reconciliation logic, and writes atomically so an interrupted run
//! never leaves a partial file visible.

use std::path::Path;

use glyph_fs::checksum::{compute_content_checksum, compute_file_checksum};
use glyph_fs::{MappingKind, MappingLayout, io};

use crate::table::{MappingTable, validate_key};
use crate::{Error, Result};

/// Loads and saves the two mapping tables of each domain.
#[derive(Debug, Clone)]
pub struct MappingStore {
    layout: MappingLayout,
}

impl MappingStore {
    pub fn new(layout: MappingLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &MappingLayout {
        &self.layout
    }

    /// Load a domain's table of the given kind.
    ///
    /// A missing file loads as an empty table: synchronization may create
    /// the hash side of a domain from scratch.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedJson`] if the file is not a JSON object of
    /// string -> string pairs; [`Error::SchemaViolation`] if a key does not
    /// match the kind's format.
    pub fn load(&self, domain: &str, kind: MappingKind) -> Result<MappingTable> {
        let path = self.layout.mapping_path(kind, domain);

        let Some(content) = io::read_text_if_exists(&path)? else {
            tracing::debug!(path = %path.display(), "mapping file missing, loading empty table");
            return Ok(MappingTable::new());
        };

        let table = parse_table(&content, &path)?;
        check_schema(&table, kind, &path)?;

        tracing::debug!(
            path = %path.display(),
            entries = table.len(),
            "loaded {}",
            kind.label()
        );
        Ok(table)
    }

    /// Save a domain's table atomically in the pretty on-disk form.
    ///
    /// Skips the write when the file already holds byte-identical content,
    /// so a second run over clean input touches nothing. Returns whether a
    /// write happened.
    pub fn save(&self, domain: &str, kind: MappingKind, table: &MappingTable) -> Result<bool> {
        let path = self.layout.mapping_path(kind, domain);
        let content = table.to_pretty_json()?;
        self.write_if_changed(&path, &content)
    }

    /// Save the minified copy of a domain's table. Returns whether a write
    /// happened.
    pub fn save_minified(
        &self,
        domain: &str,
        kind: MappingKind,
        table: &MappingTable,
    ) -> Result<bool> {
        let path = self.layout.minified_path(kind, domain);
        let content = crate::minify::minify(table)?;
        self.write_if_changed(&path, &content)
    }

    fn write_if_changed(&self, path: &Path, content: &str) -> Result<bool> {
        if path.exists() {
            let existing =
                compute_file_checksum(path).map_err(|e| glyph_fs::Error::io(path, e))?;
            if existing == compute_content_checksum(content) {
                tracing::debug!(path = %path.display(), "content unchanged, skipping write");
                return Ok(false);
            }
        }

        io::write_atomic(path, content.as_bytes())?;
        tracing::info!(path = %path.display(), "wrote mapping file");
        Ok(true)
    }
}

fn parse_table(content: &str, path: &Path) -> Result<MappingTable> {
    serde_json::from_str(content).map_err(|e| Error::MalformedJson {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn check_schema(table: &MappingTable, kind: MappingKind, path: &Path) -> Result<()> {
    for entry in table.entries() {
        if let Err(reason) = validate_key(kind, &entry.key) {
            return Err(Error::SchemaViolation {
                path: path.to_path_buf(),
                key: entry.key.clone(),
                reason,
            });
        }
    }
    Ok(())
}
