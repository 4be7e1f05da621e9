//! Compact serialization of mapping tables
//!
//! A pure formatting transform: exact key/value content and entry order are
//! preserved, only whitespace differs from the pretty form.

use crate::Result;
use crate::table::MappingTable;

/// Produce the compact serialization of a table.
pub fn minify(table: &MappingTable) -> Result<String> {
    Ok(table.to_compact_json()?)
}
