//! Mapping tables, validation, and minification
//!
//! This crate owns the two JSON table shapes of the pipeline:
//!
//! - **filename mapping**: image filename -> single-character label
//! - **hash mapping**: 64-bit dHash (binary-digit string) -> single-character label
//!
//! [`MappingTable`] is an ordered sequence of entries rather than a map, so
//! duplicate keys in a hand-edited file survive parsing and can be reported
//! by the cleaner instead of being silently collapsed. [`MappingStore`]
//! enforces the schema at the load boundary and writes atomically;
//! [`clean`] and [`validate`] implement duplicate removal, canonical
//! ordering, and the hash-uniqueness invariant.

pub mod clean;
pub mod error;
pub mod minify;
pub mod store;
pub mod table;
pub mod validate;

pub use clean::{CleanReport, Conflict, clean};
pub use error::{Error, Result};
pub use glyph_fs::{MappingKind, MappingLayout};
pub use minify::minify;
pub use store::MappingStore;
pub use table::{HASH_KEY_LEN, MappingEntry, MappingTable, validate_key};
pub use validate::{ValidationReport, validate};
