//! Filesystem layer for the glyph mapping pipeline
//!
//! Provides the on-disk mapping layout, atomic I/O operations, and
//! content checksums used for change detection.

pub mod checksum;
pub mod error;
pub mod io;
pub mod layout;

pub use error::{Error, Result};
pub use layout::{MappingKind, MappingLayout};
