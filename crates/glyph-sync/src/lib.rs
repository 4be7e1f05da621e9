//! Synchronization engine for the glyph mapping pipeline
//!
//! Fills hash-table gaps by fetching representative images per character,
//! hashing them, and merging the results, then records what changed. The
//! [`Pipeline`] ties validation, cleaning, synchronization, and
//! minification into one run over every domain of a mapping repository.

pub mod changes;
pub mod config;
pub mod error;
pub mod fetch;
pub mod hash;
pub mod limiter;
pub mod pipeline;
pub mod reconcile;

pub use changes::{ChangeSummary, ChangeTracker, ChangeTotals, DomainChanges};
pub use config::{DomainConfig, DomainRegistry};
pub use error::{Error, Result};
pub use fetch::{FetchError, HttpImageSource, ImageSource, fetch_with_retry};
pub use hash::{DHASH_BITS, HashError, dhash, hamming_distance, is_valid_dhash};
pub use limiter::RateLimiter;
pub use pipeline::{DomainReport, Mode, Pipeline, PipelineOptions, RunSummary};
pub use reconcile::{ReconcileOutcome, Reconciler, UnresolvedCharacter};
