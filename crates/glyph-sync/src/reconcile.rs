//! Reconciling the two tables of a domain
//!
//! The filename table is the source of truth for which characters exist.
//! Characters it labels that have no hash entry get one by fetching a
//! representative image and hashing it. The reverse direction is
//! report-only: a hash entry whose character has no filename entry is
//! surfaced, never synthesized away, because a filename cannot be derived
//! from a hash.

use futures::future::join_all;

use glyph_store::MappingTable;

use crate::config::DomainConfig;
use crate::fetch::{ImageSource, fetch_with_retry};
use crate::hash::dhash;
use crate::limiter::RateLimiter;

/// A character whose hash entry could not be created this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedCharacter {
    pub character: String,
    pub filename: String,
    pub reason: String,
}

/// What reconciliation did to one domain.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// Hash entries added this run
    pub hashes_created: usize,
    /// Characters still lacking a hash entry, with the failure reason
    pub unresolved: Vec<UnresolvedCharacter>,
    /// Characters that have a hash entry but no filename entry
    pub orphaned_characters: Vec<String>,
}

/// Fetches and hashes representative images to fill hash-table gaps.
pub struct Reconciler<'a> {
    config: &'a DomainConfig,
    source: &'a dyn ImageSource,
    limiter: &'a RateLimiter,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        config: &'a DomainConfig,
        source: &'a dyn ImageSource,
        limiter: &'a RateLimiter,
    ) -> Self {
        Self {
            config,
            source,
            limiter,
        }
    }

    /// Bring `hashes` up to date against `filenames`.
    ///
    /// For each character the filename table labels but the hash table does
    /// not, the lexicographically smallest filename is fetched and hashed;
    /// fetches run concurrently, spaced by the domain's rate limiter. A
    /// failed fetch leaves the character unresolved and never fails the
    /// domain.
    pub async fn reconcile(
        &self,
        filenames: &MappingTable,
        hashes: &mut MappingTable,
    ) -> ReconcileOutcome {
        let labeled = filenames.distinct_values();
        let hashed = hashes.distinct_values();

        let mut outcome = ReconcileOutcome {
            orphaned_characters: hashed.difference(&labeled).cloned().collect(),
            ..Default::default()
        };
        if !outcome.orphaned_characters.is_empty() {
            tracing::warn!(
                domain = self.config.domain,
                characters = ?outcome.orphaned_characters,
                "hash entries without a filename entry; cannot repair automatically"
            );
        }

        // BTreeSet difference keeps this in code-point order, so retries
        // and reruns fetch in the same sequence
        let missing: Vec<(String, String)> = labeled
            .difference(&hashed)
            .filter_map(|character| {
                filenames
                    .representative_key(character)
                    .map(|filename| (character.clone(), filename.to_string()))
            })
            .collect();

        if missing.is_empty() {
            return outcome;
        }
        tracing::info!(
            domain = self.config.domain,
            count = missing.len(),
            "fetching images for characters without hash entries"
        );

        let fetches = missing.iter().map(|(character, filename)| async move {
            let result = self.hash_one(filename).await;
            (character, filename, result)
        });
        let results = join_all(fetches).await;

        for (character, filename, result) in results {
            match result {
                Ok(hash) => {
                    if let Some(existing) = hashes.get(&hash) {
                        // two characters whose images reduce to the same hash
                        outcome.unresolved.push(UnresolvedCharacter {
                            character: character.clone(),
                            filename: filename.clone(),
                            reason: format!("hash already maps to '{existing}'"),
                        });
                        continue;
                    }
                    hashes.push(hash, character.clone());
                    outcome.hashes_created += 1;
                }
                Err(reason) => {
                    outcome.unresolved.push(UnresolvedCharacter {
                        character: character.clone(),
                        filename: filename.clone(),
                        reason,
                    });
                }
            }
        }

        if !outcome.unresolved.is_empty() {
            tracing::warn!(
                domain = self.config.domain,
                count = outcome.unresolved.len(),
                "characters left unresolved"
            );
        }

        outcome
    }

    async fn hash_one(&self, filename: &str) -> Result<String, String> {
        let bytes = fetch_with_retry(self.source, self.limiter, self.config, filename)
            .await
            .map_err(|e| e.to_string())?;
        dhash(&bytes).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use async_trait::async_trait;
    use glyph_store::MappingEntry;
    use image::{DynamicImage, ImageFormat, Luma};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Serves PNGs from a filename map and records what was requested.
    struct MapSource {
        images: BTreeMap<String, Vec<u8>>,
        requested: Mutex<Vec<String>>,
    }

    impl MapSource {
        fn new(images: BTreeMap<String, Vec<u8>>) -> Self {
            Self {
                images,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageSource for MapSource {
        async fn fetch(&self, _: &DomainConfig, filename: &str) -> Result<Vec<u8>, FetchError> {
            self.requested.lock().unwrap().push(filename.to_string());
            self.images
                .get(filename)
                .cloned()
                .ok_or_else(|| FetchError::Permanent(format!("{filename}: HTTP 404")))
        }
    }

    // ascending gradient hashes to all ones, descending to all zeros
    fn png(ascending: bool) -> Vec<u8> {
        let buf = image::ImageBuffer::from_fn(90, 80, |x, _| {
            let v = (x * 2) as u8;
            Luma([if ascending { v } else { 178 - v }])
        });
        let mut out = Vec::new();
        DynamicImage::ImageLuma8(buf)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn table(pairs: &[(&str, &str)]) -> MappingTable {
        MappingTable::from_entries(
            pairs
                .iter()
                .map(|(k, v)| MappingEntry::new(*k, *v))
                .collect(),
        )
    }

    fn config() -> DomainConfig {
        DomainConfig::xiguashuwu()
    }

    #[tokio::test]
    async fn fills_gaps_using_the_smallest_filename() {
        let source = MapSource::new(BTreeMap::from([
            ("a.png".to_string(), png(true)),
            ("c.jpg".to_string(), png(false)),
        ]));
        let limiter = RateLimiter::unlimited();
        let config = config();
        let reconciler = Reconciler::new(&config, &source, &limiter);

        let filenames = table(&[("b.png", "字"), ("a.png", "字"), ("c.jpg", "符")]);
        let mut hashes = MappingTable::new();

        let outcome = reconciler.reconcile(&filenames, &mut hashes).await;

        assert_eq!(outcome.hashes_created, 2);
        assert!(outcome.unresolved.is_empty());
        assert_eq!(hashes.len(), 2);
        // keys are the dHashes of the representative bytes: a.png's
        // ascending gradient is all ones, c.jpg's descending one all zeros
        assert_eq!(hashes.get(&"1".repeat(64)), Some("字"));
        assert_eq!(hashes.get(&"0".repeat(64)), Some("符"));
        // b.png is never fetched: a.png represents '字'
        assert_eq!(source.requested(), vec!["a.png", "c.jpg"]);
    }

    #[tokio::test]
    async fn already_hashed_characters_are_not_fetched() {
        let source = MapSource::new(BTreeMap::new());
        let limiter = RateLimiter::unlimited();
        let config = config();
        let reconciler = Reconciler::new(&config, &source, &limiter);

        let filenames = table(&[("a.png", "字")]);
        let mut hashes = table(&[(&"0".repeat(64), "字")]);

        let outcome = reconciler.reconcile(&filenames, &mut hashes).await;

        assert_eq!(outcome.hashes_created, 0);
        assert!(source.requested().is_empty());
        assert_eq!(hashes.len(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_the_character_unresolved() {
        let source = MapSource::new(BTreeMap::from([("a.png".to_string(), png(true))]));
        let limiter = RateLimiter::unlimited();
        let config = config();
        let reconciler = Reconciler::new(&config, &source, &limiter);

        let filenames = table(&[("a.png", "字"), ("missing.png", "符")]);
        let mut hashes = MappingTable::new();

        let outcome = reconciler.reconcile(&filenames, &mut hashes).await;

        assert_eq!(outcome.hashes_created, 1);
        assert_eq!(outcome.unresolved.len(), 1);
        assert_eq!(outcome.unresolved[0].character, "符");
        assert_eq!(outcome.unresolved[0].filename, "missing.png");
        assert!(hashes.contains_value("字"));
        assert!(!hashes.contains_value("符"));
    }

    #[tokio::test]
    async fn undecodable_image_leaves_the_character_unresolved() {
        let source = MapSource::new(BTreeMap::from([(
            "a.png".to_string(),
            b"not an image".to_vec(),
        )]));
        let limiter = RateLimiter::unlimited();
        let config = config();
        let reconciler = Reconciler::new(&config, &source, &limiter);

        let filenames = table(&[("a.png", "字")]);
        let mut hashes = MappingTable::new();

        let outcome = reconciler.reconcile(&filenames, &mut hashes).await;

        assert_eq!(outcome.hashes_created, 0);
        assert_eq!(outcome.unresolved.len(), 1);
        assert!(outcome.unresolved[0].reason.contains("decode"));
    }

    #[tokio::test]
    async fn identical_images_collide_and_the_second_character_is_unresolved() {
        let source = MapSource::new(BTreeMap::from([
            ("a.png".to_string(), png(true)),
            ("b.png".to_string(), png(true)),
        ]));
        let limiter = RateLimiter::unlimited();
        let config = config();
        let reconciler = Reconciler::new(&config, &source, &limiter);

        let filenames = table(&[("a.png", "字"), ("b.png", "符")]);
        let mut hashes = MappingTable::new();

        let outcome = reconciler.reconcile(&filenames, &mut hashes).await;

        assert_eq!(outcome.hashes_created, 1);
        assert_eq!(outcome.unresolved.len(), 1);
        // '字' (U+5B57) precedes '符' (U+7B26), so it keeps the hash
        assert_eq!(hashes.keys_for_value("字").len(), 1);
        assert_eq!(outcome.unresolved[0].character, "符");
    }

    #[tokio::test]
    async fn orphaned_hash_entries_are_reported_not_repaired() {
        let source = MapSource::new(BTreeMap::new());
        let limiter = RateLimiter::unlimited();
        let config = config();
        let reconciler = Reconciler::new(&config, &source, &limiter);

        let filenames = MappingTable::new();
        let mut hashes = table(&[(&"0".repeat(64), "字")]);
        let before = hashes.clone();

        let outcome = reconciler.reconcile(&filenames, &mut hashes).await;

        assert_eq!(outcome.orphaned_characters, vec!["字"]);
        assert_eq!(hashes, before);
        assert!(source.requested().is_empty());
    }
}
