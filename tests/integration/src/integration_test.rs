//! End-to-end integration tests for the mapping pipeline
//!
//! These exercise the complete flow against a temporary mapping repository:
//! load -> validate -> clean -> synchronize -> write -> minify, using a
//! scripted image source instead of the network.

use async_trait::async_trait;
use glyph_fs::{MappingKind, MappingLayout};
use glyph_store::{MappingStore, MappingTable};
use glyph_sync::{
    DomainConfig, DomainRegistry, FetchError, ImageSource, Mode, Pipeline, PipelineOptions,
};
use image::{DynamicImage, ImageFormat, Luma};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Serves in-memory PNGs keyed by filename and records every request.
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

/// An ascending gradient hashes to all ones, a descending one to all
/// zeros, so the two directions give two distinct characters distinct
/// hashes.
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

fn seed_repo(root: &Path, domain: &str, filenames: &str, hashes: Option<&str>) {
    fs::create_dir_all(root.join("filename-mappings")).unwrap();
    fs::create_dir_all(root.join("hash-mappings")).unwrap();
    fs::write(
        root.join(format!("filename-mappings/{domain}.json")),
        filenames,
    )
    .unwrap();
    if let Some(hashes) = hashes {
        fs::write(root.join(format!("hash-mappings/{domain}.json")), hashes).unwrap();
    }
}

fn registry_for(domains: &[&str]) -> DomainRegistry {
    let mut registry = DomainRegistry::new();
    for domain in domains {
        let mut config = DomainConfig::xiguashuwu();
        config.domain = domain.to_string();
        config.image_url_pattern = format!("https://{domain}/img/{{filename}}");
        config.rate_limit_delay = 0.0;
        config.referrer_required = false;
        registry.insert(config).unwrap();
    }
    registry
}

fn pipeline(root: &Path, domains: &[&str], source: Arc<MapSource>) -> Pipeline {
    Pipeline::new(
        MappingStore::new(MappingLayout::new(root)),
        registry_for(domains),
        source,
    )
}

fn load_table(root: &Path, kind: MappingKind, domain: &str) -> MappingTable {
    MappingStore::new(MappingLayout::new(root))
        .load(domain, kind)
        .unwrap()
}

#[tokio::test]
async fn full_run_fills_hash_gaps_from_representative_images() {
    let temp = TempDir::new().unwrap();
    seed_repo(
        temp.path(),
        "example.com",
        r#"{"b.png": "字", "a.png": "字", "c.jpg": "符"}"#,
        None,
    );
    let source = Arc::new(MapSource::new(BTreeMap::from([
        ("a.png".to_string(), png(true)),
        ("c.jpg".to_string(), png(false)),
    ])));
    let pipeline = pipeline(temp.path(), &["example.com"], source.clone());

    let summary = pipeline.run(&PipelineOptions::default()).await.unwrap();

    assert!(summary.all_ok());
    assert!(summary.changes.has_changes);
    assert_eq!(summary.changes.totals.hashes_created, 2);

    // only the smallest filename per character is fetched
    let mut requested = source.requested.lock().unwrap().clone();
    requested.sort();
    assert_eq!(requested, vec!["a.png", "c.jpg"]);

    let hashes = load_table(temp.path(), MappingKind::Hash, "example.com");
    assert_eq!(hashes.len(), 2);
    // keyed by the dHash of each representative's bytes
    assert_eq!(hashes.get(&"1".repeat(64)), Some("字"));
    assert_eq!(hashes.get(&"0".repeat(64)), Some("符"));
    for entry in hashes.entries() {
        assert!(glyph_sync::is_valid_dhash(&entry.key));
    }

    // minified copies and the change record land next to the tables
    assert!(temp
        .path()
        .join("hash-mappings/example.com.min.json")
        .exists());
    let record: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(temp.path().join("change_summary.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(record["has_changes"], serde_json::Value::Bool(true));
    assert!(record["commit_title"].as_str().unwrap().contains("1 domain"));
}

#[tokio::test]
async fn fetch_failures_leave_characters_unresolved_without_failing_the_run() {
    let temp = TempDir::new().unwrap();
    seed_repo(
        temp.path(),
        "example.com",
        r#"{"a.png": "字", "gone.png": "符"}"#,
        None,
    );
    let source = Arc::new(MapSource::new(BTreeMap::from([(
        "a.png".to_string(),
        png(true),
    )])));
    let pipeline = pipeline(temp.path(), &["example.com"], source);

    let summary = pipeline.run(&PipelineOptions::default()).await.unwrap();

    assert!(summary.all_ok());
    let report = &summary.reports[0];
    assert_eq!(report.changes.hashes_created, 1);
    assert_eq!(report.changes.unresolved_characters, vec!["符"]);

    let hashes = load_table(temp.path(), MappingKind::Hash, "example.com");
    assert!(hashes.contains_value("字"));
    assert!(!hashes.contains_value("符"));
}

#[tokio::test]
async fn hash_entries_are_never_invented_for_missing_filenames() {
    let temp = TempDir::new().unwrap();
    let orphan_hash = "0".repeat(64);
    seed_repo(
        temp.path(),
        "example.com",
        r#"{"a.png": "字"}"#,
        Some(&format!(r#"{{"{orphan_hash}": "孤"}}"#)),
    );
    let source = Arc::new(MapSource::new(BTreeMap::from([(
        "a.png".to_string(),
        png(true),
    )])));
    let pipeline = pipeline(temp.path(), &["example.com"], source);

    let summary = pipeline.run(&PipelineOptions::default()).await.unwrap();

    assert!(summary.all_ok());
    assert_eq!(summary.reports[0].changes.orphaned_characters, vec!["孤"]);

    // the orphaned hash entry survives untouched; no filename was synthesized
    let hashes = load_table(temp.path(), MappingKind::Hash, "example.com");
    assert_eq!(hashes.get(&orphan_hash), Some("孤"));
    let filenames = load_table(temp.path(), MappingKind::Filename, "example.com");
    assert!(!filenames.contains_value("孤"));
}

#[tokio::test]
async fn second_run_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    seed_repo(
        temp.path(),
        "example.com",
        r#"{"b.png": "字", "a.png": "字", "a.png": "字", "c.jpg": "符"}"#,
        None,
    );
    let source = Arc::new(MapSource::new(BTreeMap::from([
        ("a.png".to_string(), png(true)),
        ("c.jpg".to_string(), png(false)),
    ])));
    let pipeline = pipeline(temp.path(), &["example.com"], source);

    let first = pipeline.run(&PipelineOptions::default()).await.unwrap();
    assert!(first.changes.has_changes);

    let read_all = |root: &Path| -> Vec<(String, String)> {
        let mut files = Vec::new();
        for dir in ["filename-mappings", "hash-mappings"] {
            for entry in fs::read_dir(root.join(dir)).unwrap() {
                let path = entry.unwrap().path();
                files.push((
                    path.display().to_string(),
                    fs::read_to_string(&path).unwrap(),
                ));
            }
        }
        files.sort();
        files
    };
    let after_first = read_all(temp.path());

    let second = pipeline.run(&PipelineOptions::default()).await.unwrap();
    assert!(!second.changes.has_changes);
    assert_eq!(second.reports[0].changes.files_written, 0);
    assert_eq!(read_all(temp.path()), after_first);
}

#[tokio::test]
async fn domains_are_isolated_and_processed_together() {
    let temp = TempDir::new().unwrap();
    seed_repo(temp.path(), "bad.example.com", "not json at all", None);
    seed_repo(temp.path(), "good.example.com", r#"{"a.png": "字"}"#, None);
    let source = Arc::new(MapSource::new(BTreeMap::from([(
        "a.png".to_string(),
        png(true),
    )])));
    let pipeline = pipeline(
        temp.path(),
        &["bad.example.com", "good.example.com"],
        source,
    );

    let summary = pipeline.run(&PipelineOptions::default()).await.unwrap();

    assert!(!summary.all_ok());
    assert_eq!(summary.reports.len(), 2);

    let bad = summary
        .reports
        .iter()
        .find(|r| r.domain == "bad.example.com")
        .unwrap();
    assert!(bad.failed.as_deref().unwrap().contains("malformed JSON"));

    let good = summary
        .reports
        .iter()
        .find(|r| r.domain == "good.example.com")
        .unwrap();
    assert!(good.failed.is_none());
    assert_eq!(good.changes.hashes_created, 1);
    assert!(temp
        .path()
        .join("hash-mappings/good.example.com.json")
        .exists());
}

#[tokio::test]
async fn sync_only_skips_minified_copies() {
    let temp = TempDir::new().unwrap();
    seed_repo(temp.path(), "example.com", r#"{"a.png": "字"}"#, None);
    let source = Arc::new(MapSource::new(BTreeMap::from([(
        "a.png".to_string(),
        png(true),
    )])));
    let pipeline = pipeline(temp.path(), &["example.com"], source);

    let options = PipelineOptions {
        mode: Mode::SyncOnly,
        ..Default::default()
    };
    let summary = pipeline.run(&options).await.unwrap();

    assert!(summary.all_ok());
    assert!(temp.path().join("hash-mappings/example.com.json").exists());
    assert!(!temp
        .path()
        .join("hash-mappings/example.com.min.json")
        .exists());
    assert!(!temp
        .path()
        .join("filename-mappings/example.com.min.json")
        .exists());
}

#[tokio::test]
async fn cleaning_orders_entries_by_character_then_key() {
    let temp = TempDir::new().unwrap();
    seed_repo(
        temp.path(),
        "example.com",
        // '字' is U+5B57, '符' is U+7B26
        r#"{"z.png": "符", "b.png": "字", "a.png": "字"}"#,
        None,
    );
    let source = Arc::new(MapSource::new(BTreeMap::new()));
    let pipeline = pipeline(temp.path(), &["example.com"], source);

    let options = PipelineOptions {
        mode: Mode::ValidateOnly,
        ..Default::default()
    };
    pipeline.run(&options).await.unwrap();

    let filenames = load_table(temp.path(), MappingKind::Filename, "example.com");
    let keys: Vec<&str> = filenames.entries().iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["a.png", "b.png", "z.png"]);
}
