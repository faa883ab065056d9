// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Saves and restores the model artifact: weights, vocabulary and
// category index, always as one set.
//
// Directory layout:
//   <root>/
//     latest.json                    ← { "artifact": "<name>" }
//     artifacts/
//       <name>/                      ← one published artifact
//         model_config.json
//         model.mpk.gz
//         vocabulary.json
//         category_index.json
//         manifest.json              ← version, trained_at, sizes
//         train_config.json
//         metrics.csv
//       .staging-<name>/             ← only while a run is writing
//
// Publishing writes every file into a staging directory, renames
// it to its final name, and only then swaps latest.json (write to
// a temp file + rename). Until that last rename, readers keep
// seeing the previous artifact. Any failure before it removes the
// staging directory and leaves latest.json untouched.
//
// The artifact that was current before the swap is kept, so a
// reader that resolved the old pointer can finish its reads; only
// artifacts older than that one are removed.
//
// Loading follows latest.json and reads all components; if any
// one is missing or malformed the whole load fails. When the
// reads fail because a publish moved the pointer meanwhile, the
// load starts over once from the new pointer.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::application::train_use_case::TrainConfig;
use crate::data::category_index::CategoryIndex;
use crate::data::vocabulary::Vocabulary;
use crate::domain::traits::Persistable;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};

pub const POINTER_FILE:        &str = "latest.json";
pub const ARTIFACTS_DIR:       &str = "artifacts";
pub const VOCABULARY_FILE:     &str = "vocabulary.json";
pub const CATEGORY_INDEX_FILE: &str = "category_index.json";
pub const MANIFEST_FILE:       &str = "manifest.json";
pub const TRAIN_CONFIG_FILE:   &str = "train_config.json";

/// Environment variable consulted when no version label is given
pub const VERSION_ENV:      &str = "CATEGORIZER_MODEL_VERSION";
pub const FALLBACK_VERSION: &str = "unversioned";

/// The externally supplied label: explicit value, then
/// $CATEGORIZER_MODEL_VERSION. Blank strings count as absent.
pub fn supplied_version(explicit: Option<String>) -> Option<String> {
    explicit
        .filter(|v| !v.trim().is_empty())
        .or_else(|| std::env::var(VERSION_ENV).ok().filter(|v| !v.trim().is_empty()))
}

/// Supplied label, or "unversioned"
pub fn resolve_version(explicit: Option<String>) -> String {
    supplied_version(explicit).unwrap_or_else(|| FALLBACK_VERSION.to_string())
}

/// Distinguishes publishes of one process within the same microsecond
static PUBLISH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Descriptive metadata stored next to the weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version:          String,
    pub trained_at:       DateTime<Utc>,
    pub vocabulary_size:  usize,
    pub category_count:   usize,
    pub embedding_dim:    usize,
    pub max_seq_len:      usize,
    pub example_count:    usize,
    pub correction_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct Pointer {
    artifact: String,
}

/// Everything one publish writes
pub struct ArtifactContents<'a, M> {
    pub model:          &'a M,
    pub vocabulary:     &'a Vocabulary,
    pub category_index: &'a CategoryIndex,
    pub manifest:       &'a ArtifactManifest,
    pub train_config:   &'a TrainConfig,
    pub metrics:        &'a [EpochMetrics],
}

/// Everything one load returns
#[derive(Debug)]
pub struct ArtifactBundle<M> {
    pub model:          M,
    pub vocabulary:     Vocabulary,
    pub category_index: CategoryIndex,
    pub manifest:       ArtifactManifest,
}

/// Publishes and loads artifacts under one root directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write a complete artifact and make it the current one.
    /// Returns the directory of the newly published artifact.
    pub fn publish<M: Persistable>(&self, contents: ArtifactContents<'_, M>) -> Result<PathBuf> {
        let artifacts = self.root.join(ARTIFACTS_DIR);
        fs::create_dir_all(&artifacts)
            .with_context(|| format!("Cannot create '{}'", artifacts.display()))?;

        let name = format!(
            "{}-{}-{}",
            contents.manifest.trained_at.format("%Y%m%dT%H%M%S%6fZ"),
            std::process::id(),
            PUBLISH_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let staging   = artifacts.join(format!(".staging-{name}"));
        let final_dir = artifacts.join(&name);

        // ── Step 1: write every component into staging ────────────────────────
        if let Err(e) = write_components(&staging, &contents) {
            discard(&staging);
            return Err(e.context("Artifact not published, previous artifact left in place"));
        }

        // ── Step 2: give the staged directory its final name ──────────────────
        if let Err(e) = fs::rename(&staging, &final_dir) {
            discard(&staging);
            return Err(anyhow::Error::new(e).context(format!(
                "Cannot move staged artifact to '{}'", final_dir.display()
            )));
        }

        // ── Step 3: swap the pointer ──────────────────────────────────────────
        let previous = self.current_name().ok();
        if let Err(e) = self.write_pointer(&name) {
            discard(&final_dir);
            return Err(e);
        }

        // ── Step 4: prune all but the new and the replaced artifact ──────────
        prune(&artifacts, &[name.as_str(), previous.as_deref().unwrap_or_default()]);

        tracing::info!(
            "Published artifact '{}' (version {})",
            final_dir.display(),
            contents.manifest.version
        );
        Ok(final_dir)
    }

    /// Load weights, vocabulary, category index and manifest of the
    /// current artifact, all or nothing.
    pub fn load<M: Persistable>(&self) -> Result<ArtifactBundle<M>> {
        let name = self.current_name()?;
        match self.load_named(&name) {
            Ok(bundle) => Ok(bundle),
            Err(e) => match self.current_name() {
                Ok(latest) if latest != name => {
                    tracing::warn!("Artifact '{name}' was replaced while loading, reading '{latest}'");
                    self.load_named(&latest)
                }
                _ => Err(e),
            },
        }
    }

    fn load_named<M: Persistable>(&self, name: &str) -> Result<ArtifactBundle<M>> {
        let dir = self.root.join(ARTIFACTS_DIR).join(name);

        let vocabulary: Vocabulary        = read_json(&dir.join(VOCABULARY_FILE))?;
        let category_index: CategoryIndex = read_json(&dir.join(CATEGORY_INDEX_FILE))?;
        let manifest: ArtifactManifest    = read_json(&dir.join(MANIFEST_FILE))?;
        let model = M::load(&dir)
            .with_context(|| format!("Cannot load model weights from '{}'", dir.display()))?;

        anyhow::ensure!(
            manifest.vocabulary_size == vocabulary.len(),
            "manifest lists {} tokens but vocabulary has {}",
            manifest.vocabulary_size, vocabulary.len()
        );
        anyhow::ensure!(
            manifest.category_count == category_index.len(),
            "manifest lists {} categories but category index has {}",
            manifest.category_count, category_index.len()
        );

        tracing::debug!("Loaded artifact from '{}'", dir.display());
        Ok(ArtifactBundle { model, vocabulary, category_index, manifest })
    }

    /// Manifest of the current artifact
    pub fn load_manifest(&self) -> Result<ArtifactManifest> {
        read_json(&self.current_dir()?.join(MANIFEST_FILE))
    }

    /// Directory of the current artifact.
    /// Returns an error if nothing has been published yet.
    pub fn current_dir(&self) -> Result<PathBuf> {
        Ok(self.root.join(ARTIFACTS_DIR).join(self.current_name()?))
    }

    fn current_name(&self) -> Result<String> {
        let pointer: Pointer = read_json(&self.root.join(POINTER_FILE))
            .with_context(|| "No artifact has been published yet. Have you run 'train' first?")?;
        anyhow::ensure!(
            !pointer.artifact.is_empty()
                && !pointer.artifact.contains(['/', '\\'])
                && pointer.artifact != ".."
                && pointer.artifact != ".",
            "Pointer names an invalid artifact '{}'",
            pointer.artifact
        );
        Ok(pointer.artifact)
    }

    fn write_pointer(&self, name: &str) -> Result<()> {
        let path = self.root.join(POINTER_FILE);
        let tmp  = self.root.join(format!("{POINTER_FILE}.tmp"));
        let json = serde_json::to_string(&Pointer { artifact: name.to_string() })?;

        fs::write(&tmp, json)
            .with_context(|| format!("Cannot write '{}'", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Cannot replace '{}'", path.display()))?;
        Ok(())
    }
}

fn write_components<M: Persistable>(dir: &Path, c: &ArtifactContents<'_, M>) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create staging dir '{}'", dir.display()))?;

    c.model.save(dir)?;
    write_json(&dir.join(VOCABULARY_FILE), c.vocabulary)?;
    write_json(&dir.join(CATEGORY_INDEX_FILE), c.category_index)?;
    write_json(&dir.join(TRAIN_CONFIG_FILE), c.train_config)?;
    MetricsLogger::new(dir)?.log_all(c.metrics)?;

    // The manifest goes last: a staged dir with a manifest is complete
    write_json(&dir.join(MANIFEST_FILE), c.manifest)?;
    Ok(())
}

/// Remove every published artifact whose name is not in `keep`.
/// Staging directories of other runs are left alone.
fn prune(artifacts: &Path, keep: &[&str]) {
    let entries = match fs::read_dir(artifacts) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot list '{}': {e}", artifacts.display());
            return;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || keep.contains(&name.as_str()) {
            continue;
        }
        let path = entry.path();
        if let Err(e) = fs::remove_dir_all(&path) {
            tracing::warn!("Cannot remove old artifact '{}': {e}", path.display());
        } else {
            tracing::debug!("Removed old artifact '{}'", path.display());
        }
    }
}

fn discard(dir: &Path) {
    if dir.exists() {
        if let Err(e) = fs::remove_dir_all(dir) {
            tracing::warn!("Cannot clean up '{}': {e}", dir.display());
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .with_context(|| format!("Cannot write '{}'", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Cannot parse '{}'", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        /// Weight labels to publish from inside the next FakeWeights::load
        static PUBLISH_DURING_LOAD: RefCell<Option<(ArtifactStore, Vec<&'static str>)>> =
            const { RefCell::new(None) };
    }

    /// Weights stand-in: a single text file
    #[derive(Debug, PartialEq)]
    struct FakeWeights(String);

    impl Persistable for FakeWeights {
        fn save(&self, dir: &Path) -> Result<()> {
            if self.0 == "fail" {
                anyhow::bail!("disk full");
            }
            fs::write(dir.join("weights.txt"), &self.0)?;
            Ok(())
        }

        fn load(dir: &Path) -> Result<Self> {
            if let Some((store, labels)) = PUBLISH_DURING_LOAD.with(|p| p.borrow_mut().take()) {
                for label in labels {
                    publish(&store, label, label)?;
                }
            }
            Ok(Self(fs::read_to_string(dir.join("weights.txt"))?))
        }
    }

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn publish(store: &ArtifactStore, weights: &str, version: &str) -> Result<PathBuf> {
        let vocabulary     = Vocabulary::build(vec![toks(&["coffee", "shop"])]);
        let category_index = CategoryIndex::build(["FOOD"]);
        let manifest = ArtifactManifest {
            version:          version.to_string(),
            trained_at:       Utc::now(),
            vocabulary_size:  vocabulary.len(),
            category_count:   category_index.len(),
            embedding_dim:    16,
            max_seq_len:      50,
            example_count:    1,
            correction_count: 0,
        };
        store.publish(ArtifactContents {
            model:          &FakeWeights(weights.to_string()),
            vocabulary:     &vocabulary,
            category_index: &category_index,
            manifest:       &manifest,
            train_config:   &TrainConfig::default(),
            metrics:        &[EpochMetrics::new(1, 0.5, 1.0, f64::NAN, 0.0)],
        })
    }

    #[test]
    fn test_publish_then_load() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let path  = publish(&store, "w1", "v1").unwrap();

        assert!(path.join(MANIFEST_FILE).exists());
        assert!(path.join(crate::infra::metrics::METRICS_FILE).exists());

        let bundle: ArtifactBundle<FakeWeights> = store.load().unwrap();
        assert_eq!(bundle.model, FakeWeights("w1".into()));
        assert_eq!(bundle.vocabulary.get("shop"), Some(2));
        assert_eq!(bundle.category_index.decode(0).map(String::as_str), Some("FOOD"));
        assert_eq!(bundle.manifest.version, "v1");
    }

    #[test]
    fn test_new_artifact_replaces_old() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let first  = publish(&store, "w1", "v1").unwrap();
        let second = publish(&store, "w2", "v2").unwrap();

        assert_ne!(first, second);
        let bundle: ArtifactBundle<FakeWeights> = store.load().unwrap();
        assert_eq!(bundle.model, FakeWeights("w2".into()));

        // the replaced artifact survives one more publish, then goes
        assert!(first.exists());
        let third = publish(&store, "w3", "v3").unwrap();
        assert!(!first.exists());
        assert!(second.exists());
        assert!(third.exists());
    }

    #[test]
    fn test_publish_during_load_keeps_the_old_set_readable() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        publish(&store, "w1", "w1").unwrap();

        PUBLISH_DURING_LOAD.with(|p| *p.borrow_mut() = Some((store.clone(), vec!["w2"])));
        let bundle: ArtifactBundle<FakeWeights> = store.load().unwrap();

        assert_eq!(bundle.model, FakeWeights("w1".into()));
        assert_eq!(bundle.manifest.version, "w1");
        assert_eq!(store.load_manifest().unwrap().version, "w2");
    }

    #[test]
    fn test_load_follows_pointer_when_its_artifact_is_pruned_midway() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let first = publish(&store, "w1", "w1").unwrap();

        // two publishes while weights load: the first artifact is pruned
        PUBLISH_DURING_LOAD.with(|p| *p.borrow_mut() = Some((store.clone(), vec!["w2", "w3"])));
        let bundle: ArtifactBundle<FakeWeights> = store.load().unwrap();

        assert!(!first.exists());
        assert_eq!(bundle.model, FakeWeights("w3".into()));
        assert_eq!(bundle.manifest.version, "w3");
    }

    #[test]
    fn test_failed_publish_leaves_current_untouched() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let good  = publish(&store, "w1", "v1").unwrap();

        assert!(publish(&store, "fail", "v2").is_err());

        assert_eq!(store.current_dir().unwrap(), good);
        assert_eq!(store.load_manifest().unwrap().version, "v1");

        // no staging leftovers
        let leftovers: Vec<_> = fs::read_dir(dir.path().join(ARTIFACTS_DIR))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".staging-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_missing_component_fails_whole_load() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let path  = publish(&store, "w1", "v1").unwrap();

        fs::remove_file(path.join(CATEGORY_INDEX_FILE)).unwrap();
        assert!(store.load::<FakeWeights>().is_err());
    }

    #[test]
    fn test_load_without_publish_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ArtifactStore::new(dir.path()).load::<FakeWeights>().is_err());
    }

    #[test]
    fn test_resolve_version_prefers_explicit() {
        assert_eq!(resolve_version(Some("2024-06".into())), "2024-06");
        let fallback = resolve_version(Some("  ".into()));
        assert!(!fallback.trim().is_empty());
    }
}
