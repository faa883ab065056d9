// ============================================================
// Layer 2 — CategorizerService (Inference Service)
// ============================================================
// Owns one loaded artifact for the life of the process:
//
//   Unloaded ──initialize──▶ Loading ──▶ Ready
//                                   └──▶ LoadFailed(reason)
//
// LoadFailed is terminal: there is no retry and no hot reload. A
// new artifact takes effect only in a freshly constructed service.
//
// Predictions never fail loudly. Whenever the service is not Ready,
// or anything goes wrong in tokenize → encode → forward → decode,
// the caller gets None. A batch is scored in one forward pass and
// fails as a whole.
//
// All prediction methods take &self; the loaded artifact is never
// mutated after Ready, so concurrent readers need no locking.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data::{
    category_index::CategoryIndex,
    encoder::{SequenceEncoder, MAX_SEQ_LEN},
    tokenizer::Tokenizer,
    vocabulary::Vocabulary,
};
use crate::domain::error::CategorizeError;
use crate::domain::traits::{Classifier, Persistable};
use crate::domain::transaction::CategoryId;
use crate::infra::artifact::{supplied_version, ArtifactStore, FALLBACK_VERSION};

/// Lifecycle of a service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ServiceState {
    Unloaded,
    Loading,
    Ready,
    LoadFailed(String),
}

/// Snapshot returned by `metadata()`; available in every state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetadata {
    pub version:         String,
    /// Captured when the artifact finished loading
    pub load_timestamp:  Option<DateTime<Utc>>,
    pub is_ready:        bool,
    pub vocabulary_size: usize,
    pub category_count:  usize,
}

struct LoadedArtifact<C> {
    classifier:     C,
    vocabulary:     Vocabulary,
    category_index: CategoryIndex,
}

pub struct CategorizerService<C: Classifier> {
    state:            ServiceState,
    loaded:           Option<LoadedArtifact<C>>,
    /// Label given by the caller or $CATEGORIZER_MODEL_VERSION
    version:          Option<String>,
    /// Label recorded in the loaded artifact's manifest
    artifact_version: Option<String>,
    loaded_at:        Option<DateTime<Utc>>,
    tokenizer:        Tokenizer,
    encoder:          SequenceEncoder,
}

impl<C: Classifier> CategorizerService<C> {
    /// An Unloaded service. `version` falls back to
    /// $CATEGORIZER_MODEL_VERSION, then to the artifact's own label,
    /// then "unversioned".
    pub fn new(version: Option<String>) -> Self {
        Self {
            state:            ServiceState::Unloaded,
            loaded:           None,
            version:          supplied_version(version),
            artifact_version: None,
            loaded_at:        None,
            tokenizer:        Tokenizer::new(),
            encoder:          SequenceEncoder::new(MAX_SEQ_LEN),
        }
    }

    /// A Ready service around already-loaded components.
    pub fn from_parts(
        classifier:     C,
        vocabulary:     Vocabulary,
        category_index: CategoryIndex,
        version:        Option<String>,
    ) -> std::result::Result<Self, CategorizeError> {
        let mut service = Self::new(version);
        service.initialize(|| Ok((classifier, vocabulary, category_index)))?;
        Ok(service)
    }

    /// One-time blocking load. Only an Unloaded service loads; any
    /// later call is refused without touching the current state.
    pub fn initialize<F>(&mut self, load: F) -> std::result::Result<(), CategorizeError>
    where
        F: FnOnce() -> Result<(C, Vocabulary, CategoryIndex)>,
    {
        if self.state != ServiceState::Unloaded {
            return Err(CategorizeError::Load(format!(
                "service already initialized (state {:?})",
                self.state
            )));
        }

        self.state = ServiceState::Loading;
        tracing::info!("Loading categorizer model (version {})", self.version_label());

        match load().and_then(check_components) {
            Ok((classifier, vocabulary, category_index)) => {
                tracing::info!(
                    "Categorizer ready: {} tokens, {} categories",
                    vocabulary.len(), category_index.len()
                );
                self.loaded    = Some(LoadedArtifact { classifier, vocabulary, category_index });
                self.loaded_at = Some(Utc::now());
                self.state     = ServiceState::Ready;
                Ok(())
            }
            Err(e) => {
                let reason = format!("{e:#}");
                tracing::error!("Categorizer model failed to load, predictions disabled: {reason}");
                self.state = ServiceState::LoadFailed(reason.clone());
                Err(CategorizeError::Load(reason))
            }
        }
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ServiceState::Ready
    }

    /// Category of one description, or None when no prediction can be made
    pub fn predict_single(&self, description: &str) -> Option<CategoryId> {
        self.predict_batch(&[description]).pop().flatten()
    }

    /// Categories for many descriptions, same length and order as the
    /// input. One forward pass; if it fails every element is None.
    pub fn predict_batch<S: AsRef<str>>(&self, descriptions: &[S]) -> Vec<Option<CategoryId>> {
        let Some(artifact) = self.loaded.as_ref().filter(|_| self.is_ready()) else {
            tracing::debug!("Prediction requested while {:?}", self.state);
            return vec![None; descriptions.len()];
        };
        if descriptions.is_empty() {
            return Vec::new();
        }

        match self.score(artifact, descriptions) {
            Ok(categories) => categories.into_iter().map(Some).collect(),
            Err(e) => {
                let e = CategorizeError::Prediction(format!("{e:#}"));
                tracing::warn!("{e} ({} descriptions)", descriptions.len());
                vec![None; descriptions.len()]
            }
        }
    }

    /// Never fails
    pub fn metadata(&self) -> ModelMetadata {
        let (vocabulary_size, category_count) = self
            .loaded
            .as_ref()
            .map_or((0, 0), |a| (a.vocabulary.len(), a.category_index.len()));

        ModelMetadata {
            version:        self.version_label(),
            load_timestamp: self.loaded_at,
            is_ready:       self.is_ready(),
            vocabulary_size,
            category_count,
        }
    }

    fn version_label(&self) -> String {
        self.version
            .as_ref()
            .or(self.artifact_version.as_ref())
            .map_or_else(|| FALLBACK_VERSION.to_string(), String::clone)
    }

    fn score<S: AsRef<str>>(
        &self,
        artifact:     &LoadedArtifact<C>,
        descriptions: &[S],
    ) -> Result<Vec<CategoryId>> {
        // ── Step 1: tokenize + encode ──────────────────────────────────────
        let tokens    = self.tokenizer.tokenize_batch(descriptions);
        let sequences = self.encoder.encode_batch(&tokens, &artifact.vocabulary);

        // ── Step 2: one forward pass ───────────────────────────────────────
        let rows = artifact.classifier.predict_proba(&sequences)?;
        anyhow::ensure!(
            rows.len() == sequences.len(),
            "model returned {} rows for {} inputs",
            rows.len(), sequences.len()
        );

        // ── Step 3: argmax → category id ───────────────────────────────────
        let classes = artifact.category_index.len();
        rows.iter()
            .map(|row| {
                anyhow::ensure!(
                    row.len() == classes,
                    "probability row has {} entries, expected {classes}",
                    row.len()
                );
                anyhow::ensure!(row.iter().all(|p| p.is_finite()), "non-finite probability");

                let class = argmax(row).ok_or_else(|| anyhow::anyhow!("empty probability row"))?;
                artifact
                    .category_index
                    .decode(class)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("class {class} missing from category index"))
            })
            .collect()
    }
}

impl<C: Classifier + Persistable> CategorizerService<C> {
    /// Build a service and load the current artifact from `store`.
    /// Always returns a service; a failed load leaves it LoadFailed.
    pub fn load(store: &ArtifactStore, version: Option<String>) -> Self {
        let mut service = Self::new(version);
        let mut manifest_version = None;

        let outcome = service.initialize(|| {
            let bundle = store.load::<C>()?;
            manifest_version = Some(bundle.manifest.version);
            Ok((bundle.model, bundle.vocabulary, bundle.category_index))
        });

        match outcome {
            Ok(()) => service.artifact_version = manifest_version,
            // already recorded in the state; the service stays usable
            Err(e) => tracing::debug!("Serving without a model: {e}"),
        }
        service
    }
}

fn check_components<C: Classifier>(
    (classifier, vocabulary, category_index): (C, Vocabulary, CategoryIndex),
) -> Result<(C, Vocabulary, CategoryIndex)> {
    anyhow::ensure!(!category_index.is_empty(), "category index is empty");
    anyhow::ensure!(
        classifier.num_classes() == category_index.len(),
        "model scores {} classes but category index has {}",
        classifier.num_classes(), category_index.len()
    );
    Ok((classifier, vocabulary, category_index))
}

/// Index of the highest probability; ties go to the lowest index
fn argmax(row: &[f32]) -> Option<usize> {
    row.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })
        .map(|(i, _)| i)
}
