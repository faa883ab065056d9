// ============================================================
// Layer 2 — TrainUseCase (Training Orchestrator)
// ============================================================
// Runs one training job end to end:
//
//   CollectingData      read transactions + feedback; every
//                       transaction is an example, every
//                       correction (predicted ≠ actual) adds
//                       (description, actual)
//   BuildingVocabulary  tokenize; build Vocabulary and
//                       CategoryIndex from exactly this corpus
//   EncodingExamples    fixed-length sequences + one-hot labels,
//                       seeded train/validation split
//   Training            fixed epoch budget (ModelTrainer)
//   Persisting          publish weights + vocabulary + index as
//                       one artifact (ArtifactStore)
//   Done
//
// Any error moves the run to Failed: the caller gets
// CategorizeError::Training naming the stage, and no artifact is
// published. Runs are not retried.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::data::{
    category_index::CategoryIndex,
    dataset::CategorySample,
    encoder::{SequenceEncoder, MAX_SEQ_LEN},
    splitter::split_train_val,
    tokenizer::Tokenizer,
    vocabulary::Vocabulary,
};
use crate::domain::error::{CategorizeError, TrainStage};
use crate::domain::traits::TransactionStore;
use crate::domain::transaction::{Category, ExampleOrigin, Feedback, Transaction, TrainingExample};
use crate::infra::artifact::{resolve_version, ArtifactContents, ArtifactManifest, ArtifactStore};
use crate::infra::metrics::EpochMetrics;
use crate::ml::model::EMBEDDING_DIM;
use crate::ml::trainer::{ModelTrainer, TrainerSettings, TrainingSet};

// ─── Training Configuration ──────────────────────────────────────────────────
// Fixed for the duration of one run; saved into the artifact as
// train_config.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:       String,
    pub artifact_dir:   String,
    /// Version label; falls back to $CATEGORIZER_MODEL_VERSION, then "unversioned"
    pub version:        Option<String>,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub seed:           u64,
    pub train_fraction: f64,
    pub embedding_dim:  usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:       "data".to_string(),
            artifact_dir:   "model".to_string(),
            version:        None,
            batch_size:     32,
            epochs:         30,
            lr:             1e-2,
            seed:           42,
            train_fraction: 0.8,
            embedding_dim:  EMBEDDING_DIM,
        }
    }
}

impl TrainConfig {
    pub fn trainer_settings(&self) -> TrainerSettings {
        TrainerSettings {
            epochs:        self.epochs,
            batch_size:    self.batch_size,
            lr:            self.lr,
            seed:          self.seed,
            embedding_dim: self.embedding_dim,
        }
    }
}

/// Summary of a successful run
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub version:          String,
    pub trained_at:       DateTime<Utc>,
    pub example_count:    usize,
    pub correction_count: usize,
    pub vocabulary_size:  usize,
    pub category_count:   usize,
    pub epochs:           Vec<EpochMetrics>,
    pub artifact_dir:     PathBuf,
}

// ─── Corpus Collection ────────────────────────────────────────────────────────
/// Build the training corpus: every transaction in order, followed
/// by one example per correction, labelled with the actual category.
///
/// Feedback that agrees with the prediction carries no new signal and
/// is skipped. A correction pointing at an unknown transaction is an
/// error.
pub fn collect_examples(
    transactions: &[Transaction],
    feedback:     &[Feedback],
) -> Result<Vec<TrainingExample>> {
    let descriptions: HashMap<&str, &str> = transactions
        .iter()
        .map(|t| (t.id.as_str(), t.description_text()))
        .collect();

    let mut examples: Vec<TrainingExample> = transactions
        .iter()
        .map(|t| TrainingExample::new(t.description_text(), t.category.clone(), ExampleOrigin::Transaction))
        .collect();

    for fb in feedback.iter().filter(|f| f.is_correction()) {
        let description = descriptions.get(fb.transaction_id.as_str()).with_context(|| {
            format!("Feedback references unknown transaction '{}'", fb.transaction_id)
        })?;
        examples.push(TrainingExample::new(
            *description,
            fb.actual_category.clone(),
            ExampleOrigin::Correction,
        ));
    }

    Ok(examples)
}

/// Distinct example labels missing from a non-empty category table,
/// in first-seen order.
pub fn unknown_labels<'a>(examples: &'a [TrainingExample], categories: &[Category]) -> Vec<&'a str> {
    if categories.is_empty() {
        return Vec::new();
    }
    let known: HashSet<&str> = categories.iter().map(|c| c.id.as_str()).collect();
    let mut reported = HashSet::new();
    examples
        .iter()
        .map(|e| e.label.as_str())
        .filter(|label| !known.contains(label) && reported.insert(*label))
        .collect()
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end.
    pub fn execute<T: ModelTrainer>(
        &self,
        store:     &dyn TransactionStore,
        trainer:   &T,
        artifacts: &ArtifactStore,
    ) -> Result<TrainReport, CategorizeError> {
        let mut stage = TrainStage::CollectingData;
        tracing::info!("Training run started: {stage}");

        self.run(&mut stage, store, trainer, artifacts).map_err(|e| {
            tracing::error!("Training run failed while {stage}: {e:#}");
            CategorizeError::Training { stage, message: format!("{e:#}") }
        })
    }

    fn run<T: ModelTrainer>(
        &self,
        stage:     &mut TrainStage,
        store:     &dyn TransactionStore,
        trainer:   &T,
        artifacts: &ArtifactStore,
    ) -> Result<TrainReport> {
        let cfg = &self.config;

        // ── Step 1: Collect transactions + corrective feedback ───────────────
        anyhow::ensure!(
            cfg.train_fraction > 0.0 && cfg.train_fraction <= 1.0,
            "train fraction must be in (0, 1], got {}",
            cfg.train_fraction
        );
        let transactions = store.transactions().context("Cannot read transactions")?;
        let feedback     = store.feedback().context("Cannot read feedback")?;
        let categories   = store.categories().context("Cannot read categories")?;

        let examples    = collect_examples(&transactions, &feedback)?;
        let corrections = examples.iter().filter(|e| e.origin == ExampleOrigin::Correction).count();
        anyhow::ensure!(!examples.is_empty(), "No transactions to learn from");
        tracing::info!(
            "Collected {} examples ({} transactions, {} corrections out of {} feedback records)",
            examples.len(), transactions.len(), corrections, feedback.len()
        );

        for label in unknown_labels(&examples, &categories) {
            tracing::warn!("Label '{label}' is not in the category table");
        }

        // ── Step 2: Tokenize, build vocabulary + category index ──────────────
        advance(stage, TrainStage::BuildingVocabulary);
        let tokenizer = Tokenizer::new();
        let descriptions: Vec<&str> = examples.iter().map(|e| e.description.as_str()).collect();
        let token_lists = tokenizer.tokenize_batch(&descriptions);

        let vocabulary     = Vocabulary::build(&token_lists);
        let category_index = CategoryIndex::build(examples.iter().map(|e| e.label.as_str()));
        tracing::info!(
            "Vocabulary: {} tokens, categories: {}",
            vocabulary.len(), category_index.len()
        );

        // ── Step 3: Encode sequences + one-hot labels, split ─────────────────
        advance(stage, TrainStage::EncodingExamples);
        let encoder = SequenceEncoder::new(MAX_SEQ_LEN);
        let samples = encoder
            .encode_batch(&token_lists, &vocabulary)
            .into_iter()
            .zip(&examples)
            .map(|(sequence, ex)| labelled_sample(&category_index, sequence, ex))
            .collect::<Result<Vec<_>>>()?;

        let (train, valid) = split_train_val(samples, cfg.train_fraction, cfg.seed);
        tracing::info!("Split: {} train, {} validation", train.len(), valid.len());

        // ── Step 4: Fit the model ─────────────────────────────────────────────
        advance(stage, TrainStage::Training);
        let (model, history) = trainer.fit(TrainingSet {
            train,
            valid,
            vocab_rows:  vocabulary.embedding_rows(),
            num_classes: category_index.len(),
        })?;

        // ── Step 5: Publish the artifact atomically ──────────────────────────
        advance(stage, TrainStage::Persisting);
        let manifest = ArtifactManifest {
            version:          resolve_version(cfg.version.clone()),
            trained_at:       Utc::now(),
            vocabulary_size:  vocabulary.len(),
            category_count:   category_index.len(),
            embedding_dim:    cfg.embedding_dim,
            max_seq_len:      MAX_SEQ_LEN,
            example_count:    examples.len(),
            correction_count: corrections,
        };
        let artifact_dir = artifacts.publish(ArtifactContents {
            model:          &model,
            vocabulary:     &vocabulary,
            category_index: &category_index,
            manifest:       &manifest,
            train_config:   cfg,
            metrics:        &history,
        })?;

        advance(stage, TrainStage::Done);
        Ok(TrainReport {
            version:          manifest.version,
            trained_at:       manifest.trained_at,
            example_count:    manifest.example_count,
            correction_count: manifest.correction_count,
            vocabulary_size:  manifest.vocabulary_size,
            category_count:   manifest.category_count,
            epochs:           history,
            artifact_dir,
        })
    }
}

fn advance(stage: &mut TrainStage, next: TrainStage) {
    tracing::info!("Training stage: {} → {}", stage, next);
    *stage = next;
}

fn labelled_sample(
    category_index: &CategoryIndex,
    sequence:       Vec<u32>,
    example:        &TrainingExample,
) -> Result<CategorySample> {
    let label = category_index
        .index_of(&example.label)
        .with_context(|| format!("Label '{}' missing from category index", example.label))?;
    let target = category_index
        .one_hot(&example.label)
        .with_context(|| format!("Cannot one-hot encode '{}'", example.label))?;

    Ok(CategorySample { sequence, label, target })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::categorizer::{CategorizerService, ModelMetadata};
    use crate::data::loader::InMemoryStore;
    use crate::domain::traits::{Classifier, Persistable};
    use std::{cell::RefCell, fs, path::Path};

    /// Weights stand-in that only remembers its class count and
    /// scores every sequence uniformly
    #[derive(Debug)]
    struct StubModel(usize);

    impl Persistable for StubModel {
        fn save(&self, dir: &Path) -> Result<()> {
            fs::write(dir.join("stub.txt"), self.0.to_string())?;
            Ok(())
        }

        fn load(dir: &Path) -> Result<Self> {
            Ok(Self(fs::read_to_string(dir.join("stub.txt"))?.trim().parse()?))
        }
    }

    impl Classifier for StubModel {
        fn num_classes(&self) -> usize {
            self.0
        }

        fn predict_proba(&self, sequences: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0 / self.0 as f32; self.0]; sequences.len()])
        }
    }

    /// Records what it was asked to fit
    #[derive(Default)]
    struct RecordingTrainer {
        seen: RefCell<Option<TrainingSet>>,
    }

    impl ModelTrainer for RecordingTrainer {
        type Model = StubModel;

        fn fit(&self, data: TrainingSet) -> Result<(StubModel, Vec<EpochMetrics>)> {
            let model = StubModel(data.num_classes);
            *self.seen.borrow_mut() = Some(data);
            Ok((model, vec![EpochMetrics::new(1, 0.7, 0.5, 0.8, 0.5)]))
        }
    }

    struct FailingTrainer;

    impl ModelTrainer for FailingTrainer {
        type Model = StubModel;

        fn fit(&self, _data: TrainingSet) -> Result<(StubModel, Vec<EpochMetrics>)> {
            anyhow::bail!("loss became NaN")
        }
    }

    fn config(version: &str) -> TrainConfig {
        TrainConfig { version: Some(version.to_string()), ..TrainConfig::default() }
    }

    fn coffee_and_gas() -> InMemoryStore {
        InMemoryStore::new(
            vec![
                Transaction::new("t1", "coffee shop", "FOOD"),
                Transaction::new("t2", "gas station", "TRANSPORT"),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn test_corpus_is_transactions_plus_corrections() {
        let transactions: Vec<Transaction> = (0..5)
            .map(|i| Transaction::new(format!("t{i}"), format!("shop {i}"), "FOOD"))
            .collect();
        let feedback = vec![
            Feedback::new("t0", "FOOD", "FOOD"),
            Feedback::new("t1", "FOOD", "HOME"),
            Feedback::new("t2", "FOOD", "FOOD"),
            Feedback::new("t3", "TRAVEL", "FOOD"),
        ];

        let examples = collect_examples(&transactions, &feedback).unwrap();
        // N = 5, P = 2
        assert_eq!(examples.len(), 7);

        let corrections: Vec<&TrainingExample> = examples
            .iter()
            .filter(|e| e.origin == ExampleOrigin::Correction)
            .collect();
        assert_eq!(corrections.len(), 2);
        assert_eq!(corrections[0].description, "shop 1");
        assert_eq!(corrections[0].label, "HOME");
        assert_eq!(corrections[1].label, "FOOD");
    }

    #[test]
    fn test_correction_for_unknown_transaction_is_rejected() {
        let transactions = vec![Transaction::new("t1", "coffee", "FOOD")];
        let feedback     = vec![Feedback::new("t404", "FOOD", "HOME")];
        assert!(collect_examples(&transactions, &feedback).is_err());

        // agreeing feedback is ignored even if the reference dangles
        let feedback = vec![Feedback::new("t404", "FOOD", "FOOD")];
        assert_eq!(collect_examples(&transactions, &feedback).unwrap().len(), 1);
    }

    #[test]
    fn test_coffee_and_gas_vocabulary_and_index() {
        let dir       = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let trainer   = RecordingTrainer::default();

        let report = TrainUseCase::new(config("v1"))
            .execute(&coffee_and_gas(), &trainer, &artifacts)
            .unwrap();
        assert_eq!(report.example_count, 2);
        assert_eq!(report.vocabulary_size, 4);
        assert_eq!(report.category_count, 2);
        assert_eq!(report.version, "v1");

        let bundle = artifacts.load::<StubModel>().unwrap();
        assert_eq!(bundle.vocabulary.get("coffee"), Some(1));
        assert_eq!(bundle.vocabulary.get("shop"), Some(2));
        assert_eq!(bundle.vocabulary.get("gas"), Some(3));
        assert_eq!(bundle.vocabulary.get("station"), Some(4));
        assert_eq!(bundle.category_index.index_of("FOOD"), Some(0));
        assert_eq!(bundle.category_index.index_of("TRANSPORT"), Some(1));
        assert_eq!(bundle.model.0, 2);

        let seen = trainer.seen.borrow();
        let set  = seen.as_ref().unwrap();
        assert_eq!(set.vocab_rows, 5);
        assert_eq!(set.num_classes, 2);
        assert_eq!(set.train.len() + set.valid.len(), 2);
        for sample in set.train.iter().chain(&set.valid) {
            assert_eq!(sample.sequence.len(), MAX_SEQ_LEN);
            assert_eq!(sample.target.len(), 2);
            assert_eq!(sample.target[sample.label], 1.0);
        }
    }

    #[test]
    fn test_failed_run_leaves_artifact_unchanged() {
        let dir       = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        TrainUseCase::new(config("v1"))
            .execute(&coffee_and_gas(), &RecordingTrainer::default(), &artifacts)
            .unwrap();
        let before          = artifacts.load_manifest().unwrap();
        let before_dir      = artifacts.current_dir().unwrap();
        let before_metadata = served_metadata(&artifacts);
        assert!(before_metadata.is_ready);

        let mut bigger = coffee_and_gas();
        bigger.transactions.push(Transaction::new("t3", "rent payment", "HOME"));
        let err = TrainUseCase::new(config("v2"))
            .execute(&bigger, &FailingTrainer, &artifacts)
            .unwrap_err();

        assert_eq!(err.failed_stage(), Some(TrainStage::Training));
        assert!(err.to_string().contains("loss became NaN"));
        assert_eq!(artifacts.load_manifest().unwrap(), before);
        assert_eq!(artifacts.current_dir().unwrap(), before_dir);
        assert_eq!(served_metadata(&artifacts), before_metadata);
    }

    /// Metadata of a freshly loaded service, minus the load time
    fn served_metadata(artifacts: &ArtifactStore) -> ModelMetadata {
        let service: CategorizerService<StubModel> = CategorizerService::load(artifacts, None);
        ModelMetadata { load_timestamp: None, ..service.metadata() }
    }

    #[test]
    fn test_explicit_version_is_kept_even_if_it_reads_unversioned() {
        let dir       = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        TrainUseCase::new(config("2024-06"))
            .execute(&coffee_and_gas(), &RecordingTrainer::default(), &artifacts)
            .unwrap();

        let labelled: CategorizerService<StubModel> =
            CategorizerService::load(&artifacts, Some("unversioned".into()));
        assert!(labelled.is_ready());
        assert_eq!(labelled.metadata().version, "unversioned");

        assert_eq!(served_metadata(&artifacts).version, "2024-06");
    }

    #[test]
    fn test_train_fraction_is_checked_before_anything_runs() {
        let dir = tempfile::tempdir().unwrap();
        for fraction in [0.0, -0.5, 1.5, f64::NAN] {
            let cfg = TrainConfig { train_fraction: fraction, ..config("v1") };
            let err = TrainUseCase::new(cfg)
                .execute(&coffee_and_gas(), &RecordingTrainer::default(), &ArtifactStore::new(dir.path()))
                .unwrap_err();
            assert_eq!(err.failed_stage(), Some(TrainStage::CollectingData), "fraction {fraction}");
        }
        assert!(!dir.path().join(crate::infra::artifact::POINTER_FILE).exists());
    }

    #[test]
    fn test_unknown_labels_are_reported_once() {
        let examples: Vec<TrainingExample> = ["FOOD", "TRAVEL", "TRAVEL", "GIFTS", "TRAVEL"]
            .iter()
            .map(|l| TrainingExample::new("x", *l, ExampleOrigin::Transaction))
            .collect();
        let categories = vec![Category::new("FOOD", "Food")];

        assert_eq!(unknown_labels(&examples, &categories), vec!["TRAVEL", "GIFTS"]);
        // no table, nothing to compare against
        assert!(unknown_labels(&examples, &[]).is_empty());
    }

    #[test]
    fn test_empty_corpus_fails_while_collecting() {
        let dir   = tempfile::tempdir().unwrap();
        let err = TrainUseCase::new(config("v1"))
            .execute(&InMemoryStore::default(), &RecordingTrainer::default(), &ArtifactStore::new(dir.path()))
            .unwrap_err();
        assert_eq!(err.failed_stage(), Some(TrainStage::CollectingData));
        assert!(!dir.path().join(crate::infra::artifact::POINTER_FILE).exists());
    }

    #[test]
    fn test_corrections_become_training_examples() {
        let dir   = tempfile::tempdir().unwrap();
        let store = InMemoryStore::new(
            vec![
                Transaction::new("t1", "coffee shop", "FOOD"),
                Transaction::new("t2", "uber trip", "FOOD"),
            ],
            vec![
                Feedback::new("t2", "FOOD", "TRANSPORT"),
                Feedback::new("t1", "FOOD", "FOOD"),
            ],
        )
        .with_categories(vec![Category::new("FOOD", "Food"), Category::new("TRANSPORT", "Transport")]);

        let trainer = RecordingTrainer::default();
        let report  = TrainUseCase::new(config("v1"))
            .execute(&store, &trainer, &ArtifactStore::new(dir.path()))
            .unwrap();

        assert_eq!(report.example_count, 3);
        assert_eq!(report.correction_count, 1);
        assert_eq!(report.category_count, 2);
    }
}
