// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full-batch-per-run training with burn's DataLoader and Adam.
//
//   - Training uses TrainBackend (Autodiff<NdArray>) for gradients
//   - model.valid() returns the model on the inner NdArray backend
//   - Validation batcher must also use the inner backend
//   - argmax(1) returns [batch, 1] so we flatten before .equal()
//
// The epoch budget is fixed. Validation loss/accuracy is logged
// and returned as telemetry; it never stops training early and
// never picks which weights are kept. The final epoch's weights
// are the model.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::ElementConversion,
};

use crate::data::batcher::CategoryBatcher;
use crate::data::dataset::{CategoryDataset, CategorySample};
use crate::domain::traits::Persistable;
use crate::infra::metrics::EpochMetrics;
use crate::ml::inferencer::BurnClassifier;
use crate::ml::model::{CategoryModel, CategoryModelConfig};

pub type TrainBackend = Autodiff<NdArray>;
type ValidBackend     = NdArray;

/// Encoded, split corpus handed to a trainer.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub train:       Vec<CategorySample>,
    pub valid:       Vec<CategorySample>,
    /// Vocabulary size + 1 (padding row)
    pub vocab_rows:  usize,
    pub num_classes: usize,
}

/// Fits a model on a training set.
///
/// Implementations:
///   - BurnTrainer → the embedding-bag classifier below
pub trait ModelTrainer {
    type Model: Persistable;

    /// Train for the full epoch budget. Returns the final model
    /// and one metrics row per epoch.
    fn fit(&self, data: TrainingSet) -> Result<(Self::Model, Vec<EpochMetrics>)>;
}

/// Fixed hyperparameters of one run
#[derive(Debug, Clone, Copy)]
pub struct TrainerSettings {
    pub epochs:        usize,
    pub batch_size:    usize,
    pub lr:            f64,
    pub seed:          u64,
    pub embedding_dim: usize,
}

pub struct BurnTrainer {
    settings: TrainerSettings,
    device:   NdArrayDevice,
}

impl BurnTrainer {
    pub fn new(settings: TrainerSettings) -> Self {
        Self { settings, device: NdArrayDevice::default() }
    }
}

impl ModelTrainer for BurnTrainer {
    type Model = BurnClassifier;

    fn fit(&self, data: TrainingSet) -> Result<(BurnClassifier, Vec<EpochMetrics>)> {
        let cfg = &self.settings;
        anyhow::ensure!(cfg.epochs > 0, "epoch count must be positive");
        anyhow::ensure!(cfg.batch_size > 0, "batch size must be positive");
        anyhow::ensure!(!data.train.is_empty(), "training split is empty");
        anyhow::ensure!(data.num_classes > 0, "no categories to learn");

        TrainBackend::seed(cfg.seed);

        // ── Build model ───────────────────────────────────────────────────────
        let model_cfg = CategoryModelConfig::new(data.vocab_rows, data.num_classes)
            .with_embedding_dim(cfg.embedding_dim);
        let mut model: CategoryModel<TrainBackend> = model_cfg.init(&self.device);
        tracing::info!(
            "Model ready: vocab_rows={}, classes={}, dim={}",
            data.vocab_rows, data.num_classes, cfg.embedding_dim
        );

        // ── Adam optimiser ────────────────────────────────────────────────────
        let mut optim = AdamConfig::new()
            .with_epsilon(1e-8)
            .init::<TrainBackend, CategoryModel<TrainBackend>>();

        // ── Data loaders ──────────────────────────────────────────────────────
        let has_valid = !data.valid.is_empty();

        let train_loader = DataLoaderBuilder::new(CategoryBatcher::<TrainBackend>::new(self.device.clone()))
            .batch_size(cfg.batch_size)
            .shuffle(cfg.seed)
            .num_workers(1)
            .build(CategoryDataset::new(data.train));

        let valid_loader = DataLoaderBuilder::new(CategoryBatcher::<ValidBackend>::new(self.device.clone()))
            .batch_size(cfg.batch_size)
            .num_workers(1)
            .build(CategoryDataset::new(data.valid));

        let mut history = Vec::with_capacity(cfg.epochs);

        // ── Epoch loop ────────────────────────────────────────────────────────
        for epoch in 1..=cfg.epochs {

            // ── Training phase ────────────────────────────────────────────────
            let mut train_loss_sum = 0.0f64;
            let mut train_batches  = 0usize;
            let mut train_correct  = 0usize;
            let mut train_total    = 0usize;

            for batch in train_loader.iter() {
                let (loss, logits) = model.forward_loss(batch.sequences, batch.targets);

                train_loss_sum += loss.clone().into_scalar().elem::<f64>();
                train_batches  += 1;
                train_total    += batch.labels.dims()[0];
                train_correct  += count_correct(logits, batch.labels);

                // Backward pass + Adam update
                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optim.step(cfg.lr, model, grads);
            }

            // ── Validation phase ──────────────────────────────────────────────
            let mut val_loss_sum = 0.0f64;
            let mut val_batches  = 0usize;
            let mut val_correct  = 0usize;
            let mut val_total    = 0usize;

            if has_valid {
                let model_valid = model.valid();
                for batch in valid_loader.iter() {
                    let (loss, logits) = model_valid.forward_loss(batch.sequences, batch.targets);
                    val_loss_sum += loss.into_scalar().elem::<f64>();
                    val_batches  += 1;
                    val_total    += batch.labels.dims()[0];
                    val_correct  += count_correct(logits, batch.labels);
                }
            }

            let metrics = EpochMetrics::new(
                epoch,
                mean(train_loss_sum, train_batches),
                ratio(train_correct, train_total),
                mean(val_loss_sum, val_batches),
                ratio(val_correct, val_total),
            );

            tracing::info!(
                "Epoch {:>3}/{} | train_loss={:.4} | train_acc={:.1}% | val_loss={:.4} | val_acc={:.1}%",
                epoch, cfg.epochs,
                metrics.train_loss, metrics.train_acc * 100.0,
                metrics.val_loss, metrics.val_acc * 100.0,
            );
            history.push(metrics);
        }

        tracing::info!("Training complete after {} epochs", cfg.epochs);
        Ok((BurnClassifier::new(model.valid(), model_cfg, self.device.clone()), history))
    }
}

/// Number of rows whose argmax equals the label
fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

fn mean(sum: f64, count: usize) -> f64 {
    if count > 0 { sum / count as f64 } else { f64::NAN }
}

fn ratio(correct: usize, total: usize) -> f64 {
    if total > 0 { correct as f64 / total as f64 } else { 0.0 }
}
