// ============================================================
// Layer 5 — Inferencer
// ============================================================
// The trained burn model behind the Classifier trait.
//
// Files written into an artifact directory:
//   model_config.json   CategoryModelConfig (rebuild architecture)
//   model.mpk.gz        CompactRecorder weights
//
// The config must be read first: the weights can only be loaded
// into a model with exactly the same shape.
use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::path::Path;

use crate::domain::traits::{Classifier, Persistable};
use crate::ml::model::{CategoryModel, CategoryModelConfig};

pub type InferBackend = NdArray;

pub const MODEL_CONFIG_FILE: &str = "model_config.json";
/// CompactRecorder appends ".mpk.gz"
pub const WEIGHTS_STEM:      &str = "model";
pub const WEIGHTS_FILE:      &str = "model.mpk.gz";

#[derive(Debug)]
pub struct BurnClassifier {
    model:  CategoryModel<InferBackend>,
    config: CategoryModelConfig,
    device: NdArrayDevice,
}

impl BurnClassifier {
    pub fn new(
        model:  CategoryModel<InferBackend>,
        config: CategoryModelConfig,
        device: NdArrayDevice,
    ) -> Self {
        Self { model, config, device }
    }

    pub fn config(&self) -> &CategoryModelConfig {
        &self.config
    }
}

impl Classifier for BurnClassifier {
    fn num_classes(&self) -> usize {
        self.config.num_classes
    }

    fn predict_proba(&self, sequences: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
        if sequences.is_empty() {
            return Ok(Vec::new());
        }

        let classes = self.config.num_classes;
        anyhow::ensure!(classes > 0, "model has no output classes");

        let batch_size = sequences.len();
        let seq_len    = sequences[0].len();
        anyhow::ensure!(seq_len > 0, "sequences must not be empty");
        anyhow::ensure!(
            sequences.iter().all(|s| s.len() == seq_len),
            "all sequences in a batch must have length {seq_len}"
        );

        // An index past the embedding table would panic inside the backend
        let rows = self.config.vocab_rows as u32;
        if let Some(bad) = sequences.iter().flatten().find(|&&idx| idx >= rows) {
            anyhow::bail!("token index {bad} outside embedding table of {rows} rows");
        }

        let flat: Vec<i32> = sequences
            .iter()
            .flat_map(|s| s.iter().map(|&x| x as i32))
            .collect();
        let input = Tensor::<InferBackend, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        let probs: Vec<f32> = self
            .model
            .forward_probabilities(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read probabilities: {e:?}"))?;

        tracing::debug!("Scored {} sequences over {} classes", batch_size, classes);
        Ok(probs.chunks(classes).map(<[f32]>::to_vec).collect())
    }
}

impl Persistable for BurnClassifier {
    fn save(&self, dir: &Path) -> Result<()> {
        let config_path = dir.join(MODEL_CONFIG_FILE);
        self.config
            .save(&config_path)
            .with_context(|| format!("Cannot write model config to '{}'", config_path.display()))?;

        let weights_path = dir.join(WEIGHTS_STEM);
        CompactRecorder::new()
            .record(self.model.clone().into_record(), weights_path.clone())
            .with_context(|| format!("Failed to save weights to '{}'", weights_path.display()))?;

        tracing::debug!("Saved model weights into '{}'", dir.display());
        Ok(())
    }

    fn load(dir: &Path) -> Result<Self> {
        let device = NdArrayDevice::default();

        let config_path = dir.join(MODEL_CONFIG_FILE);
        let config = CategoryModelConfig::load(&config_path)
            .map_err(|e| anyhow::anyhow!("Cannot read model config '{}': {e:?}", config_path.display()))?;

        let weights_file = dir.join(WEIGHTS_FILE);
        anyhow::ensure!(weights_file.exists(), "Weights file '{}' is missing", weights_file.display());

        let record = CompactRecorder::new()
            .load(dir.join(WEIGHTS_STEM), &device)
            .with_context(|| format!("Cannot load weights '{}'", weights_file.display()))?;

        let model: CategoryModel<InferBackend> = config.init(&device);
        let model = model.load_record(record);
        tracing::info!(
            "Model loaded: vocab_rows={}, classes={}",
            config.vocab_rows, config.num_classes
        );

        Ok(Self { model, config, device })
    }
}
