// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// LoadFailure       artifact missing/corrupt at startup; the
//                   service stays up in no-prediction mode
// PredictionFailure runtime error while scoring; the caller
//                   gets "no prediction" for that call/batch
// TrainingFailure   anything from data collection to fitting;
//                   the run aborts and nothing is published
//
// Inference absorbs its failures, training surfaces them.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stages of one training run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainStage {
    CollectingData,
    BuildingVocabulary,
    EncodingExamples,
    Training,
    Persisting,
    Done,
}

impl fmt::Display for TrainStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrainStage::CollectingData     => "collecting data",
            TrainStage::BuildingVocabulary => "building vocabulary",
            TrainStage::EncodingExamples   => "encoding examples",
            TrainStage::Training           => "training",
            TrainStage::Persisting         => "persisting",
            TrainStage::Done               => "done",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum CategorizeError {
    #[error("Model artifact could not be loaded: {0}")]
    Load(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Training run failed while {stage}: {message}")]
    Training { stage: TrainStage, message: String },

    /// A persisted table that breaks its own invariants
    #[error("Invalid data: {0}")]
    Data(String),
}

impl CategorizeError {
    /// The stage a training failure happened in, if this is one
    pub fn failed_stage(&self) -> Option<TrainStage> {
        match self {
            CategorizeError::Training { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_error_message_names_stage() {
        let err = CategorizeError::Training {
            stage:   TrainStage::EncodingExamples,
            message: "bad label".to_string(),
        };
        assert_eq!(err.to_string(), "Training run failed while encoding examples: bad label");
        assert_eq!(err.failed_stage(), Some(TrainStage::EncodingExamples));
        assert_eq!(CategorizeError::Load("x".into()).failed_stage(), None);
    }
}
