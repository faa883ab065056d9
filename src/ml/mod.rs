// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All burn-specific code lives in this layer.
//
//   model.rs      — embedding-bag classifier:
//                   • token embeddings (16 dims, row 0 = padding)
//                   • mean pooling over all 50 positions
//                   • one linear layer → softmax over K classes
//
//   trainer.rs    — the ModelTrainer seam and the burn training
//                   loop: forward pass, one-hot cross-entropy,
//                   backward pass, Adam step, per-epoch metrics
//
//   inferencer.rs — BurnClassifier: scores encoded batches and
//                   saves/loads its weights in an artifact dir
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Embedding-bag classifier architecture
pub mod model;

/// Training loop with validation telemetry
pub mod trainer;

/// Inference wrapper implementing Classifier + Persistable
pub mod inferencer;
