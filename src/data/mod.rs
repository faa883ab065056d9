// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between exported records and tensor batches.
//
//   transactions.json / feedback.json
//       │
//       ▼
//   JsonStore         → reads the records (TransactionStore)
//       │
//       ▼
//   Tokenizer         → description → lowercase word tokens
//       │
//       ▼
//   Vocabulary        → token → 1-based index, rebuilt per run
//   CategoryIndex     → category id ↔ class index, rebuilt per run
//       │
//       ▼
//   SequenceEncoder   → tokens → [u32; 50], OOV dropped, 0-padded
//       │
//       ▼
//   splitter          → seeded 80/20 train/validation split
//       │
//       ▼
//   CategoryDataset   → Burn Dataset
//   CategoryBatcher   → Burn Batcher, stacks tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads transactions, feedback and categories
pub mod loader;

/// Lowercase word tokenizer
pub mod tokenizer;

/// Token → index table
pub mod vocabulary;

/// Token list → fixed-length sequence
pub mod encoder;

/// Category id ↔ class index bijection
pub mod category_index;

/// Implements Burn's Dataset trait for encoded samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
