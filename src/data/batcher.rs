// ============================================================
// Layer 4 — Category Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks a Vec<CategorySample>
// into the tensors one training step consumes.
//
//   sequences : [batch, max_len]  Int    token indices
//   targets   : [batch, classes]  Float  one-hot labels (loss)
//   labels    : [batch]           Int    class indices (accuracy)
//
// Every sample is already padded to max_len by the encoder, so
// the flat buffers reshape directly.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::CategorySample;

#[derive(Debug, Clone)]
pub struct CategoryBatch<B: Backend> {
    pub sequences: Tensor<B, 2, Int>,
    pub targets:   Tensor<B, 2>,
    pub labels:    Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct CategoryBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> CategoryBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<CategorySample, CategoryBatch<B>> for CategoryBatcher<B> {
    fn batch(&self, items: Vec<CategorySample>) -> CategoryBatch<B> {
        let batch_size  = items.len();
        let seq_len     = items.first().map_or(0, |s| s.sequence.len());
        let num_classes = items.first().map_or(0, |s| s.target.len());

        let sequence_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.sequence.iter().map(|&x| x as i32))
            .collect();

        let target_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.target.iter().copied())
            .collect();

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let sequences = Tensor::<B, 1, Int>::from_ints(
            sequence_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let targets = Tensor::<B, 1>::from_floats(
            target_flat.as_slice(), &self.device
        ).reshape([batch_size, num_classes]);

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        CategoryBatch { sequences, targets, labels }
    }
}
