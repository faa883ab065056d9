use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One encoded training example: a fixed-length sequence, its class
/// index and the matching one-hot target row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySample {
    pub sequence: Vec<u32>,
    pub label:    usize,
    pub target:   Vec<f32>,
}

pub struct CategoryDataset {
    samples: Vec<CategorySample>,
}

impl CategoryDataset {
    pub fn new(samples: Vec<CategorySample>) -> Self {
        Self { samples }
    }
}

impl Dataset<CategorySample> for CategoryDataset {
    fn get(&self, index: usize) -> Option<CategorySample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
