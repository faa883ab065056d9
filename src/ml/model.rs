use burn::{
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{log_softmax, softmax},
};

/// Embedding width of every vocabulary row
pub const EMBEDDING_DIM: usize = 16;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, adding them again gives conflicting impls.
#[derive(Config, Debug)]
pub struct CategoryModelConfig {
    /// Vocabulary size + 1; row 0 is the padding index
    pub vocab_rows:    usize,
    pub num_classes:   usize,
    #[config(default = 16)]
    pub embedding_dim: usize,
}

impl CategoryModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CategoryModel<B> {
        let embedding = EmbeddingConfig::new(self.vocab_rows, self.embedding_dim).init(device);
        let output    = LinearConfig::new(self.embedding_dim, self.num_classes).init(device);
        CategoryModel { embedding, output }
    }
}

/// Bag-of-tokens classifier:
///   embedding lookup → mean over all positions → linear → softmax
///
/// Padding positions are averaged in like any other index, so the
/// pooled vector depends on the token multiset and the pad count,
/// never on token order.
#[derive(Module, Debug)]
pub struct CategoryModel<B: Backend> {
    pub embedding: Embedding<B>,
    pub output:    Linear<B>,
}

impl<B: Backend> CategoryModel<B> {
    /// sequences: [batch, seq_len] → logits: [batch, num_classes]
    pub fn forward(&self, sequences: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, _] = sequences.dims();

        let embedded = self.embedding.forward(sequences); // [batch, seq_len, dim]
        let [_, _, dim] = embedded.dims();
        let pooled = embedded.mean_dim(1).reshape([batch_size, dim]);

        self.output.forward(pooled)
    }

    /// sequences: [batch, seq_len] → probabilities: [batch, num_classes]
    pub fn forward_probabilities(&self, sequences: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        softmax(self.forward(sequences), 1)
    }

    /// Mean cross-entropy against one-hot targets [batch, num_classes].
    /// Returns (loss [1], logits [batch, num_classes]).
    pub fn forward_loss(
        &self,
        sequences: Tensor<B, 2, Int>,
        targets:   Tensor<B, 2>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits    = self.forward(sequences);
        let log_probs = log_softmax(logits.clone(), 1);
        let loss = (log_probs * targets)
            .sum_dim(1)
            .mean()
            .neg();
        (loss, logits)
    }
}
