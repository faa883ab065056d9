// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands `train`, `predict` and `info`
// and all their configurable flags.
//
// The embedding width and the sequence length are fixed by the
// model architecture and have no flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use transaction_categorizer::TrainConfig;

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a categorizer on exported transactions and feedback
    Train(TrainArgs),

    /// Predict categories for one or more descriptions
    Predict(PredictArgs),

    /// Show metadata of the published model artifact
    Info(InfoArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory with transactions.json, feedback.json, categories.json
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Directory the model artifact is published into
    #[arg(long, default_value = "model")]
    pub artifact_dir: String,

    /// Version label of the new artifact
    /// (default: $CATEGORIZER_MODEL_VERSION, else "unversioned")
    #[arg(long)]
    pub model_version: Option<String>,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 30)]
    pub epochs: usize,

    /// Number of examples per optimizer step
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-2)]
    pub lr: f64,

    /// Seed for weight init, shuffling and the validation split
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Share of examples used for fitting; the rest is validation
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:       a.data_dir,
            artifact_dir:   a.artifact_dir,
            version:        a.model_version,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            seed:           a.seed,
            train_fraction: a.train_fraction,
            ..TrainConfig::default()
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Transaction descriptions to categorize
    #[arg(required = true)]
    pub descriptions: Vec<String>,

    /// Directory the model artifact was published into
    #[arg(long, default_value = "model")]
    pub artifact_dir: String,

    /// Version label to report for the loaded artifact
    #[arg(long)]
    pub model_version: Option<String>,

    /// Directory with categories.json, used to print category names
    #[arg(long)]
    pub data_dir: Option<String>,
}

/// All arguments for the `info` command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Directory the model artifact was published into
    #[arg(long, default_value = "model")]
    pub artifact_dir: String,

    /// Version label to report for the loaded artifact
    #[arg(long)]
    pub model_version: Option<String>,
}
