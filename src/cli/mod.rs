// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
//   1. `train`   — trains on a JSON export and publishes an artifact
//   2. `predict` — loads the artifact and categorizes descriptions
//   3. `info`    — prints the loaded model's metadata as JSON
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InfoArgs, PredictArgs, TrainArgs};
use std::collections::HashMap;

use transaction_categorizer::{
    data::loader::JsonStore,
    domain::traits::TransactionStore,
    infra::artifact::ArtifactStore,
    ml::{inferencer::BurnClassifier, trainer::BurnTrainer},
    CategorizerService, ServiceState, TrainConfig, TrainUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "categorizer",
    version = "0.1.0",
    about = "Learn spending categories from labelled transactions, then categorize new ones."
)]
pub struct Cli {
    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case; the CLI only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Info(args)    => run_info(args),
        }
    }
}

/// Handles the `train` subcommand.
fn run_train(args: TrainArgs) -> Result<()> {
    let config: TrainConfig = args.into();
    tracing::info!("Training on records in: {}", config.data_dir);

    let store     = JsonStore::new(&config.data_dir);
    let artifacts = ArtifactStore::new(&config.artifact_dir);
    let trainer   = BurnTrainer::new(config.trainer_settings());

    let report = TrainUseCase::new(config).execute(&store, &trainer, &artifacts)?;

    if let Some(last) = report.epochs.last() {
        println!(
            "Final epoch {}: train loss {:.4}, train acc {:.3}, val loss {:.4}, val acc {:.3}",
            last.epoch, last.train_loss, last.train_acc, last.val_loss, last.val_acc
        );
    }
    println!(
        "Published version '{}' to {} ({} examples incl. {} corrections, {} tokens, {} categories)",
        report.version,
        report.artifact_dir.display(),
        report.example_count,
        report.correction_count,
        report.vocabulary_size,
        report.category_count,
    );
    Ok(())
}

/// Handles the `predict` subcommand.
/// A missing or broken model is not an error: every line reads <no prediction>.
fn run_predict(args: PredictArgs) -> Result<()> {
    let service: CategorizerService<BurnClassifier> =
        CategorizerService::load(&ArtifactStore::new(&args.artifact_dir), args.model_version);
    if let ServiceState::LoadFailed(reason) = service.state() {
        eprintln!("Model unavailable, no predictions will be made: {reason}");
    }

    let names = args.data_dir.as_deref().map(category_names).unwrap_or_default();

    let predictions = if args.descriptions.len() == 1 {
        vec![service.predict_single(&args.descriptions[0])]
    } else {
        service.predict_batch(&args.descriptions)
    };

    for (description, prediction) in args.descriptions.iter().zip(predictions) {
        match prediction {
            Some(id) => match names.get(&id) {
                Some(name) => println!("{description}\t{id}\t{name}"),
                None       => println!("{description}\t{id}"),
            },
            None => println!("{description}\t<no prediction>"),
        }
    }
    Ok(())
}

/// Handles the `info` subcommand.
fn run_info(args: InfoArgs) -> Result<()> {
    let service: CategorizerService<BurnClassifier> =
        CategorizerService::load(&ArtifactStore::new(&args.artifact_dir), args.model_version);
    println!("{}", serde_json::to_string_pretty(&service.metadata())?);
    Ok(())
}

/// Category id → display name; an unreadable table just means no names.
fn category_names(data_dir: &str) -> HashMap<String, String> {
    match JsonStore::new(data_dir).categories() {
        Ok(categories) => categories.into_iter().map(|c| (c.id, c.name)).collect(),
        Err(e) => {
            tracing::warn!("Cannot read category names: {e:#}");
            HashMap::new()
        }
    }
}
