// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, built on clap.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   — fits the sentence model, transplants it into
//                  the document model, and fits that too
//   2. `explain` — loads a checkpoint, predicts each document,
//                  and prints its supporting sentences

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ExplainArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "rationale-cnn",
    version = "0.1.0",
    about = "Train a rationale-augmented CNN on labeled documents, then explain its predictions."
)]
pub struct Cli {
    /// The subcommand to run (train or explain)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => Self::run_train(args),
            Commands::Explain(args) => Self::run_explain(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("starting training on corpus: {}", args.data_path);

        // Convert CLI args → application config
        let use_case = TrainUseCase::new(args.into());
        use_case.execute()?;

        println!("Training complete. Checkpoints saved.");
        Ok(())
    }

    fn run_explain(args: ExplainArgs) -> Result<()> {
        use crate::application::explain_use_case::ExplainUseCase;

        let use_case = ExplainUseCase::new(&args.checkpoint_dir, args.top_k)?;
        let predictions = use_case.explain(&args.data_path)?;

        for prediction in predictions {
            println!(
                "\n{} → {} (p={:.3})",
                prediction.doc_id,
                if prediction.label == 1 { "positive" } else { "negative" },
                prediction.probability,
            );
            for rationale in &prediction.rationales {
                println!(
                    "  [{:>2}] {:.3}  {}",
                    rationale.index, rationale.score, rationale.sentence,
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_dispatch_reports_missing_checkpoint() {
        let cli = Cli::try_parse_from([
            "rationale-cnn",
            "explain",
            "--data-path",
            "corpus.csv",
            "--checkpoint-dir",
            "/nonexistent/checkpoints",
        ])
        .unwrap();

        // Consuming dispatch must reach the use case and surface its
        // error rather than failing to hand the args over.
        assert!(cli.run().is_err());
    }
}
