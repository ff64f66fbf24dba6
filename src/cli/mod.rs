// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses command line arguments with `clap` and hands off to
// Layer 2. Two commands are supported:
//
//   1. `build-labels`   derive the index space from the training
//                       split and write pointer/gate labels
//   2. `score`          evaluate decoder probabilities on a split
//                       with the persisted index space

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, LabelArgs, ScoreArgs};

#[derive(Parser, Debug)]
#[command(
    name = "binding-tagger",
    version = "0.1.0",
    about = "Build question-token binding labels and score a decoder's tagging policy."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case; this layer only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::BuildLabels(args) => run_build_labels(args),
            Commands::Score(args)       => run_score(args),
        }
    }
}

fn run_build_labels(args: LabelArgs) -> Result<()> {
    use crate::application::label_use_case::LabelUseCase;

    tracing::info!("Building labels from: {}", args.train_path);
    let summary = LabelUseCase::new(args.into()).execute()?;

    println!(
        "Labelled {} training examples{} (action space {}).",
        summary.train_examples,
        summary
            .dev_examples
            .map(|n| format!(" and {n} dev examples"))
            .unwrap_or_default(),
        summary.index_space.action_space_size()
    );
    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<()> {
    use crate::application::score_use_case::ScoreUseCase;

    let m = ScoreUseCase::new(args.into()).execute()?;
    println!(
        "\n{} ({} examples)\n  accuracy     {:.4}\n  mean reward  {:.4}\n  PG loss      {:.4}\n  pointer NLL  {:.4}\n  pointer acc  {:.4}\n  gate acc     {:.4}",
        m.split, m.examples, m.accuracy, m.mean_reward, m.pg_loss, m.pointer_nll, m.pointer_acc, m.gate_acc
    );
    Ok(())
}
