// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the `build-labels` and `score` subcommands and their
// flags. The application layer never sees clap types: each args
// struct converts into its use-case config with `From`.

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{label_use_case::LabelConfig, score_use_case::ScoreConfig};
use crate::domain::index_space::LabelVariant;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Derive the index space from the training split and write labels
    BuildLabels(LabelArgs),

    /// Score decoder probabilities on a split
    Score(ScoreArgs),
}

/// Index-space layout of the flat labels
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantArg {
    /// none=0, then columns, then values
    Gate,
    /// one "none" slot per token position, then columns, then values
    Baseline,
}

#[derive(Args, Debug)]
pub struct LabelArgs {
    /// Training split (JSON lines); the index space is derived from it
    #[arg(long, default_value = "data/train.jsonl")]
    pub train_path: String,

    /// Optional dev split, labelled with the training index space
    #[arg(long)]
    pub dev_path: Option<String>,

    /// Where index_space.json and the label files are written
    #[arg(long, default_value = "artifacts")]
    pub artifacts_dir: String,

    #[arg(long, value_enum, default_value_t = VariantArg::Gate)]
    pub variant: VariantArg,

    /// Give each cell value its own slot (gate layout only);
    /// without it every value shares one slot
    #[arg(long, default_value_t = false)]
    pub cell_info: bool,

    /// Keep examples that carry no role labels
    #[arg(long, default_value_t = false)]
    pub keep_unlabelled: bool,
}

impl From<LabelArgs> for LabelConfig {
    fn from(a: LabelArgs) -> Self {
        let variant = match a.variant {
            VariantArg::Gate     => LabelVariant::GateRelative { cell_info: a.cell_info },
            VariantArg::Baseline => LabelVariant::BaselineAbsolute,
        };
        LabelConfig {
            train_path:    a.train_path,
            dev_path:      a.dev_path,
            artifacts_dir: a.artifacts_dir,
            variant,
            only_label:    !a.keep_unlabelled,
        }
    }
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Split to score (JSON lines)
    #[arg(long, default_value = "data/dev.jsonl")]
    pub data_path: String,

    /// Decoder probabilities, one {"probs": [[..]]} line per example
    #[arg(long, default_value = "data/dev_probs.jsonl")]
    pub predictions_path: String,

    /// Directory holding index_space.json from `build-labels`
    #[arg(long, default_value = "artifacts")]
    pub artifacts_dir: String,

    /// Name written to the metrics row
    #[arg(long, default_value = "dev")]
    pub split: String,

    #[arg(long, default_value_t = 512)]
    pub batch_size: usize,

    /// Seed of the sampling RNG
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Sampled sequences per example for the mean reward
    #[arg(long, default_value_t = 1)]
    pub samples: usize,

    /// Keep examples that carry no role labels
    #[arg(long, default_value_t = false)]
    pub keep_unlabelled: bool,
}

impl From<ScoreArgs> for ScoreConfig {
    fn from(a: ScoreArgs) -> Self {
        ScoreConfig {
            data_path:        a.data_path,
            predictions_path: a.predictions_path,
            artifacts_dir:    a.artifacts_dir,
            split:            a.split,
            batch_size:       a.batch_size,
            seed:             a.seed,
            samples:          a.samples,
            only_label:       !a.keep_unlabelled,
        }
    }
}
