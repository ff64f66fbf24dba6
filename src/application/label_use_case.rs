// ============================================================
// Layer 2 — LabelUseCase
// ============================================================
// Builds pointer + gate labels for the training split and, when
// given, the dev split:
//
//   Step 1: Load the training split            (Layer 4 - data)
//   Step 2: Index space from its labelled rows (Layer 3 - domain)
//   Step 3: Persist index space + run config   (Layer 6 - infra)
//   Step 4: Label train                        (Layer 4 - data)
//   Step 5: Label dev with the SAME index space
//   Step 6: Write one label file per split     (Layer 6 - infra)
//
// The index space is derived from train only. The dev split is
// labelled against it, so a dev example that needs a wider region
// than train ever saw fails loudly instead of being re-indexed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{dataset::BindingDataset, loader::JsonlLoader};
use crate::domain::{
    index_space::{IndexSpaceConfig, LabelVariant},
    traits::ExampleSource,
};
use crate::infra::store::ArtifactStore;

// ─── Label Configuration ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    pub train_path:    String,
    pub dev_path:      Option<String>,
    pub artifacts_dir: String,
    pub variant:       LabelVariant,
    /// Skip examples that carry no role labels
    pub only_label:    bool,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            train_path:    "data/train.jsonl".to_string(),
            dev_path:      None,
            artifacts_dir: "artifacts".to_string(),
            variant:       LabelVariant::GateRelative { cell_info: false },
            only_label:    true,
        }
    }
}

/// What a labelling run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSummary {
    pub index_space:    IndexSpaceConfig,
    pub train_examples: usize,
    pub dev_examples:   Option<usize>,
}

// ─── LabelUseCase ─────────────────────────────────────────────────────────────
pub struct LabelUseCase {
    config: LabelConfig,
}

impl LabelUseCase {
    pub fn new(config: LabelConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<LabelSummary> {
        let cfg = &self.config;

        // ── Step 1: Load the training split ──────────────────────────────────
        let train = JsonlLoader::new(&cfg.train_path, cfg.only_label).load_all()?;
        tracing::info!("Loaded {} training examples from '{}'", train.len(), cfg.train_path);

        // ── Step 2: Index space from the labelled training maxima ────────────
        // Unlabelled rows kept by `only_label = false` never widen it.
        let index_space = IndexSpaceConfig::from_split_maxima(
            cfg.variant,
            train.iter().filter(|e| e.is_labelled()).map(|e| e.index_sizes()),
        )
        .context("Cannot derive an index space from the labelled training examples")?;
        tracing::info!(
            "Index space: T={}, C={}, V={}, K={}",
            index_space.tokenize_max_len,
            index_space.column_slots(),
            index_space.value_slots(),
            index_space.action_space_size()
        );

        // ── Step 3: Persist before labelling ─────────────────────────────────
        let store = ArtifactStore::new(&cfg.artifacts_dir)?;
        store.save_index_space(&index_space)?;
        store.save_label_config(cfg)?;

        // ── Step 4: Label train ──────────────────────────────────────────────
        let train_ds = BindingDataset::build(&train, index_space)
            .with_context(|| format!("Labelling '{}' failed", cfg.train_path))?;
        store.write_labels("train", &train_ds.labels())?;

        // ── Step 5/6: Label dev against the training index space ─────────────
        let dev_examples = match &cfg.dev_path {
            Some(path) => {
                let dev = JsonlLoader::new(path, cfg.only_label).load_all()?;
                let dev_ds = BindingDataset::build(&dev, index_space)
                    .with_context(|| format!("Labelling '{path}' failed"))?;
                store.write_labels("dev", &dev_ds.labels())?;
                Some(dev_ds.sample_count())
            }
            None => None,
        };

        Ok(LabelSummary {
            index_space,
            train_examples: train_ds.sample_count(),
            dev_examples,
        })
    }
}
