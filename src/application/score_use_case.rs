// ============================================================
// Layer 2 — ScoreUseCase
// ============================================================
// Scores a decoder's output on one split without touching the
// decoder itself. The decoder's per-position probabilities come
// from a JSON lines file aligned 1:1 with the (filtered) split.
//
//   Step 1: Load the persisted index space     (Layer 6 - infra)
//   Step 2: Load + label the split             (Layer 4 - data)
//   Step 3: Load the aligned predictions       (Layer 4 - data)
//   Step 4: Per batch:
//             greedy accuracy                  (Layer 5 - ml)
//             m sampled rewards + REINFORCE    (Layer 5 - ml)
//             pointer NLL                      (Layer 5 - ml)
//             token-level pointer/gate agreement
//   Step 5: Log + append a metrics row         (Layer 6 - infra)

use anyhow::{bail, Context, Result};
use burn::data::{dataloader::batcher::Batcher, dataset::Dataset};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::BindingBatcher,
    dataset::{BindingDataset, BindingSample},
    loader::{load_predictions, JsonlLoader},
};
use crate::domain::{index_space::IndexSpaceConfig, traits::ExampleSource};
use crate::infra::{
    metrics::{MetricsLogger, ScoreMetrics},
    store::ArtifactStore,
};
use crate::ml::{
    objective::{pointer_nll_loss, reinforce_loss},
    policy::{Policy, ProbabilityGrid},
    HostBackend,
};

// ─── Score Configuration ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreConfig {
    pub data_path:        String,
    pub predictions_path: String,
    pub artifacts_dir:    String,
    /// Name written to the metrics row
    pub split:            String,
    pub batch_size:       usize,
    pub seed:             u64,
    /// Sampled sequences per example
    pub samples:          usize,
    pub only_label:       bool,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            data_path:        "data/dev.jsonl".to_string(),
            predictions_path: "data/dev_probs.jsonl".to_string(),
            artifacts_dir:    "artifacts".to_string(),
            split:            "dev".to_string(),
            batch_size:       512,
            seed:             1,
            samples:          1,
            only_label:       true,
        }
    }
}

// ─── Token agreement ──────────────────────────────────────────────────────────
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Agreement {
    pointer: usize,
    gate:    usize,
    total:   usize,
}

impl Agreement {
    /// Compare greedy actions with the labels at every labelled position.
    fn add(&mut self, actions: &[Vec<i64>], samples: &[BindingSample], space: &IndexSpaceConfig) {
        for (row, sample) in actions.iter().zip(samples) {
            let labelled = row
                .iter()
                .zip(&sample.pointer_label)
                .zip(&sample.gate_label)
                .take(sample.length)
                .filter(|((_, &p), _)| p >= 0);
            for ((&a, &p), &g) in labelled {
                self.total += 1;
                if a == p {
                    self.pointer += 1;
                }
                if space.decode(a).map(|r| r.gate().code()) == Some(g) {
                    self.gate += 1;
                }
            }
        }
    }

    fn rate(hits: usize, total: usize) -> f64 {
        if total == 0 { 0.0 } else { hits as f64 / total as f64 }
    }
}

// ─── ScoreUseCase ─────────────────────────────────────────────────────────────
pub struct ScoreUseCase {
    config: ScoreConfig,
}

impl ScoreUseCase {
    pub fn new(config: ScoreConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ScoreMetrics> {
        let cfg = &self.config;
        if cfg.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }

        // ── Step 1: Index space is loaded, never recomputed ──────────────────
        let store       = ArtifactStore::new(&cfg.artifacts_dir)?;
        let index_space = store.load_index_space()?;
        let classes     = index_space.action_space_size();

        // ── Step 2: Split ────────────────────────────────────────────────────
        let examples = JsonlLoader::new(&cfg.data_path, cfg.only_label).load_all()?;
        let dataset  = BindingDataset::build(&examples, index_space)
            .with_context(|| format!("Labelling '{}' failed", cfg.data_path))?;

        // ── Step 3: Predictions ──────────────────────────────────────────────
        let predictions = load_predictions(&cfg.predictions_path)?;
        if predictions.len() != dataset.len() {
            bail!(
                "'{}' has {} rows but '{}' has {} examples",
                cfg.predictions_path,
                predictions.len(),
                cfg.data_path,
                dataset.len()
            );
        }
        tracing::info!(
            "Scoring {} examples from '{}' (K={classes}, m={})",
            dataset.len(),
            cfg.data_path,
            cfg.samples
        );

        // ── Step 4: Batches ──────────────────────────────────────────────────
        let device  = <HostBackend as Backend>::Device::default();
        let batcher = BindingBatcher::<HostBackend>::new(device, index_space);
        let mut policy = Policy::new(index_space, cfg.seed);

        let mut correct      = 0.0f64;
        let mut reward_sum   = 0.0f64;
        let mut reward_count = 0usize;
        let mut pg_sum       = 0.0f64;
        let mut nll_sum      = 0.0f64;
        let mut agreement    = Agreement::default();

        let indices: Vec<usize> = (0..dataset.len()).collect();
        for chunk in indices.chunks(cfg.batch_size) {
            let samples: Vec<BindingSample> = chunk.iter().filter_map(|&i| dataset.get(i)).collect();
            let rows: Vec<Vec<Vec<f32>>> = chunk.iter().map(|&i| predictions[i].clone()).collect();
            let lengths: Vec<usize> = samples.iter().map(|s| s.length).collect();

            let grid  = ProbabilityGrid::from_rows(&rows, &lengths, index_space.tokenize_max_len, classes)
                .with_context(|| format!("Predictions for examples {:?}", chunk.first()))?;
            let probs = grid.to_tensor::<HostBackend>(&batcher.device);
            let batch = batcher.batch(samples.clone());

            let batch_size = batch.batch_size();

            let greedy = policy.greedy_batch(probs.clone(), &batch)?;
            correct += greedy.accuracy.iter().map(|&a| a as f64).sum::<f64>();

            for draw in policy.sample_batch(probs.clone(), &batch, cfg.samples)? {
                reward_sum   += draw.rewards.iter().map(|&r| r as f64).sum::<f64>();
                reward_count += draw.rewards.len();
                let pg = reinforce_loss(probs.clone(), &draw.actions, &draw.rewards)?
                    .into_scalar()
                    .elem::<f32>();
                pg_sum += pg as f64 * draw.rewards.len() as f64;
            }

            let before = agreement.total;
            agreement.add(&greedy.actions, &samples, &index_space);
            let labelled = agreement.total - before;
            let nll = pointer_nll_loss(probs, batch.pointer_labels)?
                .into_scalar()
                .elem::<f32>();
            nll_sum += nll as f64 * labelled as f64;

            tracing::debug!(
                "Batch of {}: accuracy {:.4}, nll {:.4}",
                batch_size,
                greedy.accuracy.iter().sum::<f32>() / batch_size.max(1) as f32,
                nll
            );
        }

        // ── Step 5: Metrics ──────────────────────────────────────────────────
        let n = dataset.len();
        let metrics = ScoreMetrics {
            split:       cfg.split.clone(),
            examples:    n,
            accuracy:    Agreement::rate(correct as usize, n),
            mean_reward: if reward_count == 0 { 0.0 } else { reward_sum / reward_count as f64 },
            pg_loss:     if reward_count == 0 { 0.0 } else { pg_sum / reward_count as f64 },
            pointer_nll: if agreement.total == 0 { 0.0 } else { nll_sum / agreement.total as f64 },
            pointer_acc: Agreement::rate(agreement.pointer, agreement.total),
            gate_acc:    Agreement::rate(agreement.gate, agreement.total),
        };
        tracing::info!(
            "{}: accuracy={:.4} mean_reward={:.4} pg_loss={:.4} pointer_nll={:.4} pointer_acc={:.4} gate_acc={:.4}",
            metrics.split,
            metrics.accuracy,
            metrics.mean_reward,
            metrics.pg_loss,
            metrics.pointer_nll,
            metrics.pointer_acc,
            metrics.gate_acc
        );

        let logger = MetricsLogger::new(store.dir())?;
        logger.log(&metrics)?;
        tracing::info!("Appended metrics to '{}'", logger.csv_path().display());
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::index_space::LabelVariant;
    use std::{fs, io::Write, path::Path};
    use tempfile::tempdir;

    fn write_lines(path: &Path, lines: &[String]) {
        let mut f = fs::File::create(path).unwrap();
        for l in lines {
            writeln!(f, "{l}").unwrap();
        }
    }

    // T=3, C=3, V=2 → K = 1 + 3 + 2 = 6 (gate layout with cell info)
    fn space() -> IndexSpaceConfig {
        IndexSpaceConfig::new(LabelVariant::GateRelative { cell_info: true }, 3, 4, 3).unwrap()
    }

    // "which team won": sel column 1, value token 2 spans [2, 3)
    const EXAMPLE: &str = r#"{"tokenize":["which","team","won"],"label":["<unk>","Column_1","Value_0"],"columns_split_marker_len":4,"cells_split_marker_len":3,"cells_split_len":5,"sql":{"sel":1},"sql_index":{"conds":[[1,0,[2,3]]]}}"#;

    fn one_hot(k: usize) -> Vec<f32> {
        let mut row = vec![0.0; 6];
        row[k] = 1.0;
        row
    }

    fn setup(dir: &Path, probs: Vec<Vec<f32>>) -> ScoreConfig {
        let store = ArtifactStore::new(dir.join("artifacts")).unwrap();
        store.save_index_space(&space()).unwrap();
        write_lines(&dir.join("dev.jsonl"), &[EXAMPLE.to_string()]);
        write_lines(
            &dir.join("probs.jsonl"),
            &[serde_json::json!({ "probs": probs }).to_string()],
        );
        ScoreConfig {
            data_path:        dir.join("dev.jsonl").display().to_string(),
            predictions_path: dir.join("probs.jsonl").display().to_string(),
            artifacts_dir:    dir.join("artifacts").display().to_string(),
            ..ScoreConfig::default()
        }
    }

    #[test]
    fn test_perfect_predictions_score_one() {
        let dir = tempdir().unwrap();
        // none, column 1 (index 2), value 0 (index 4)
        let cfg = setup(dir.path(), vec![one_hot(0), one_hot(2), one_hot(4)]);

        let m = ScoreUseCase::new(cfg).execute().unwrap();
        assert_eq!(m.examples, 1);
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.mean_reward, 1.0);
        assert!(m.pg_loss.abs() < 1e-6);
        assert_eq!(m.pointer_acc, 1.0);
        assert_eq!(m.gate_acc, 1.0);
        assert!(m.pointer_nll.abs() < 1e-6);
        assert!(dir.path().join("artifacts/metrics.csv").exists());
    }

    #[test]
    fn test_wrong_column_scores_zero_but_keeps_gate() {
        let dir = tempdir().unwrap();
        // column 0 instead of column 1: same gate, wrong pointer
        let cfg = setup(dir.path(), vec![one_hot(0), one_hot(1), one_hot(4)]);

        let m = ScoreUseCase::new(cfg).execute().unwrap();
        assert_eq!(m.accuracy, 0.0);
        assert_eq!(m.mean_reward, -1.0);
        assert!((m.pointer_acc - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(m.gate_acc, 1.0);
    }

    #[test]
    fn test_pg_loss_of_always_failing_rollouts() {
        let dir = tempdir().unwrap();
        // first token is column 0 or column 2, never the selected column 1
        let mut split = vec![0.0; 6];
        split[1] = 0.5;
        split[3] = 0.5;
        let cfg = setup(dir.path(), vec![split, one_hot(0), one_hot(4)]);

        let m = ScoreUseCase::new(ScoreConfig { samples: 3, ..cfg }).execute().unwrap();
        assert_eq!(m.mean_reward, -1.0);
        // -(ln 0.5 * -1)
        assert!((m.pg_loss - 0.5f64.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let cfg = setup(dir.path(), vec![vec![0.5, 0.5]; 3]);
        assert!(ScoreUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_predictions_shorter_than_question_are_rejected() {
        let dir = tempdir().unwrap();
        // three question tokens, one prediction row
        let cfg = setup(dir.path(), vec![one_hot(0)]);
        assert!(ScoreUseCase::new(cfg).execute().is_err());
        assert!(!dir.path().join("artifacts/metrics.csv").exists());
    }

    #[test]
    fn test_prediction_count_must_match_split() {
        let dir = tempdir().unwrap();
        let cfg = setup(dir.path(), vec![one_hot(0); 3]);
        write_lines(&dir.path().join("probs.jsonl"), &[]);
        assert!(ScoreUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_missing_index_space_is_an_error() {
        let dir = tempdir().unwrap();
        let cfg = ScoreConfig {
            artifacts_dir: dir.path().join("empty").display().to_string(),
            ..ScoreConfig::default()
        };
        assert!(ScoreUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_agreement_skips_padding() {
        let space   = space();
        let sample  = BindingSample {
            pointer_label: vec![0, 2, -100],
            gate_label:    vec![0, 1, -100],
            length:        2,
            target:        crate::domain::sql::SqlTarget::new(1, vec![], vec![]),
        };
        let mut agreement = Agreement::default();
        agreement.add(&[vec![0, 3, -100]], &[sample], &space);
        assert_eq!(agreement, Agreement { pointer: 1, gate: 2, total: 2 });
    }
}
