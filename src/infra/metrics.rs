// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one row per scoring run to artifacts/metrics.csv:
//
//   split,examples,accuracy,mean_reward,pg_loss,pointer_nll,pointer_acc,gate_acc
//   dev,8421,0.804922,0.412300,1.873100,0.318200,0.951000,0.972400
//
//   accuracy     fraction of examples whose greedy tagging matches
//                the SQL structure exactly
//   mean_reward  average sampled reward in [-1, 1]
//   pg_loss      REINFORCE loss of the sampled rollouts
//   pointer_nll  mean NLL of the pointer labels
//   pointer_acc  token-level agreement of greedy actions with labels
//   gate_acc     token-level agreement of the decoded gate class

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetrics {
    pub split:       String,
    pub examples:    usize,
    pub accuracy:    f64,
    pub mean_reward: f64,
    pub pg_loss:     f64,
    pub pointer_nll: f64,
    pub pointer_acc: f64,
    pub gate_acc:    f64,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "split,examples,accuracy,mean_reward,pg_loss,pointer_nll,pointer_acc,gate_acc")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }
        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &ScoreMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.split, m.examples, m.accuracy, m.mean_reward, m.pg_loss, m.pointer_nll, m.pointer_acc, m.gate_acc,
        )?;
        tracing::debug!("Logged {} metrics: accuracy={:.4}", m.split, m.accuracy);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
