// ============================================================
// Layer 4 — JSON Lines Loader
// ============================================================
// Reads one split from a .jsonl file, one annotated example per
// line. Only the fields the labeller and reward need are parsed;
// everything else in the record is ignored.
//
//   {
//     "table_id": "1-10015132-11",
//     "tokenize": ["what", "position", ...],
//     "label":    ["<unk>", "Column_2", ...],
//     "columns_split_marker_len": 7,
//     "cells_split_marker_len":   12,
//     "cells_split_len":          40,
//     "sql":       { "sel": 3, ... },
//     "sql_index": { "conds": [[2, 0, [4, 6]], ...] }
//   }
//
// Filtering:
//   - only_label skips examples with no role labels
//   - examples whose table has no cell tokens are skipped

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use crate::domain::example::{Example, RoleLabel};
use crate::domain::sql::SqlTarget;
use crate::domain::traits::ExampleSource;

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    table_id: Option<String>,
    tokenize: Vec<String>,
    #[serde(default)]
    label: Vec<String>,
    columns_split_marker_len: usize,
    cells_split_marker_len: usize,
    #[serde(default)]
    cells_split_len: Option<usize>,
    sql: RawSql,
    sql_index: RawSqlIndex,
}

#[derive(Debug, Deserialize)]
struct RawSql {
    sel: i64,
}

#[derive(Debug, Deserialize)]
struct RawSqlIndex {
    #[serde(default)]
    conds: Vec<RawCond>,
}

/// `[column, operator, [start, end]]`
#[derive(Debug, Deserialize)]
struct RawCond(i64, serde_json::Value, [i64; 2]);

/// Decoder output for one example: `probs[position][action]`.
#[derive(Debug, Deserialize)]
struct PredictionRecord {
    probs: Vec<Vec<f32>>,
}

pub struct JsonlLoader {
    path:       PathBuf,
    only_label: bool,
}

impl JsonlLoader {
    pub fn new(path: impl Into<PathBuf>, only_label: bool) -> Self {
        Self { path: path.into(), only_label }
    }
}

impl ExampleSource for JsonlLoader {
    fn load_all(&self) -> Result<Vec<Example>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open split '{}'", self.path.display()))?;

        let mut examples = Vec::new();
        let mut skipped  = 0usize;

        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let raw: RawRecord = serde_json::from_str(&line).with_context(|| {
                format!("{}:{}: malformed record", self.path.display(), line_no + 1)
            })?;

            if self.only_label && raw.label.is_empty() {
                skipped += 1;
                continue;
            }
            if raw.cells_split_len == Some(0) {
                tracing::warn!(
                    "{}:{}: table has no cell tokens, skipping",
                    self.path.display(),
                    line_no + 1
                );
                skipped += 1;
                continue;
            }

            let example = into_example(raw)
                .with_context(|| format!("{}:{}", self.path.display(), line_no + 1))?;
            examples.push(example);
        }

        tracing::info!(
            "Loaded {} examples from '{}' ({} skipped)",
            examples.len(),
            self.path.display(),
            skipped
        );
        Ok(examples)
    }
}

fn into_example(raw: RawRecord) -> Result<Example> {
    let labels = raw
        .label
        .iter()
        .map(|l| l.parse::<RoleLabel>())
        .collect::<Result<Vec<_>, _>>()?;

    if !labels.is_empty() && labels.len() != raw.tokenize.len() {
        anyhow::bail!(
            "{} role labels for {} tokens",
            labels.len(),
            raw.tokenize.len()
        );
    }

    let (conds_cols, conds_values): (Vec<i64>, Vec<[i64; 2]>) = raw
        .sql_index
        .conds
        .into_iter()
        .map(|RawCond(col, _op, span)| (col, span))
        .unzip();

    Ok(Example {
        table_id: raw.table_id,
        tokens: raw.tokenize,
        labels,
        columns_split_marker_len: raw.columns_split_marker_len,
        cells_split_marker_len: raw.cells_split_marker_len,
        target: SqlTarget::new(raw.sql.sel, conds_cols, conds_values),
    })
}

/// Load a predictions file; line `i` belongs to example `i` of the split.
pub fn load_predictions(path: impl Into<PathBuf>) -> Result<Vec<Vec<Vec<f32>>>> {
    let path = path.into();
    let file = File::open(&path)
        .with_context(|| format!("Cannot open predictions '{}'", path.display()))?;

    let mut out = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: PredictionRecord = serde_json::from_str(&line).with_context(|| {
            format!("{}:{}: malformed prediction", path.display(), line_no + 1)
        })?;
        out.push(record.probs);
    }
    tracing::debug!("Loaded {} prediction rows from '{}'", out.len(), path.display());
    Ok(out)
}
