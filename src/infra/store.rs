// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Persists what must survive between the labelling run and any
// later scoring run:
//
//   artifacts/
//     index_space.json      ← widths computed from the training split
//     label_config.json     ← how the labels were built
//     train_labels.jsonl    ← one {"pointer": [...], "gate": [...]} per example
//     dev_labels.jsonl
//
// index_space.json is written once and read back verbatim; the
// scorer never recomputes it from the split it is scoring.

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::application::label_use_case::LabelConfig;
use crate::data::labeler::PointerLabels;
use crate::domain::index_space::IndexSpaceConfig;

const INDEX_SPACE_FILE: &str = "index_space.json";
const LABEL_CONFIG_FILE: &str = "label_config.json";

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Creates the directory if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create artifacts dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_index_space(&self, cfg: &IndexSpaceConfig) -> Result<()> {
        let path = self.dir.join(INDEX_SPACE_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved index space to '{}'", path.display());
        Ok(())
    }

    pub fn load_index_space(&self) -> Result<IndexSpaceConfig> {
        let path = self.dir.join(INDEX_SPACE_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read '{}'. Run 'build-labels' on the training split first.",
                path.display()
            )
        })?;
        let cfg: IndexSpaceConfig = serde_json::from_str(&json)
            .with_context(|| format!("Malformed '{}'", path.display()))?;
        // re-validate: a hand-edited file must not sneak in a zero width
        IndexSpaceConfig::new(
            cfg.variant,
            cfg.tokenize_max_len,
            cfg.columns_split_marker_max_len,
            cfg.cells_split_marker_max_len,
        )
        .map_err(Into::into)
    }

    pub fn save_label_config(&self, cfg: &LabelConfig) -> Result<()> {
        let path = self.dir.join(LABEL_CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        Ok(())
    }

    /// Write `{split}_labels.jsonl`, returning its path.
    pub fn write_labels(&self, split: &str, labels: &[PointerLabels]) -> Result<PathBuf> {
        let path = self.dir.join(format!("{split}_labels.jsonl"));
        let mut out = BufWriter::new(
            File::create(&path).with_context(|| format!("Cannot create '{}'", path.display()))?,
        );
        for l in labels {
            serde_json::to_writer(&mut out, l)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        tracing::info!("Wrote {} label rows to '{}'", labels.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::index_space::LabelVariant;
    use std::io::{BufRead, BufReader};
    use tempfile::tempdir;

    #[test]
    fn test_index_space_round_trip() {
        let dir   = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("nested/artifacts")).unwrap();
        let cfg   = IndexSpaceConfig::new(LabelVariant::BaselineAbsolute, 12, 6, 9).unwrap();
        store.save_index_space(&cfg).unwrap();
        assert_eq!(store.load_index_space().unwrap(), cfg);
    }

    #[test]
    fn test_missing_index_space_is_an_error() {
        let dir   = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        assert!(store.load_index_space().is_err());
    }

    #[test]
    fn test_zero_width_file_is_rejected() {
        let dir   = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        fs::write(
            dir.path().join(INDEX_SPACE_FILE),
            r#"{"variant":{"kind":"baseline_absolute"},"tokenize_max_len":4,"columns_split_marker_max_len":0,"cells_split_marker_max_len":2}"#,
        )
        .unwrap();
        assert!(store.load_index_space().is_err());
    }

    #[test]
    fn test_write_labels_one_row_per_example() {
        let dir   = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let rows  = vec![
            PointerLabels { pointer: vec![0, 2], gate: vec![0, 1] },
            PointerLabels { pointer: vec![1, -100], gate: vec![1, -100] },
        ];
        let path = store.write_labels("dev", &rows).unwrap();
        let lines: Vec<String> = BufReader::new(File::open(path).unwrap())
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        let back: PointerLabels = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(back, rows[1]);
    }

    #[test]
    fn test_label_config_is_written_as_json() {
        let dir   = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let cfg   = LabelConfig::default();
        store.save_label_config(&cfg).unwrap();

        let json = fs::read_to_string(dir.path().join(LABEL_CONFIG_FILE)).unwrap();
        let back: LabelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.train_path, cfg.train_path);
        assert_eq!(back.variant, cfg.variant);
    }
}
