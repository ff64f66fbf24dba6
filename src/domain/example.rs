// ============================================================
// Layer 3 — Example Domain Type
// ============================================================
// One question paired with one table, already tokenised and
// annotated upstream. Each question token carries a role label:
//
//   "<unk>"     → refers to nothing
//   "Column_k"  → names column k
//   "Value_k"   → is part of cell value k
//
// Column and cell marker counts describe how many separator
// markers delimit this table's column / cell regions.

use std::str::FromStr;

use crate::domain::error::BindingError;
use crate::domain::index_space::Reference;
use crate::domain::sql::SqlTarget;

pub const UNK_LABEL: &str = "<unk>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleLabel {
    Unknown,
    Column(usize),
    Value(usize),
}

impl RoleLabel {
    pub fn reference(self) -> Reference {
        match self {
            RoleLabel::Unknown   => Reference::None,
            RoleLabel::Column(k) => Reference::Column(k),
            RoleLabel::Value(k)  => Reference::Value(k),
        }
    }
}

impl FromStr for RoleLabel {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == UNK_LABEL {
            return Ok(RoleLabel::Unknown);
        }
        let invalid = || BindingError::InvalidLabel(s.to_string());
        let (kind, ordinal) = s.split_once('_').ok_or_else(invalid)?;
        let ordinal: usize = ordinal.parse().map_err(|_| invalid())?;
        match kind {
            "Column" => Ok(RoleLabel::Column(ordinal)),
            "Value"  => Ok(RoleLabel::Value(ordinal)),
            _        => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    /// Table identifier, kept for traceability only
    pub table_id: Option<String>,

    /// Question tokens
    pub tokens: Vec<String>,

    /// One role per token, or empty when the example is unlabelled
    pub labels: Vec<RoleLabel>,

    pub columns_split_marker_len: usize,
    pub cells_split_marker_len:   usize,

    pub target: SqlTarget,
}

impl Example {
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_labelled(&self) -> bool {
        !self.labels.is_empty()
    }

    /// The sizes that feed into `IndexSpaceConfig::from_split_maxima`.
    pub fn index_sizes(&self) -> (usize, usize, usize) {
        (self.token_count(), self.columns_split_marker_len, self.cells_split_marker_len)
    }
}
