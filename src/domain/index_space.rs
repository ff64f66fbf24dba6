// ============================================================
// Layer 3 — Index Space
// ============================================================
// Flattens three kinds of reference a question token can make
// into one integer action space shared by labels and policies:
//
//   none      → the token refers to nothing in the table
//   column k  → the token names column k
//   value k   → the token is part of cell value k
//
// Two layouts exist and exactly one is used per run:
//
//   GateRelative     [ none | col 0 .. col C-1 | val 0 .. val V-1 ]
//                      0      1 ..                1+C ..
//
//   BaselineAbsolute [ pos 0 .. pos T-1 | col 0 .. | val 0 .. ]
//                      a "none" token points at its own position
//
// where T = tokenize_max_len, C = columns_split_marker_max_len - 1
// and V = cells_split_marker_max_len - 1 (N+1 markers delimit N items).
//
// With GateRelative { cell_info: false } all values collapse onto
// the single code 1 + C.

use serde::{Deserialize, Serialize};

use crate::domain::error::BindingError;

/// Padding value for labels, actions and absent SQL slots.
pub const SENTINEL: i64 = -100;

/// Which flat layout the run uses. Chosen once, never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LabelVariant {
    GateRelative { cell_info: bool },
    BaselineAbsolute,
}

/// What a single question token refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    None,
    Column(usize),
    Value(usize),
}

/// Coarse 3-way class of a reference, independent of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateLabel {
    None   = 0,
    Column = 1,
    Value  = 2,
}

impl GateLabel {
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl Reference {
    pub fn gate(self) -> GateLabel {
        match self {
            Reference::None      => GateLabel::None,
            Reference::Column(_) => GateLabel::Column,
            Reference::Value(_)  => GateLabel::Value,
        }
    }
}

/// Dimensions of the flat action space.
///
/// Computed once from the training split and reused verbatim for every
/// other split: a policy trained against one set of region widths is
/// meaningless against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpaceConfig {
    pub variant:                      LabelVariant,
    pub tokenize_max_len:             usize,
    pub columns_split_marker_max_len: usize,
    pub cells_split_marker_max_len:   usize,
}

impl IndexSpaceConfig {
    pub fn new(
        variant:                      LabelVariant,
        tokenize_max_len:             usize,
        columns_split_marker_max_len: usize,
        cells_split_marker_max_len:   usize,
    ) -> Result<Self, BindingError> {
        if tokenize_max_len == 0 {
            return Err(BindingError::InvalidConfig(
                "tokenize_max_len must be at least 1".into(),
            ));
        }
        if columns_split_marker_max_len == 0 || cells_split_marker_max_len == 0 {
            return Err(BindingError::InvalidConfig(format!(
                "marker counts must be at least 1 (columns={columns_split_marker_max_len}, \
                 cells={cells_split_marker_max_len})"
            )));
        }
        Ok(Self {
            variant,
            tokenize_max_len,
            columns_split_marker_max_len,
            cells_split_marker_max_len,
        })
    }

    /// Take the maxima of `(token_count, column_markers, cell_markers)`
    /// over a split.
    pub fn from_split_maxima<I>(variant: LabelVariant, sizes: I) -> Result<Self, BindingError>
    where
        I: IntoIterator<Item = (usize, usize, usize)>,
    {
        let (t, c, v) = sizes
            .into_iter()
            .fold((0, 0, 0), |(t, c, v), (ti, ci, vi)| (t.max(ti), c.max(ci), v.max(vi)));
        Self::new(variant, t, c, v)
    }

    /// Number of addressable columns.
    pub fn column_slots(&self) -> usize {
        self.columns_split_marker_max_len - 1
    }

    /// Number of addressable cell values.
    pub fn value_slots(&self) -> usize {
        self.cells_split_marker_max_len - 1
    }

    fn column_offset(&self) -> usize {
        match self.variant {
            LabelVariant::GateRelative { .. } => 1,
            LabelVariant::BaselineAbsolute    => self.tokenize_max_len,
        }
    }

    fn value_offset(&self) -> usize {
        self.column_offset() + self.column_slots()
    }

    /// Width `K` of every probability row the policies consume.
    pub fn action_space_size(&self) -> usize {
        let value_codes = match self.variant {
            LabelVariant::GateRelative { cell_info: false } => 1,
            _ => self.value_slots(),
        };
        self.value_offset() + value_codes
    }

    /// Flat label and gate label for the token at `position`.
    pub fn encode(&self, position: usize, reference: Reference) -> Result<(i64, GateLabel), BindingError> {
        let flat = match reference {
            Reference::None => match self.variant {
                LabelVariant::GateRelative { .. } => 0,
                LabelVariant::BaselineAbsolute => {
                    if position >= self.tokenize_max_len {
                        return Err(BindingError::LabelOutOfRange(format!(
                            "token position {position} >= tokenize_max_len {}",
                            self.tokenize_max_len
                        )));
                    }
                    position
                }
            },
            Reference::Column(k) => {
                if k >= self.column_slots() {
                    return Err(BindingError::LabelOutOfRange(format!(
                        "column {k} outside {} column slots",
                        self.column_slots()
                    )));
                }
                self.column_offset() + k
            }
            Reference::Value(k) => {
                if k >= self.value_slots() {
                    return Err(BindingError::LabelOutOfRange(format!(
                        "value {k} outside {} value slots",
                        self.value_slots()
                    )));
                }
                match self.variant {
                    LabelVariant::GateRelative { cell_info: false } => self.value_offset(),
                    _ => self.value_offset() + k,
                }
            }
        };
        Ok((flat as i64, reference.gate()))
    }

    /// Inverse of [`encode`](Self::encode) by range membership.
    ///
    /// Returns `None` for the sentinel and anything outside the space.
    /// A baseline "none" action does not carry its position back out.
    pub fn decode(&self, action: i64) -> Option<Reference> {
        if action < 0 {
            return None;
        }
        let a = action as usize;
        if a >= self.action_space_size() {
            None
        } else if a < self.column_offset() {
            Some(Reference::None)
        } else if a < self.value_offset() {
            Some(Reference::Column(a - self.column_offset()))
        } else {
            Some(Reference::Value(a - self.value_offset()))
        }
    }

    /// Fail fast when two halves of the pipeline disagree on widths.
    pub fn ensure_matches(&self, other: &IndexSpaceConfig) -> Result<(), BindingError> {
        if self != other {
            return Err(BindingError::ConfigMismatch(format!(
                "expected {self:?}, found {other:?}"
            )));
        }
        Ok(())
    }

    pub fn ensure_action_space(&self, classes: usize) -> Result<(), BindingError> {
        if classes != self.action_space_size() {
            return Err(BindingError::ConfigMismatch(format!(
                "probability rows have {classes} classes, index space expects {}",
                self.action_space_size()
            )));
        }
        Ok(())
    }
}
