//! Fixed-length trailing window of feature rows, the unit a model consumes.

use super::{FeatureRow, FEATURE_COUNT};
use chrono::NaiveDate;
use ndarray::Array2;

/// The last `len` rows of a feature table, oldest first.
#[derive(Debug, Clone, Copy)]
pub struct FeatureWindow<'a> {
    rows: &'a [FeatureRow],
}

impl<'a> FeatureWindow<'a> {
    /// Trailing window of exactly `len` rows. `None` when `len` is zero or the
    /// table is shorter than `len`.
    pub fn trailing(rows: &'a [FeatureRow], len: usize) -> Option<Self> {
        if len == 0 || rows.len() < len {
            return None;
        }
        Some(Self {
            rows: &rows[rows.len() - len..],
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &'a [FeatureRow] {
        self.rows
    }

    pub fn last_date(&self) -> NaiveDate {
        self.rows[self.rows.len() - 1].date
    }

    /// Copy the window into a `[len, FEATURE_COUNT]` matrix.
    pub fn to_matrix(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.rows.len(), FEATURE_COUNT));
        for (mut dst, row) in out.rows_mut().into_iter().zip(self.rows) {
            for (d, v) in dst.iter_mut().zip(row.values()) {
                *d = *v;
            }
        }
        out
    }
}
