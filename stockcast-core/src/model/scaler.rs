//! Fitted column scalers, applied but never refit.
//!
//! Two kinds are supported, both stored as per-column parameter vectors:
//!
//! - `min_max`: x' = x * scale + min, where scale = (hi - lo) / (data_max - data_min)
//!   and min = lo - data_min * scale. A constant column (zero range) uses scale = hi - lo.
//! - `standard`: x' = (x - mean) / scale. A zero scale is treated as 1.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

fn default_feature_range() -> [f64; 2] {
    [0.0, 1.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "default_feature_range")]
        feature_range: [f64; 2],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feature_names: Option<Vec<String>>,
    },
    Standard {
        mean: Vec<f64>,
        scale: Vec<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feature_names: Option<Vec<String>>,
    },
}

impl Scaler {
    /// Number of columns the scaler was fitted on.
    pub fn n_features(&self) -> usize {
        match self {
            Scaler::MinMax { data_min, .. } => data_min.len(),
            Scaler::Standard { mean, .. } => mean.len(),
        }
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        match self {
            Scaler::MinMax { feature_names, .. } | Scaler::Standard { feature_names, .. } => {
                feature_names.as_deref()
            }
        }
    }

    /// Check internal consistency: matching vector lengths, finite parameters.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.n_features();
        if n == 0 {
            return Err("scaler has no columns".into());
        }
        match self {
            Scaler::MinMax {
                data_min,
                data_max,
                feature_range,
                ..
            } => {
                if data_max.len() != n {
                    return Err(format!(
                        "data_min has {n} columns but data_max has {}",
                        data_max.len()
                    ));
                }
                if !feature_range.iter().all(|v| v.is_finite()) || feature_range[0] >= feature_range[1]
                {
                    return Err(format!("invalid feature_range {feature_range:?}"));
                }
                if !data_min.iter().chain(data_max).all(|v| v.is_finite()) {
                    return Err("non-finite min/max parameter".into());
                }
            }
            Scaler::Standard { mean, scale, .. } => {
                if scale.len() != n {
                    return Err(format!(
                        "mean has {n} columns but scale has {}",
                        scale.len()
                    ));
                }
                if !mean.iter().chain(scale).all(|v| v.is_finite()) {
                    return Err("non-finite mean/scale parameter".into());
                }
            }
        }
        if let Some(names) = self.feature_names() {
            if names.len() != n {
                return Err(format!(
                    "{} feature names recorded for {n} columns",
                    names.len()
                ));
            }
        }
        Ok(())
    }

    /// Per-column affine map (multiplier, offset) such that x' = x * m + o.
    fn column_affine(&self, col: usize) -> (f64, f64) {
        match self {
            Scaler::MinMax {
                data_min,
                data_max,
                feature_range: [lo, hi],
                ..
            } => {
                let range = data_max[col] - data_min[col];
                let range = if range == 0.0 { 1.0 } else { range };
                let scale = (hi - lo) / range;
                (scale, lo - data_min[col] * scale)
            }
            Scaler::Standard { mean, scale, .. } => {
                let s = if scale[col] == 0.0 { 1.0 } else { scale[col] };
                (1.0 / s, -mean[col] / s)
            }
        }
    }

    /// Scale every row of `m` in place. `m` must have `n_features()` columns.
    pub fn transform(&self, m: &mut Array2<f64>) {
        for (col, mut column) in m.columns_mut().into_iter().enumerate() {
            let (mul, off) = self.column_affine(col);
            column.mapv_inplace(|x| x * mul + off);
        }
    }

    /// Scale one value of column `col`.
    pub fn transform_value(&self, col: usize, x: f64) -> f64 {
        let (mul, off) = self.column_affine(col);
        x * mul + off
    }

    /// Map one scaled value of column `col` back to original units.
    pub fn inverse_value(&self, col: usize, x: f64) -> f64 {
        let (mul, off) = self.column_affine(col);
        (x - off) / mul
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn min_max() -> Scaler {
        Scaler::MinMax {
            data_min: vec![10.0, 0.0],
            data_max: vec![20.0, 0.0],
            feature_range: [0.0, 1.0],
            feature_names: None,
        }
    }

    #[test]
    fn min_max_maps_data_range_onto_feature_range() {
        let s = min_max();
        assert_eq!(s.transform_value(0, 10.0), 0.0);
        assert_eq!(s.transform_value(0, 20.0), 1.0);
        assert_eq!(s.transform_value(0, 15.0), 0.5);
        // constant column: shifted by data_min, unit scale
        assert_eq!(s.transform_value(1, 3.0), 3.0);
    }

    #[test]
    fn inverse_undoes_transform() {
        let s = Scaler::Standard {
            mean: vec![100.0],
            scale: vec![4.0],
            feature_names: None,
        };
        assert_eq!(s.transform_value(0, 108.0), 2.0);
        assert_eq!(s.inverse_value(0, 2.0), 108.0);
        assert_eq!(min_max().inverse_value(0, 0.25), 12.5);
    }

    #[test]
    fn transform_matrix_is_columnwise() {
        let mut m = array![[10.0, 5.0], [20.0, 7.0]];
        min_max().transform(&mut m);
        assert_eq!(m, array![[0.0, 5.0], [1.0, 7.0]]);
    }

    #[test]
    fn deserializes_tagged_json() {
        let s: Scaler = serde_json::from_str(
            r#"{"kind":"min_max","data_min":[1.0],"data_max":[3.0],"feature_names":["close"]}"#,
        )
        .unwrap();
        assert_eq!(s.n_features(), 1);
        assert_eq!(s.feature_names().unwrap(), ["close".to_string()]);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn validate_rejects_ragged_parameters() {
        let s = Scaler::Standard {
            mean: vec![1.0, 2.0],
            scale: vec![1.0],
            feature_names: None,
        };
        assert!(s.validate().is_err());

        let s = Scaler::MinMax {
            data_min: vec![0.0],
            data_max: vec![1.0],
            feature_range: [1.0, 0.0],
            feature_names: None,
        };
        assert!(s.validate().unwrap_err().contains("feature_range"));
    }
}
