//! The `Regressor` trait and the serialized model artifact.

use super::lstm::{LstmArtifact, LstmNetwork};
use super::trees::TreeEnsemble;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// One fitted regression model: a scaled [L, C] window in, one scaled
/// target value out.
pub trait Regressor: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn predict(&self, window: ArrayView2<f64>) -> f64;
}

impl Regressor for LstmNetwork {
    fn name(&self) -> &'static str {
        "lstm"
    }

    fn predict(&self, window: ArrayView2<f64>) -> f64 {
        self.forward(window)
    }
}

impl Regressor for TreeEnsemble {
    fn name(&self) -> &'static str {
        "gradient_boosted"
    }

    /// Trees see the window flattened row-major: input `t * C + c` is
    /// column `c` of step `t`.
    fn predict(&self, window: ArrayView2<f64>) -> f64 {
        let flat: Vec<f64> = window.iter().copied().collect();
        self.eval(&flat)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressorBody {
    Lstm(LstmArtifact),
    GradientBoosted(TreeEnsemble),
}

/// Contents of a `{id}_model.json` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressorArtifact {
    pub lookback: usize,
    pub n_features: usize,
    pub model: RegressorBody,
}

impl RegressorArtifact {
    /// Validate shapes and build the runnable model.
    pub fn into_regressor(self) -> Result<Box<dyn Regressor>, String> {
        if self.lookback == 0 {
            return Err("lookback must be positive".into());
        }
        match self.model {
            RegressorBody::Lstm(art) => {
                let net = LstmNetwork::from_artifact(&art, self.n_features)?;
                Ok(Box::new(net))
            }
            RegressorBody::GradientBoosted(ensemble) => {
                ensemble.validate(self.lookback * self.n_features)?;
                Ok(Box::new(ensemble))
            }
        }
    }
}
