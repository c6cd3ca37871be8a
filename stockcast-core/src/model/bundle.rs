//! A loaded, validated model bundle: regressor plus its two fitted scalers.

use super::regressor::{Regressor, RegressorArtifact};
use super::scaler::Scaler;
use crate::domain::ModelChoice;
use crate::error::ForecastError;
use crate::features::{FeatureColumn, FEATURE_COUNT};

/// Everything needed to run one model. Immutable once built.
#[derive(Debug)]
pub struct ModelBundle {
    pub choice: ModelChoice,
    /// Name of the regressor file the bundle was loaded from.
    pub artifact_name: String,
    /// BLAKE3 hex digest over the three artifact files.
    pub fingerprint: String,
    pub lookback: usize,
    pub regressor: Box<dyn Regressor>,
    pub input_scaler: Scaler,
    pub target_scaler: Scaler,
}

impl ModelBundle {
    /// Assemble a bundle, checking that the pieces agree with each other and
    /// with the feature table. Every mismatch is `IncompatibleModel`.
    pub fn from_artifacts(
        choice: ModelChoice,
        artifact_name: impl Into<String>,
        fingerprint: impl Into<String>,
        regressor: RegressorArtifact,
        input_scaler: Scaler,
        target_scaler: Scaler,
    ) -> Result<Self, ForecastError> {
        let model = choice.id();
        let bad = |reason: String| ForecastError::incompatible(model, reason);

        if regressor.n_features != FEATURE_COUNT {
            return Err(bad(format!(
                "model expects {} features, feature table has {FEATURE_COUNT}",
                regressor.n_features
            )));
        }

        input_scaler
            .validate()
            .map_err(|e| bad(format!("input scaler: {e}")))?;
        if input_scaler.n_features() != FEATURE_COUNT {
            return Err(bad(format!(
                "input scaler fitted on {} columns, feature table has {FEATURE_COUNT}",
                input_scaler.n_features()
            )));
        }
        if let Some(names) = input_scaler.feature_names() {
            if !names.iter().map(String::as_str).eq(FeatureColumn::names()) {
                return Err(bad(format!(
                    "input scaler column names {names:?} do not match feature order"
                )));
            }
        }

        target_scaler
            .validate()
            .map_err(|e| bad(format!("target scaler: {e}")))?;
        if target_scaler.n_features() != 1 {
            return Err(bad(format!(
                "target scaler fitted on {} columns, expected 1",
                target_scaler.n_features()
            )));
        }

        let lookback = regressor.lookback;
        let regressor = regressor.into_regressor().map_err(bad)?;

        Ok(Self {
            choice,
            artifact_name: artifact_name.into(),
            fingerprint: fingerprint.into(),
            lookback,
            regressor,
            input_scaler,
            target_scaler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{constant_trees, identity_input_scaler, identity_target_scaler};

    fn build(input: Scaler, target: Scaler) -> Result<ModelBundle, ForecastError> {
        ModelBundle::from_artifacts(
            ModelChoice::Xgb,
            "xgb_model.json",
            "abc",
            constant_trees(3, 42.0),
            input,
            target,
        )
    }

    #[test]
    fn accepts_matching_pieces() {
        let b = build(identity_input_scaler(), identity_target_scaler()).unwrap();
        assert_eq!(b.lookback, 3);
        assert_eq!(b.regressor.name(), "gradient_boosted");
    }

    #[test]
    fn rejects_wrong_input_width() {
        let narrow = Scaler::Standard {
            mean: vec![0.0; 19],
            scale: vec![1.0; 19],
            feature_names: None,
        };
        let err = build(narrow, identity_target_scaler()).unwrap_err();
        assert!(matches!(err, ForecastError::IncompatibleModel { .. }));
        assert!(err.to_string().contains("19 columns"));
    }

    #[test]
    fn rejects_reordered_column_names() {
        let mut names: Vec<String> = FeatureColumn::names().map(String::from).collect();
        names.swap(0, 1);
        let scaler = Scaler::Standard {
            mean: vec![0.0; FEATURE_COUNT],
            scale: vec![1.0; FEATURE_COUNT],
            feature_names: Some(names),
        };
        let err = build(scaler, identity_target_scaler()).unwrap_err();
        assert!(err.to_string().contains("do not match feature order"));
    }

    #[test]
    fn rejects_multi_column_target() {
        let err = build(identity_input_scaler(), identity_input_scaler()).unwrap_err();
        assert!(err.to_string().contains("expected 1"));
    }

    #[test]
    fn rejects_model_with_other_feature_count() {
        let mut art = constant_trees(3, 1.0);
        art.n_features = 21;
        let err = ModelBundle::from_artifacts(
            ModelChoice::Xgb,
            "xgb_model.json",
            "abc",
            art,
            identity_input_scaler(),
            identity_target_scaler(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("21 features"));
    }
}
