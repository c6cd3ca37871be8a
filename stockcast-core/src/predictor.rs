//! Single-step prediction: one feature window through one bundle.

use crate::error::ForecastError;
use crate::features::{FeatureWindow, FEATURE_COUNT};
use crate::model::ModelBundle;

/// Predict the next close from `window`.
///
/// The window is scaled with the bundle's fitted input scaler, run through the
/// regressor, and the output is mapped back through the target scaler.
/// Scalers are only applied, never refit.
pub fn predict_next(window: &FeatureWindow<'_>, bundle: &ModelBundle) -> Result<f64, ForecastError> {
    if window.len() != bundle.lookback {
        return Err(ForecastError::Inference(format!(
            "window has {} rows, model lookback is {}",
            window.len(),
            bundle.lookback
        )));
    }

    let mut x = window.to_matrix();
    debug_assert_eq!(x.ncols(), FEATURE_COUNT);
    bundle.input_scaler.transform(&mut x);

    let scaled = bundle.regressor.predict(x.view());
    let price = bundle.target_scaler.inverse_value(0, scaled);
    if !price.is_finite() {
        return Err(ForecastError::Inference(format!(
            "{} produced a non-finite value ({price})",
            bundle.regressor.name()
        )));
    }
    Ok(price)
}
