//! Recursive multi-day forecasting.
//!
//! Each step predicts one close from the trailing window, then appends a
//! synthesized row for the next calendar day so the following step can see
//! it. The synthesized row is the previous row with its price columns set to
//! the prediction; volume and every indicator are carried forward unchanged
//! rather than recomputed.

use crate::domain::{Forecast, ForecastPoint};
use crate::error::ForecastError;
use crate::features::{FeatureColumn, FeatureRow, FeatureWindow};
use crate::model::ModelBundle;
use crate::predictor::predict_next;
use chrono::{Days, NaiveDate};

/// Working table for one forecast: the real feature rows followed by the
/// rows synthesized so far.
#[derive(Debug, Clone)]
pub struct Rollout {
    rows: Vec<FeatureRow>,
    observed: usize,
    points: Vec<ForecastPoint>,
}

impl Rollout {
    pub fn new(rows: &[FeatureRow]) -> Self {
        Self {
            rows: rows.to_vec(),
            observed: rows.len(),
            points: Vec::new(),
        }
    }

    /// All rows, real and synthesized, oldest first.
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Rows appended by [`Rollout::step`].
    pub fn synthesized(&self) -> &[FeatureRow] {
        &self.rows[self.observed..]
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Predict the close for `date` and append the carried-forward row.
    pub fn step(&mut self, bundle: &ModelBundle, date: NaiveDate) -> Result<f64, ForecastError> {
        let window = FeatureWindow::trailing(&self.rows, bundle.lookback).ok_or(
            ForecastError::InsufficientHistory {
                required: bundle.lookback,
                available: self.rows.len(),
            },
        )?;
        let price = predict_next(&window, bundle)?;

        // Window is non-empty, so there is a last row.
        let next = self.rows[self.rows.len() - 1].carried_forward(date, price);
        self.rows.push(next);
        self.points.push(ForecastPoint {
            date,
            predicted_close: price,
        });
        Ok(price)
    }

    pub fn into_points(self) -> Vec<ForecastPoint> {
        self.points
    }
}

/// Forecast `days` closes beyond the last feature row.
///
/// Point `i` (1-based) is dated `last_date + i` calendar days. Fails with
/// `InsufficientHistory` when there are fewer rows than the model lookback,
/// even for `days == 0`. Any step failure fails the whole forecast.
pub fn forecast_recursive(
    rows: &[FeatureRow],
    bundle: &ModelBundle,
    days: u32,
) -> Result<Forecast, ForecastError> {
    let last = match rows.last() {
        Some(last) if rows.len() >= bundle.lookback => last,
        _ => {
            return Err(ForecastError::InsufficientHistory {
                required: bundle.lookback,
                available: rows.len(),
            })
        }
    };
    let last_date = last.date;
    let last_close = last[FeatureColumn::Close];

    let mut rollout = Rollout::new(rows);
    for i in 1..=days {
        let date = last_date
            .checked_add_days(Days::new(u64::from(i)))
            .ok_or_else(|| {
                ForecastError::InvalidInput(format!("horizon of {days} days overflows the calendar"))
            })?;
        rollout.step(bundle, date)?;
    }

    Ok(Forecast {
        points: rollout.into_points(),
        last_date,
        last_close,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelChoice;
    use crate::features::build_features;
    use crate::fixtures::{constant_trees, identity_input_scaler, identity_target_scaler, linear_bars};

    fn bundle(lookback: usize, value: f64) -> ModelBundle {
        ModelBundle::from_artifacts(
            ModelChoice::Xgb,
            "xgb_model.json",
            "test",
            constant_trees(lookback, value),
            identity_input_scaler(),
            identity_target_scaler(),
        )
        .unwrap()
    }

    #[test]
    fn dates_are_consecutive_calendar_days() {
        let rows = build_features(&linear_bars(100, 50.0, 0.5));
        let f = forecast_recursive(&rows, &bundle(20, 42.0), 5).unwrap();
        let last = rows.last().unwrap().date;
        assert_eq!(f.last_date, last);
        assert_eq!(f.last_close, rows.last().unwrap()[FeatureColumn::Close]);
        for (i, p) in f.points.iter().enumerate() {
            assert_eq!(p.date, last + chrono::Duration::days(i as i64 + 1));
            assert_eq!(p.predicted_close, 42.0);
        }
    }

    #[test]
    fn zero_days_is_empty_but_still_checks_history() {
        let rows = build_features(&linear_bars(100, 50.0, 0.5));
        let f = forecast_recursive(&rows, &bundle(20, 1.0), 0).unwrap();
        assert!(f.points.is_empty());

        let err = forecast_recursive(&rows[..5], &bundle(20, 1.0), 0).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientHistory {
                required: 20,
                available: 5
            }
        ));
    }

    #[test]
    fn rollout_carries_indicators_forward() {
        let rows = build_features(&linear_bars(100, 50.0, 0.5));
        let b = bundle(10, 77.0);
        let mut rollout = Rollout::new(&rows);
        let last = rows.last().unwrap().clone();
        for i in 1..=3 {
            rollout
                .step(&b, last.date + chrono::Duration::days(i))
                .unwrap();
        }
        assert_eq!(rollout.rows().len(), rows.len() + 3);
        assert_eq!(rollout.synthesized().len(), 3);
        for row in rollout.synthesized() {
            for col in FeatureColumn::ALL {
                if FeatureColumn::PRICES.contains(&col) {
                    assert_eq!(row[col], 77.0);
                } else {
                    assert_eq!(row[col], last[col]);
                }
            }
        }
        assert_eq!(rollout.points().len(), 3);
    }
}
