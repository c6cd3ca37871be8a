//! Feature builder: OHLCV bars → complete feature rows.
//!
//! Rows whose indicators are not all defined yet are dropped, never filled.
//! For well-formed bars the 50-bar moving average is the binding window, so
//! the output holds `bars.len() - (LONGEST_WINDOW - 1)` rows.

use super::{FeatureColumn, FeatureRow, FEATURE_COUNT};
use crate::domain::PriceBar;
use crate::indicators::{bollinger, ema, log_returns, macd, rolling_std, rsi, simple_returns, sma};

/// Longest trailing window any feature needs.
pub const LONGEST_WINDOW: usize = 50;

const VOLATILITY_WINDOW: usize = 20;
const RSI_WINDOW: usize = 14;
const BOLLINGER_WINDOW: usize = 20;
const BOLLINGER_MULT: f64 = 2.0;

pub fn build_features(bars: &[PriceBar]) -> Vec<FeatureRow> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let daily_return = simple_returns(&closes);
    let log_return = log_returns(&daily_return);
    let ma10 = sma(&closes, 10);
    let ma20 = sma(&closes, 20);
    let ma50 = sma(&closes, LONGEST_WINDOW);
    let ema10 = ema(&closes, 10);
    let ema20 = ema(&closes, 20);
    let volatility = rolling_std(&daily_return, VOLATILITY_WINDOW);
    let rsi14 = rsi(&closes, RSI_WINDOW);
    let macd = macd(&closes, 12, 26, 9);
    let bands = bollinger(&closes, BOLLINGER_WINDOW, BOLLINGER_MULT);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let mut values = [f64::NAN; FEATURE_COUNT];
            let mut set = |col: FeatureColumn, v: f64| values[col.index()] = v;
            set(FeatureColumn::Open, bar.open);
            set(FeatureColumn::High, bar.high);
            set(FeatureColumn::Low, bar.low);
            set(FeatureColumn::Close, bar.close);
            set(FeatureColumn::AdjClose, bar.adjusted_close());
            set(FeatureColumn::Volume, bar.volume as f64);
            set(FeatureColumn::DailyReturn, daily_return[i]);
            set(FeatureColumn::LogReturn, log_return[i]);
            set(FeatureColumn::Ma10, ma10[i]);
            set(FeatureColumn::Ma20, ma20[i]);
            set(FeatureColumn::Ma50, ma50[i]);
            set(FeatureColumn::Ema10, ema10[i]);
            set(FeatureColumn::Ema20, ema20[i]);
            set(FeatureColumn::Volatility, volatility[i]);
            set(FeatureColumn::Rsi, rsi14[i]);
            set(FeatureColumn::Macd, macd.macd[i]);
            set(FeatureColumn::SignalLine, macd.signal[i]);
            set(FeatureColumn::BbMiddle, bands.middle[i]);
            set(FeatureColumn::BbUpper, bands.upper[i]);
            set(FeatureColumn::BbLower, bands.lower[i]);
            FeatureRow::new(bar.date, values)
        })
        .filter(FeatureRow::is_complete)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: base + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                adj_close: None,
                volume: 1_000 + i as u64,
            })
            .collect()
    }

    #[test]
    fn drops_exactly_longest_window_minus_one() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        let rows = build_features(&bars_from_closes(&closes));
        assert_eq!(rows.len(), 80 - (LONGEST_WINDOW - 1));
        assert_eq!(
            rows[0].date,
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Duration::days(49)
        );
    }

    #[test]
    fn too_short_history_yields_nothing() {
        let closes: Vec<f64> = (0..49).map(|i| 10.0 + i as f64).collect();
        assert!(build_features(&bars_from_closes(&closes)).is_empty());
        assert!(build_features(&[]).is_empty());
    }

    #[test]
    fn adj_close_defaults_to_close() {
        let closes: Vec<f64> = (0..60).map(|i| 50.0 + i as f64).collect();
        let mut bars = bars_from_closes(&closes);
        bars[59].adj_close = Some(1.0);
        let rows = build_features(&bars);
        let last = rows.last().unwrap();
        assert_eq!(last[FeatureColumn::AdjClose], 1.0);
        let prev = &rows[rows.len() - 2];
        assert_eq!(prev[FeatureColumn::AdjClose], prev[FeatureColumn::Close]);
    }

    #[test]
    fn raw_fields_pass_through() {
        let closes: Vec<f64> = (0..55).map(|i| 20.0 + i as f64).collect();
        let bars = bars_from_closes(&closes);
        let rows = build_features(&bars);
        let row = &rows[0];
        let bar = &bars[49];
        assert_eq!(row[FeatureColumn::Open], bar.open);
        assert_eq!(row[FeatureColumn::High], bar.high);
        assert_eq!(row[FeatureColumn::Low], bar.low);
        assert_eq!(row[FeatureColumn::Volume], bar.volume as f64);
    }

    #[test]
    fn undefined_indicator_rows_are_dropped_not_filled() {
        // A zero close makes the next return undefined; that row must vanish.
        let mut closes: Vec<f64> = (0..70).map(|i| 30.0 + i as f64).collect();
        closes[60] = 0.0;
        let rows = build_features(&bars_from_closes(&closes));
        assert!(rows.iter().all(|r| r.is_complete()));
        let dropped = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Duration::days(61);
        assert!(rows.iter().all(|r| r.date != dropped));
    }
}
