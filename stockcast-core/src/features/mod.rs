//! Feature table: the fixed column set models consume, plus the builder and
//! window types around it.
//!
//! Column order is part of the model contract. Input scalers are fitted on
//! exactly [`FeatureColumn::ALL`] in this order.

pub mod builder;
pub mod window;

pub use builder::{build_features, LONGEST_WINDOW};
pub use window::FeatureWindow;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Number of model input columns.
pub const FEATURE_COUNT: usize = 20;

/// One model input column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
    DailyReturn,
    LogReturn,
    Ma10,
    Ma20,
    Ma50,
    Ema10,
    Ema20,
    Volatility,
    Rsi,
    Macd,
    SignalLine,
    BbMiddle,
    BbUpper,
    BbLower,
}

impl FeatureColumn {
    pub const ALL: [FeatureColumn; FEATURE_COUNT] = [
        FeatureColumn::Open,
        FeatureColumn::High,
        FeatureColumn::Low,
        FeatureColumn::Close,
        FeatureColumn::AdjClose,
        FeatureColumn::Volume,
        FeatureColumn::DailyReturn,
        FeatureColumn::LogReturn,
        FeatureColumn::Ma10,
        FeatureColumn::Ma20,
        FeatureColumn::Ma50,
        FeatureColumn::Ema10,
        FeatureColumn::Ema20,
        FeatureColumn::Volatility,
        FeatureColumn::Rsi,
        FeatureColumn::Macd,
        FeatureColumn::SignalLine,
        FeatureColumn::BbMiddle,
        FeatureColumn::BbUpper,
        FeatureColumn::BbLower,
    ];

    /// Price columns overwritten when a forecast row is synthesized.
    pub const PRICES: [FeatureColumn; 5] = [
        FeatureColumn::Open,
        FeatureColumn::High,
        FeatureColumn::Low,
        FeatureColumn::Close,
        FeatureColumn::AdjClose,
    ];

    /// Position of this column in a feature row.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name as recorded in scaler artifacts.
    pub fn name(self) -> &'static str {
        match self {
            FeatureColumn::Open => "open",
            FeatureColumn::High => "high",
            FeatureColumn::Low => "low",
            FeatureColumn::Close => "close",
            FeatureColumn::AdjClose => "adj_close",
            FeatureColumn::Volume => "volume",
            FeatureColumn::DailyReturn => "daily_return",
            FeatureColumn::LogReturn => "log_return",
            FeatureColumn::Ma10 => "ma10",
            FeatureColumn::Ma20 => "ma20",
            FeatureColumn::Ma50 => "ma50",
            FeatureColumn::Ema10 => "ema10",
            FeatureColumn::Ema20 => "ema20",
            FeatureColumn::Volatility => "volatility",
            FeatureColumn::Rsi => "rsi",
            FeatureColumn::Macd => "macd",
            FeatureColumn::SignalLine => "signal_line",
            FeatureColumn::BbMiddle => "bb_middle",
            FeatureColumn::BbUpper => "bb_upper",
            FeatureColumn::BbLower => "bb_lower",
        }
    }

    /// All column names in model order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        Self::ALL.iter().map(|c| c.name())
    }
}

/// One dated row of model inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    values: [f64; FEATURE_COUNT],
}

impl FeatureRow {
    pub fn new(date: NaiveDate, values: [f64; FEATURE_COUNT]) -> Self {
        Self { date, values }
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    /// True when every column holds a finite value.
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// A row for `date` that carries this row forward with every price column
    /// set to `price`. Volume, returns and indicators are copied unchanged.
    pub fn carried_forward(&self, date: NaiveDate, price: f64) -> FeatureRow {
        let mut values = self.values;
        for col in FeatureColumn::PRICES {
            values[col.index()] = price;
        }
        FeatureRow { date, values }
    }
}

impl Index<FeatureColumn> for FeatureRow {
    type Output = f64;

    fn index(&self, col: FeatureColumn) -> &f64 {
        &self.values[col.index()]
    }
}
