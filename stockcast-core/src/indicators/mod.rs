//! Indicator kernels over plain `f64` series.
//!
//! Every kernel returns a vector the same length as its input with `NaN`
//! wherever its trailing window has not filled yet (or a `NaN` input sits
//! inside the window). The feature builder decides which rows survive.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod returns;
pub mod rsi;
pub mod sma;
pub mod volatility;

pub use bollinger::{bollinger, BollingerBands};
pub use ema::ema;
pub use macd::{macd, Macd};
pub use returns::{log_returns, simple_returns};
pub use rsi::rsi;
pub use sma::sma;
pub use volatility::rolling_std;

/// Series with a constant increment, for exact-arithmetic tests.
#[cfg(test)]
pub fn ramp(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
