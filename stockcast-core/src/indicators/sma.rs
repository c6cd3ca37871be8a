//! Simple Moving Average (SMA).
//!
//! Mean of the trailing `period` values. First valid value at index period-1.
//! Each window is summed from scratch so results do not drift with series length.

pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "SMA period must be >= 1");
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        // NaN anywhere in the window poisons the sum, which is what we want.
        result[i] = window.iter().sum::<f64>() / period as f64;
    }

    result
}
