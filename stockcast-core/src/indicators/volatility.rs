//! Rolling sample standard deviation (divide by N-1).
//!
//! Used for return volatility and Bollinger band width. Sample rather than
//! population deviation keeps features identical to the ones the shipped
//! scalers were fitted on.

pub fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 2, "rolling std period must be >= 2");
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| !v.is_finite()) {
            continue;
        }
        let mean = window.iter().sum::<f64>() / period as f64;
        let ss: f64 = window.iter().map(|v| (v - mean) * (v - mean)).sum();
        result[i] = (ss / (period - 1) as f64).sqrt();
    }

    result
}
