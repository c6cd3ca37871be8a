//! Day-over-day returns.

/// (close[t] - close[t-1]) / close[t-1]; index 0 is undefined.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    let mut result = vec![f64::NAN; closes.len()];
    for i in 1..closes.len() {
        let prev = closes[i - 1];
        // Non-finite or zero base leaves the return undefined.
        if prev.is_finite() && prev != 0.0 && closes[i].is_finite() {
            result[i] = (closes[i] - prev) / prev;
        }
    }
    result
}

/// ln(1 + r) for each simple return.
pub fn log_returns(simple: &[f64]) -> Vec<f64> {
    simple.iter().map(|r| r.ln_1p()).collect()
}
