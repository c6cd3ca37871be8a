//! Exponential Moving Average (EMA), unadjusted.
//!
//! alpha = 2 / (span + 1)
//! EMA[first] = value[first]; EMA[t] = alpha * value[t] + (1 - alpha) * EMA[t-1]
//!
//! `first` is the first finite input, so the output is defined from the very
//! first value. There is no bias adjustment for the short early history.

pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    assert!(span >= 1, "EMA span must be >= 1");
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    let Some(first) = values.iter().position(|v| v.is_finite()) else {
        return result;
    };

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev = values[first];
    result[first] = prev;

    for i in (first + 1)..n {
        if !values[i].is_finite() {
            // Once the series breaks, everything after it is tainted.
            break;
        }
        let next = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = next;
        prev = next;
    }

    result
}
