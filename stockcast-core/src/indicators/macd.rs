//! Moving Average Convergence/Divergence.
//!
//! MACD = EMA(fast) - EMA(slow); signal = EMA(MACD, signal span).
//! Built on the unadjusted EMA, so both lines are defined from index 0.

use super::ema::ema;

#[derive(Debug, Clone)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    assert!(fast < slow, "MACD fast span must be shorter than slow span");
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal = ema(&line, signal);
    Macd { macd: line, signal }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, ramp, DEFAULT_EPSILON};

    #[test]
    fn macd_is_zero_on_flat_series() {
        let m = macd(&[10.0; 30], 12, 26, 9);
        for (line, sig) in m.macd.iter().zip(&m.signal) {
            assert_approx(*line, 0.0, DEFAULT_EPSILON);
            assert_approx(*sig, 0.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn macd_positive_on_uptrend() {
        let m = macd(&ramp(100.0, 1.0, 60), 12, 26, 9);
        assert_approx(m.macd[0], 0.0, DEFAULT_EPSILON);
        assert!(m.macd[59] > 0.0);
        assert!(m.signal[59] > 0.0);
        // Signal lags the line on a steady uptrend.
        assert!(m.signal[59] < m.macd[59]);
    }

    #[test]
    fn macd_line_is_ema_difference() {
        let closes = ramp(50.0, -0.3, 40);
        let m = macd(&closes, 12, 26, 9);
        let f = ema(&closes, 12);
        let s = ema(&closes, 26);
        for i in 0..40 {
            assert_eq!(m.macd[i], f[i] - s[i]);
        }
    }
}
