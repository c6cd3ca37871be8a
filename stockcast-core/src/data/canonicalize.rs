//! Bring provider output into canonical form: ascending dates, one bar per
//! date, no void or insane bars.

use crate::domain::PriceBar;
use serde::Serialize;

/// What canonicalization changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CanonicalReport {
    pub input_bars: usize,
    pub dropped_void: usize,
    pub dropped_insane: usize,
    pub dropped_duplicates: usize,
    pub was_unsorted: bool,
}

impl CanonicalReport {
    pub fn changed_anything(&self) -> bool {
        self.was_unsorted || self.dropped_void + self.dropped_insane + self.dropped_duplicates > 0
    }
}

/// Sort by date, drop void and insane bars, and keep the last bar seen for
/// any repeated date (later rows from a provider are corrections).
pub fn canonicalize(bars: Vec<PriceBar>) -> (Vec<PriceBar>, CanonicalReport) {
    let mut report = CanonicalReport {
        input_bars: bars.len(),
        was_unsorted: bars.windows(2).any(|w| w[1].date < w[0].date),
        ..CanonicalReport::default()
    };

    let mut kept: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        if bar.is_void() {
            report.dropped_void += 1;
        } else if !bar.is_sane() {
            report.dropped_insane += 1;
        } else {
            kept.push(bar);
        }
    }

    // Stable sort keeps arrival order within a date, so the last one wins below.
    kept.sort_by_key(|b| b.date);
    let mut out: Vec<PriceBar> = Vec::with_capacity(kept.len());
    for bar in kept {
        match out.last_mut() {
            Some(prev) if prev.date == bar.date => {
                *prev = bar;
                report.dropped_duplicates += 1;
            }
            _ => out.push(bar),
        }
    }

    (out, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(d: u32, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            adj_close: Some(close),
            volume: 100,
        }
    }

    #[test]
    fn clean_input_is_untouched() {
        let bars = vec![bar(2, 10.0), bar(3, 11.0)];
        let (out, report) = canonicalize(bars.clone());
        assert_eq!(out, bars);
        assert!(!report.changed_anything());
    }

    #[test]
    fn sorts_and_keeps_last_duplicate() {
        let (out, report) = canonicalize(vec![bar(3, 11.0), bar(2, 10.0), bar(3, 12.0)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].close, 12.0);
        assert!(report.was_unsorted);
        assert_eq!(report.dropped_duplicates, 1);
    }

    #[test]
    fn drops_void_and_insane_bars() {
        let mut inverted = bar(4, 10.0);
        inverted.high = 5.0;
        let mut void = bar(5, 10.0);
        void.adj_close = Some(f64::NAN);
        let (out, report) = canonicalize(vec![bar(2, 10.0), inverted, void]);
        assert_eq!(out.len(), 1);
        assert_eq!(report.dropped_insane, 1);
        assert_eq!(report.dropped_void, 1);
    }
}
