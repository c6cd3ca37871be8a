//! Lookback period tokens (`1d 5d 1mo 3mo 6mo 1y 2y 5y 10y ytd max`).

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How far back to fetch history, relative to the as-of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HistoryPeriod {
    Days(u32),
    Months(u32),
    Years(u32),
    YearToDate,
    Max,
}

impl HistoryPeriod {
    pub const ONE_YEAR: HistoryPeriod = HistoryPeriod::Years(1);

    /// Accepted tokens, in the order they are documented.
    pub const TOKENS: [&'static str; 11] = [
        "1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max",
    ];

    /// First calendar date covered when the window ends at `end`.
    pub fn start_date(self, end: NaiveDate) -> NaiveDate {
        let floor = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
        let start = match self {
            HistoryPeriod::Days(n) => end.checked_sub_days(chrono::Days::new(u64::from(n))),
            HistoryPeriod::Months(n) => end.checked_sub_months(Months::new(n)),
            HistoryPeriod::Years(n) => n
                .checked_mul(12)
                .and_then(|m| end.checked_sub_months(Months::new(m))),
            HistoryPeriod::YearToDate => NaiveDate::from_ymd_opt(end.year(), 1, 1),
            HistoryPeriod::Max => None,
        };
        start.map_or(floor, |s| s.max(floor))
    }
}

impl Default for HistoryPeriod {
    fn default() -> Self {
        Self::ONE_YEAR
    }
}

impl fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryPeriod::Days(n) => write!(f, "{n}d"),
            HistoryPeriod::Months(n) => write!(f, "{n}mo"),
            HistoryPeriod::Years(n) => write!(f, "{n}y"),
            HistoryPeriod::YearToDate => f.write_str("ytd"),
            HistoryPeriod::Max => f.write_str("max"),
        }
    }
}

impl FromStr for HistoryPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        if !Self::TOKENS.contains(&token.as_str()) {
            return Err(format!(
                "unknown period '{s}' (expected one of {})",
                Self::TOKENS.join(", ")
            ));
        }
        let split = token
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(token.len());
        let (digits, unit) = token.split_at(split);
        let n = || digits.parse::<u32>().map_err(|e| format!("period '{s}': {e}"));
        match unit {
            "d" => Ok(HistoryPeriod::Days(n()?)),
            "mo" => Ok(HistoryPeriod::Months(n()?)),
            "y" => Ok(HistoryPeriod::Years(n()?)),
            "ytd" => Ok(HistoryPeriod::YearToDate),
            "max" => Ok(HistoryPeriod::Max),
            _ => Err(format!("unknown period '{s}'")),
        }
    }
}

impl TryFrom<String> for HistoryPeriod {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<HistoryPeriod> for String {
    fn from(p: HistoryPeriod) -> String {
        p.to_string()
    }
}
