//! Discounting primitives for monthly cash flows
//!
//! All rates are monthly decimal fractions with discrete monthly compounding.
//! Offsets are signed whole months from a reference month, so discounting works
//! for past-dated amounts as well as future ones.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar month (year + month-of-year), the dating unit for all schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    /// 1-12
    pub month: u32,
}

impl YearMonth {
    /// Create a calendar month, normalizing an out-of-range month-of-year
    /// (month 0 or 13+ carries into the year)
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month: 1 }.add_months(month as i32 - 1)
    }

    /// Today's calendar month, the start reference for a new session
    pub fn current() -> Self {
        use chrono::Datelike;
        let today = chrono::Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    /// The calendar month `offset` whole months after (or before) this one
    pub fn add_months(self, offset: i32) -> Self {
        let zero_based = self.year * 12 + (self.month as i32 - 1) + offset;
        Self {
            year: zero_based.div_euclid(12),
            month: zero_based.rem_euclid(12) as u32 + 1,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Signed month offset from `a` to `b` (positive when `b` is later)
pub fn months_between(a: YearMonth, b: YearMonth) -> i32 {
    (b.year - a.year) * 12 + (b.month as i32 - a.month as i32)
}

/// Present value of `amount` due `months_ahead` months from the reference
///
/// `amount / (1 + rate)^months_ahead`, valid for any integer offset including 0
/// and negative (past-dated) offsets.
pub fn present_value(amount: f64, months_ahead: i32, rate: f64) -> f64 {
    amount / (1.0 + rate).powi(months_ahead)
}

/// Sum of discount factors `1/(1+rate)^k` over `n` consecutive integer offsets
/// starting at `start_offset`, omitting the term at `skip_offset` if given
///
/// This is the building block for solving an unknown uniform payment against a
/// target discounted total: for payments of `T` at those offsets,
/// `PV = T * geometric_sum_discount(...)`.
pub fn geometric_sum_discount(
    n: u32,
    rate: f64,
    start_offset: i32,
    skip_offset: Option<i32>,
) -> f64 {
    (start_offset..start_offset + n as i32)
        .filter(|k| Some(*k) != skip_offset)
        .map(|k| 1.0 / (1.0 + rate).powi(k))
        .sum()
}

/// Convert an annual decimal-fraction rate to the equivalent monthly rate
/// under discrete monthly compounding: `(1 + annual)^(1/12) - 1`
pub fn annual_to_monthly_rate(annual: f64) -> f64 {
    (1.0 + annual).powf(1.0 / 12.0) - 1.0
}
