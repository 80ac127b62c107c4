//! Calendar-dated installment schedules for the two cash-flow models

use serde::{Deserialize, Serialize};

use super::discount::YearMonth;

/// The two installment placement models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CashflowModel {
    /// Installments at offsets `1..=n` regardless of the down-payment month
    Concurrent,
    /// Installments start at offset 1 and run until `n` are placed, skipping
    /// the offset equal to the down-payment offset
    Skip,
}

/// Kind of a scheduled payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Installment,
    DownPayment,
}

/// A single dated payment in a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Calendar month the payment falls due
    pub month: YearMonth,
    pub amount: f64,
    pub kind: PaymentKind,
}

/// Month offsets (from the start month) at which installments fall due
///
/// Both models are produced by the same placement loop: walk forward from
/// offset 1 until `n` installments are placed, skipping the down-payment
/// offset when the model calls for it. When the down-payment offset never
/// coincides with the walked range, `Skip` collapses to `Concurrent`.
pub fn installment_offsets(model: CashflowModel, n: u32, down_offset: i32) -> Vec<i32> {
    let skip = match model {
        CashflowModel::Concurrent => None,
        CashflowModel::Skip => Some(down_offset),
    };

    let mut offsets = Vec::with_capacity(n as usize);
    let mut k = 1;
    while offsets.len() < n as usize {
        if Some(k) != skip {
            offsets.push(k);
        }
        k += 1;
    }
    offsets
}

/// Build the dated installment schedule for a model
///
/// Returns exactly `n` entries in strictly increasing calendar order. The down
/// payment itself is not part of the installment schedule; see
/// [`super::NpvResult::full_schedule`] for the merged view.
pub fn build_schedule(
    model: CashflowModel,
    start: YearMonth,
    n: u32,
    down_offset: i32,
    installment: f64,
) -> Vec<ScheduleEntry> {
    installment_offsets(model, n, down_offset)
        .into_iter()
        .map(|k| ScheduleEntry {
            month: start.add_months(k),
            amount: installment,
            kind: PaymentKind::Installment,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_offsets() {
        assert_eq!(installment_offsets(CashflowModel::Concurrent, 5, 3), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_skip_offsets_mid_window() {
        // Skip at 3: five installments span offsets 1..=6 with 3 omitted
        assert_eq!(installment_offsets(CashflowModel::Skip, 5, 3), vec![1, 2, 4, 5, 6]);
    }

    #[test]
    fn test_skip_at_window_edge() {
        assert_eq!(installment_offsets(CashflowModel::Skip, 3, 1), vec![2, 3, 4]);
        // Down payment at n+1: offsets 1..=3 fill n=3 before the walk reaches
        // 4, so nothing is skipped
        assert_eq!(installment_offsets(CashflowModel::Skip, 3, 4), vec![1, 2, 3]);
    }

    #[test]
    fn test_skip_never_triggers_collapses_to_concurrent() {
        for down_offset in [-3, 0, 7, 100] {
            assert_eq!(
                installment_offsets(CashflowModel::Skip, 6, down_offset),
                installment_offsets(CashflowModel::Concurrent, 6, down_offset),
            );
        }
    }

    #[test]
    fn test_schedule_is_dated_and_strictly_increasing() {
        let start = YearMonth::new(2025, 11);
        let schedule = build_schedule(CashflowModel::Skip, start, 4, 2, 1000.0);

        assert_eq!(schedule.len(), 4);
        assert_eq!(schedule[0].month, YearMonth::new(2025, 12));
        // Offset 2 (2026-01) skipped
        assert_eq!(schedule[1].month, YearMonth::new(2026, 2));
        for pair in schedule.windows(2) {
            assert!(pair[0].month < pair[1].month);
        }
        assert!(schedule.iter().all(|e| e.kind == PaymentKind::Installment));
    }

    #[test]
    fn test_skip_schedule_avoids_down_payment_month() {
        let start = YearMonth::new(2025, 1);
        for down_offset in 1..=13 {
            let down_month = start.add_months(down_offset);
            let schedule = build_schedule(CashflowModel::Skip, start, 12, down_offset, 500.0);
            assert!(
                schedule.iter().all(|e| e.month != down_month),
                "skip model paid in the down-payment month at offset {}",
                down_offset
            );
        }
    }
}
