//! Uniform-installment solver for both cash-flow models
//!
//! Given a down payment, term, and monthly rate, derives the level installment
//! that hits either a target present value (typically the cash price) or a
//! target nominal total, and returns the full dated result for both models.
//!
//! All intermediate values stay at full f64 precision; rounding to whole
//! currency units is a presentation concern left to callers so repeated
//! recomputation does not compound rounding error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::discount::{geometric_sum_discount, months_between, present_value, YearMonth};
use super::schedule::{build_schedule, CashflowModel, PaymentKind, ScheduleEntry};

/// Denominators smaller than this are treated as zero
const DENOMINATOR_EPSILON: f64 = 1e-12;

/// What the solver should hit; exactly one target per call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SolveTarget {
    /// Total present value of all payments (down payment included)
    PresentValue(f64),
    /// Undiscounted sum of all payments (down payment included)
    NominalTotal(f64),
}

/// Financing inputs common to both models
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinancingTerms {
    /// Monthly discount rate as a decimal fraction
    pub monthly_rate: f64,
    pub down_payment: f64,
    /// Calendar month the down payment falls due
    pub down_payment_month: YearMonth,
    pub installment_count: u32,
    /// Session start reference ("today"); offsets count from here
    pub start: YearMonth,
}

/// Solved plan for one cash-flow model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    /// Level monthly installment
    pub installment: f64,
    /// Down payment + installment * count, undiscounted
    pub nominal_total: f64,
    /// Down payment PV + discounted installment schedule
    pub present_value: f64,
    /// Dated installments, chronological, one entry per calendar month
    pub schedule: Vec<ScheduleEntry>,
}

/// Solver output across both models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpvResult {
    /// Model A: installments run through the down-payment month
    pub concurrent: ModelResult,
    /// Model B: no installment in the down-payment month
    pub skip: ModelResult,
    pub down_payment_pv: f64,
    pub down_payment_month: YearMonth,
    pub down_payment: f64,
}

impl NpvResult {
    pub fn model(&self, model: CashflowModel) -> &ModelResult {
        match model {
            CashflowModel::Concurrent => &self.concurrent,
            CashflowModel::Skip => &self.skip,
        }
    }

    /// Installment schedule with the down payment merged in chronologically
    /// (for presentation; the per-model schedules hold installments only)
    pub fn full_schedule(&self, model: CashflowModel) -> Vec<ScheduleEntry> {
        let mut entries = self.model(model).schedule.clone();
        let down_entry = ScheduleEntry {
            month: self.down_payment_month,
            amount: self.down_payment,
            kind: PaymentKind::DownPayment,
        };
        let pos = entries.partition_point(|e| e.month < down_entry.month);
        entries.insert(pos, down_entry);
        entries
    }
}

/// Solver failure conditions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("installment count must be positive")]
    NonPositiveCount,

    #[error("monthly rate {0} is not a finite value greater than -1")]
    InvalidRate(f64),

    #[error("{0} is not a finite number")]
    NonFiniteInput(&'static str),

    #[error("discount sum for the {model:?} model evaluated to zero")]
    DegenerateDiscountSum { model: CashflowModel },
}

/// Solve the level installment for both models against one target
pub fn solve(target: SolveTarget, terms: &FinancingTerms) -> Result<NpvResult, SolveError> {
    let n = terms.installment_count;
    if n == 0 {
        return Err(SolveError::NonPositiveCount);
    }
    if !terms.monthly_rate.is_finite() || terms.monthly_rate <= -1.0 {
        return Err(SolveError::InvalidRate(terms.monthly_rate));
    }
    if !terms.down_payment.is_finite() {
        return Err(SolveError::NonFiniteInput("down payment"));
    }
    let target_value = match target {
        SolveTarget::PresentValue(v) | SolveTarget::NominalTotal(v) => v,
    };
    if !target_value.is_finite() {
        return Err(SolveError::NonFiniteInput("target"));
    }

    let down_offset = months_between(terms.start, terms.down_payment_month);
    let down_pv = present_value(terms.down_payment, down_offset, terms.monthly_rate);

    let concurrent = solve_model(CashflowModel::Concurrent, target, terms, down_offset, down_pv)?;
    let skip = solve_model(CashflowModel::Skip, target, terms, down_offset, down_pv)?;

    Ok(NpvResult {
        concurrent,
        skip,
        down_payment_pv: down_pv,
        down_payment_month: terms.down_payment_month,
        down_payment: terms.down_payment,
    })
}

fn solve_model(
    model: CashflowModel,
    target: SolveTarget,
    terms: &FinancingTerms,
    down_offset: i32,
    down_pv: f64,
) -> Result<ModelResult, SolveError> {
    let n = terms.installment_count;
    let rate = terms.monthly_rate;

    let installment = match target {
        SolveTarget::PresentValue(target_pv) => {
            let remaining = target_pv - down_pv;
            let denominator = discount_sum(model, n, rate, down_offset);
            if denominator.abs() < DENOMINATOR_EPSILON {
                return Err(SolveError::DegenerateDiscountSum { model });
            }
            remaining / denominator
        }
        SolveTarget::NominalTotal(target_nominal) => {
            (target_nominal - terms.down_payment) / n as f64
        }
    };

    let schedule = build_schedule(model, terms.start, n, down_offset, installment);
    let installment_pv: f64 = schedule
        .iter()
        .map(|e| present_value(e.amount, months_between(terms.start, e.month), rate))
        .sum();

    Ok(ModelResult {
        installment,
        nominal_total: terms.down_payment + installment * n as f64,
        present_value: down_pv + installment_pv,
        schedule,
    })
}

/// Sum of discount factors over the offsets a model's installments occupy
///
/// Model A occupies `1..=n`. Model B spans `n+1` offsets with the down-payment
/// offset skipped when it falls within `[1, n+1]`; otherwise the skip never
/// triggers and the span equals Model A's.
fn discount_sum(model: CashflowModel, n: u32, rate: f64, down_offset: i32) -> f64 {
    match model {
        CashflowModel::Concurrent => geometric_sum_discount(n, rate, 1, None),
        CashflowModel::Skip if (1..=n as i32 + 1).contains(&down_offset) => {
            geometric_sum_discount(n + 1, rate, 1, Some(down_offset))
        }
        CashflowModel::Skip => geometric_sum_discount(n, rate, 1, None),
    }
}
