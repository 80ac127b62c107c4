//! Financing math: discounting primitives, payment schedules, and the
//! uniform-installment solver

mod discount;
mod schedule;
mod solver;

pub use discount::{
    annual_to_monthly_rate, geometric_sum_discount, months_between, present_value, YearMonth,
};
pub use schedule::{
    build_schedule, installment_offsets, CashflowModel, PaymentKind, ScheduleEntry,
};
pub use solver::{solve, FinancingTerms, ModelResult, NpvResult, SolveError, SolveTarget};
