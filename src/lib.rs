//! Installment Advisor - seller-financing planner for real-estate units
//!
//! This library provides:
//! - Present-value discounting primitives for monthly cash flows
//! - Installment schedules under two models (with/without a payment in the
//!   down-payment month) and a solver for the level installment
//! - A catalog matcher that ranks alternative units near a desired installment
//! - A turn-based conversation engine that collects financing parameters from
//!   free text and drives the solver

pub mod catalog;
pub mod conversation;
pub mod finance;
pub mod matcher;

// Re-export commonly used types
pub use catalog::Property;
pub use conversation::{process_turn, ConversationContext, ConversationState, TurnOutcome};
pub use finance::{solve, FinancingTerms, NpvResult, SolveTarget, YearMonth};
pub use matcher::{find_alternatives, AlternativeMatch, MatcherConfig};
