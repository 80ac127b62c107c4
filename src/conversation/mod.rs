//! Turn-based conversation flow that collects financing parameters and
//! drives the solver

mod context;
mod engine;
pub mod parse;

pub use context::{ConversationContext, ConversationState, DownPaymentProposal, FinancingParameters};
pub use engine::{process_turn, TurnOutcome};
