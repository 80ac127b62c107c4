//! Per-session conversation state
//!
//! Each state variant carries exactly the slot values guaranteed collected by
//! that point, so transitions never need presence checks on a flat bag of
//! optionals. Negotiation states carry the completed financing parameters from
//! the terminal state they branched off.

use serde::{Deserialize, Serialize};

use crate::conversation::parse::RateUnit;
use crate::finance::{FinancingTerms, NpvResult, YearMonth};
use crate::matcher::AlternativeMatch;

/// Fully collected financing inputs (everything but the start reference,
/// which lives on the context)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinancingParameters {
    /// Monthly discount rate as a decimal fraction
    pub monthly_rate: f64,
    pub down_payment: f64,
    pub down_payment_month: YearMonth,
    pub installment_count: u32,
}

impl FinancingParameters {
    /// Solver terms for a session starting at `start`
    pub fn terms(&self, start: YearMonth) -> FinancingTerms {
        FinancingTerms {
            monthly_rate: self.monthly_rate,
            down_payment: self.down_payment,
            down_payment_month: self.down_payment_month,
            installment_count: self.installment_count,
            start,
        }
    }
}

/// A down-payment increase suggested during negotiation, awaiting the
/// buyer's explicit confirmation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DownPaymentProposal {
    /// Installment the buyer asked for
    pub desired_installment: f64,
    /// Smallest down payment found that brings the installment within
    /// tolerance of the desired amount
    pub suggested_down_payment: f64,
}

/// Current step of the dialogue, tagged with the slots collected so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ConversationState {
    CollectingProperty,
    CollectingRate {
        property_id: String,
        /// Unit named before the number arrived ("monthly" then "2")
        pending_unit: Option<RateUnit>,
    },
    /// A bare rate number arrived without a unit; holding it until the buyer
    /// says whether it is annual or monthly
    AwaitingRateUnit {
        property_id: String,
        value: f64,
    },
    CollectingDownAmount {
        property_id: String,
        monthly_rate: f64,
    },
    CollectingDownYear {
        property_id: String,
        monthly_rate: f64,
        down_payment: f64,
    },
    CollectingDownMonth {
        property_id: String,
        monthly_rate: f64,
        down_payment: f64,
        down_year: i32,
    },
    CollectingInstallmentCount {
        property_id: String,
        monthly_rate: f64,
        down_payment: f64,
        down_payment_month: YearMonth,
    },
    /// Terminal: a plan has been solved and presented
    Completed {
        property_id: String,
        params: FinancingParameters,
    },
    /// Buyer said the installment is too high; waiting for the amount they
    /// can afford. `pending` holds a suggested down-payment increase awaiting
    /// confirmation, if one was proposed.
    AwaitingLowerInstallment {
        property_id: String,
        params: FinancingParameters,
        pending: Option<DownPaymentProposal>,
    },
    /// Ranked alternatives are on the table; waiting for a pick by ordinal
    /// position or unit id
    ShowingAlternatives {
        property_id: String,
        params: FinancingParameters,
        desired_installment: f64,
        candidates: Vec<AlternativeMatch>,
    },
}

impl ConversationState {
    /// Id of the unit under discussion, if one has been accepted
    pub fn property_id(&self) -> Option<&str> {
        match self {
            ConversationState::CollectingProperty => None,
            ConversationState::CollectingRate { property_id, .. }
            | ConversationState::AwaitingRateUnit { property_id, .. }
            | ConversationState::CollectingDownAmount { property_id, .. }
            | ConversationState::CollectingDownYear { property_id, .. }
            | ConversationState::CollectingDownMonth { property_id, .. }
            | ConversationState::CollectingInstallmentCount { property_id, .. }
            | ConversationState::Completed { property_id, .. }
            | ConversationState::AwaitingLowerInstallment { property_id, .. }
            | ConversationState::ShowingAlternatives { property_id, .. } => Some(property_id),
        }
    }

    /// Whether this is the terminal state or one of the negotiation states
    /// branching off it
    pub fn is_completed_or_negotiating(&self) -> bool {
        matches!(
            self,
            ConversationState::Completed { .. }
                | ConversationState::AwaitingLowerInstallment { .. }
                | ConversationState::ShowingAlternatives { .. }
        )
    }
}

/// One session's threaded state: read in, transformed, returned per turn.
/// The caller persists it between turns; nothing is retained engine-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub state: ConversationState,
    /// Calendar month the session started in; all offsets count from here
    pub start: YearMonth,
    /// Most recent solver output, kept for restating the plan
    pub last_result: Option<NpvResult>,
}

impl ConversationContext {
    /// Fresh session anchored at the current calendar month
    pub fn new() -> Self {
        Self::with_start(YearMonth::current())
    }

    /// Fresh session with an explicit start reference (tests, replays)
    pub fn with_start(start: YearMonth) -> Self {
        Self {
            state: ConversationState::CollectingProperty,
            start,
            last_result: None,
        }
    }

    /// Clear everything back to the initial form, keeping the start reference
    pub fn reset(&mut self) {
        self.state = ConversationState::CollectingProperty;
        self.last_result = None;
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new()
    }
}
