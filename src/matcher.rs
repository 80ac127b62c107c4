//! Alternative property matcher
//!
//! When the solved installment is above the buyer's budget, re-solve the
//! Concurrent model against every other catalog unit with the same down
//! payment, term, and rate, and rank the units whose installment lands near
//! the desired amount.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::catalog::Property;
use crate::finance::{solve, FinancingTerms, SolveTarget};

/// Matcher tuning knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Admit candidates within this band of the desired installment
    pub tolerance: f64,
    /// Distances closer than this are treated as a tie
    pub tie_break_band: f64,
    /// Cap on the number of returned candidates
    pub max_results: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            tolerance: 5_000.0,
            tie_break_band: 1_000.0,
            max_results: 5,
        }
    }
}

/// One ranked alternative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeMatch {
    pub property: Property,
    /// Concurrent-model installment re-solved against this unit's price
    pub installment: f64,
    /// Absolute distance from the desired installment
    pub distance: f64,
    /// Parsed delivery duration (tie-break key)
    pub delivery_months: u32,
}

/// Rank catalog units whose re-solved installment lands near `desired`
///
/// The currently selected unit is excluded, units whose re-solve fails are
/// silently skipped, and only strictly positive installments are admitted.
pub fn find_alternatives(
    catalog: &[Property],
    current_id: &str,
    desired: f64,
    terms: &FinancingTerms,
    config: &MatcherConfig,
) -> Vec<AlternativeMatch> {
    let mut candidates: Vec<AlternativeMatch> = catalog
        .iter()
        .filter(|p| !p.id.eq_ignore_ascii_case(current_id))
        .filter_map(|p| {
            let result = solve(SolveTarget::PresentValue(p.cash_price), terms).ok()?;
            let installment = result.concurrent.installment;
            if installment <= 0.0 {
                return None;
            }
            let distance = (installment - desired).abs();
            (distance <= config.tolerance).then(|| AlternativeMatch {
                property: p.clone(),
                installment,
                distance,
                delivery_months: p.delivery_months(),
            })
        })
        .collect();

    rank(&mut candidates, config.tie_break_band);
    candidates.truncate(config.max_results);

    debug!(
        "matcher: {} candidate(s) within {:.0} of desired {:.0}",
        candidates.len(),
        config.tolerance,
        desired
    );
    candidates
}

/// Closest distance first; near-ties go to the longer delivery duration
///
/// The tie-break rule is pairwise rather than a total order, so this is a
/// plain insertion sort over the pairwise comparison.
fn rank(candidates: &mut [AlternativeMatch], tie_break_band: f64) {
    for i in 1..candidates.len() {
        let mut j = i;
        while j > 0 && ranks_before(&candidates[j], &candidates[j - 1], tie_break_band) {
            candidates.swap(j, j - 1);
            j -= 1;
        }
    }
}

fn ranks_before(a: &AlternativeMatch, b: &AlternativeMatch, tie_break_band: f64) -> bool {
    if (a.distance - b.distance).abs() < tie_break_band {
        a.delivery_months > b.delivery_months
    } else {
        a.distance < b.distance
    }
}
