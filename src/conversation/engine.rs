//! Turn processor for the financing dialogue
//!
//! One pure function per turn: utterance + context + catalog in, reply +
//! updated context (and the solved plan, when a solve happened) out. The
//! caller persists the returned context and threads it back on the next turn.
//!
//! No parse or guard failure is fatal: every rejection re-prompts with the
//! state unchanged, and the buyer can always restart with a greeting.

use log::{debug, warn};

use crate::catalog::{find_property, Property};
use crate::conversation::context::{
    ConversationContext, ConversationState, DownPaymentProposal, FinancingParameters,
};
use crate::conversation::parse::{self, RateUnit, RateUtterance};
use crate::finance::{annual_to_monthly_rate, months_between, solve, NpvResult, SolveTarget, YearMonth};
use crate::matcher::{find_alternatives, AlternativeMatch, MatcherConfig};

/// Months added when illustrating a longer term during negotiation
const TERM_EXTENSION_MONTHS: u32 = 12;
/// Step size of the down-payment search during negotiation
const DOWN_PAYMENT_STEP: f64 = 50_000.0;
/// The down-payment search never exceeds this share of the unit price
const DOWN_PAYMENT_CEILING: f64 = 0.5;
/// Default installment count accepted on empty input
const DEFAULT_INSTALLMENT_COUNT: u32 = 24;

/// Output of one processed turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    /// Present when this turn produced or re-produced a solved plan
    pub result: Option<NpvResult>,
    pub context: ConversationContext,
}

/// Internal per-turn step result before reassembling the context
struct Step {
    state: ConversationState,
    reply: String,
    result: Option<NpvResult>,
}

impl Step {
    fn stay(state: ConversationState, reply: impl Into<String>) -> Self {
        Self {
            state,
            reply: reply.into(),
            result: None,
        }
    }
}

/// Process one buyer utterance against the current session context
pub fn process_turn(
    utterance: &str,
    mut context: ConversationContext,
    catalog: &[Property],
) -> TurnOutcome {
    let text = utterance.trim();

    // Greeting/restart and help win over everything, in any state
    if parse::is_greeting(text) {
        context.reset();
        return TurnOutcome {
            reply: greeting_reply(),
            result: None,
            context,
        };
    }
    if parse::is_help(text) {
        let reply = format!("{}\n\n{}", help_reply(), prompt_for(&context.state));
        return TurnOutcome {
            reply,
            result: None,
            context,
        };
    }

    let state = std::mem::replace(&mut context.state, ConversationState::CollectingProperty);

    let step = match parse::detect_property_id(text) {
        Some(id) => handle_property_id(&id, state, &mut context, catalog),
        None => handle_slot(text, state, &mut context, catalog),
    };

    debug!("turn -> {}", variant_name(&step.state));
    context.state = step.state;
    TurnOutcome {
        reply: step.reply,
        result: step.result,
        context,
    }
}

/// An utterance containing a unit identifier, ordered per the turn contract:
/// accept when a unit is awaited, restate mid-collection, reset from the
/// terminal and negotiation states
fn handle_property_id(
    id: &str,
    state: ConversationState,
    context: &mut ConversationContext,
    catalog: &[Property],
) -> Step {
    match state {
        ConversationState::CollectingProperty => match find_property(catalog, id) {
            Some(property) => accept_property(property),
            None => Step::stay(
                ConversationState::CollectingProperty,
                format!("I couldn't find unit {} in the catalog. {}", id, property_prompt()),
            ),
        },

        // A unit is already on the table mid-collection: hold course
        state @ (ConversationState::CollectingRate { .. }
        | ConversationState::AwaitingRateUnit { .. }
        | ConversationState::CollectingDownAmount { .. }
        | ConversationState::CollectingDownYear { .. }
        | ConversationState::CollectingDownMonth { .. }
        | ConversationState::CollectingInstallmentCount { .. }) => {
            let reply = format!(
                "Let's finish the current plan for {} first. {}",
                state.property_id().unwrap_or_default(),
                prompt_for(&state)
            );
            Step::stay(state, reply)
        }

        // Picking a listed candidate by id is a selection, not a restart
        ConversationState::ShowingAlternatives {
            property_id,
            params,
            desired_installment,
            candidates,
        } => {
            if let Some(pick) = candidates
                .iter()
                .find(|c| c.property.id.eq_ignore_ascii_case(id))
                .cloned()
            {
                return select_alternative(&pick, params, context, catalog);
            }
            match find_property(catalog, id) {
                Some(property) => restart_with_property(property, context),
                None => {
                    let reply = format!(
                        "Unit {} is not in the catalog. Pick one of the listed options:\n{}",
                        id,
                        list_candidates(&candidates)
                    );
                    Step::stay(
                        ConversationState::ShowingAlternatives {
                            property_id,
                            params,
                            desired_installment,
                            candidates,
                        },
                        reply,
                    )
                }
            }
        }

        state @ (ConversationState::Completed { .. }
        | ConversationState::AwaitingLowerInstallment { .. }) => match find_property(catalog, id) {
            Some(property) => restart_with_property(property, context),
            None => Step::stay(
                state,
                format!("I couldn't find unit {} in the catalog.", id),
            ),
        },
    }
}

/// Parse the value the active slot expects, or restate its prompt
fn handle_slot(
    text: &str,
    state: ConversationState,
    context: &mut ConversationContext,
    catalog: &[Property],
) -> Step {
    let start = context.start;
    match state {
        ConversationState::CollectingProperty => {
            Step::stay(ConversationState::CollectingProperty, property_prompt())
        }

        ConversationState::CollectingRate {
            property_id,
            pending_unit,
        } => match parse::parse_rate(text) {
            Some(RateUtterance::WithUnit { fraction, unit }) => {
                accept_rate(property_id, fraction, unit)
            }
            Some(RateUtterance::Ambiguous { fraction }) => match pending_unit {
                Some(unit) => accept_rate(property_id, fraction, unit),
                None => Step::stay(
                    ConversationState::AwaitingRateUnit {
                        property_id,
                        value: fraction,
                    },
                    format!(
                        "Is that {:.2}% an annual or a monthly rate?",
                        fraction * 100.0
                    ),
                ),
            },
            None => match parse::parse_rate_unit(text) {
                Some(unit) => {
                    let question = match unit {
                        RateUnit::Monthly => "What is the monthly rate? e.g. \"2\" for 2%.",
                        RateUnit::Annual => "What is the annual rate? e.g. \"24\" for 24%.",
                    };
                    Step::stay(
                        ConversationState::CollectingRate {
                            property_id,
                            pending_unit: Some(unit),
                        },
                        question,
                    )
                }
                None => {
                    let state = ConversationState::CollectingRate {
                        property_id,
                        pending_unit,
                    };
                    let reply = prompt_for(&state);
                    Step::stay(state, reply)
                }
            },
        },

        ConversationState::AwaitingRateUnit { property_id, value } => match parse::parse_rate(text)
        {
            Some(RateUtterance::WithUnit { fraction, unit }) => {
                accept_rate(property_id, fraction, unit)
            }
            _ => match parse::parse_rate_unit(text) {
                Some(unit) => accept_rate(property_id, value, unit),
                None => Step::stay(
                    ConversationState::AwaitingRateUnit { property_id, value },
                    format!(
                        "Sorry, I need to know the unit: is {:.2}% annual or monthly?",
                        value * 100.0
                    ),
                ),
            },
        },

        ConversationState::CollectingDownAmount {
            property_id,
            monthly_rate,
        } => {
            let Some(property) = find_property(catalog, &property_id) else {
                return missing_unit_step(&property_id);
            };
            match parse::parse_amount(text) {
                Some(amount) if amount > property.cash_price => {
                    let reply = format!(
                        "The down payment can't exceed the unit price of {:.0}. How much can you pay up front?",
                        property.cash_price
                    );
                    Step::stay(
                        ConversationState::CollectingDownAmount {
                            property_id,
                            monthly_rate,
                        },
                        reply,
                    )
                }
                Some(amount) => Step::stay(
                    ConversationState::CollectingDownYear {
                        property_id,
                        monthly_rate,
                        down_payment: amount,
                    },
                    format!(
                        "Noted, {:.0} down. In which year will you pay it? (empty = {})",
                        amount, start.year
                    ),
                ),
                None => Step::stay(
                    ConversationState::CollectingDownAmount {
                        property_id,
                        monthly_rate,
                    },
                    "How much can you pay as a down payment? Give me an amount.",
                ),
            }
        }

        ConversationState::CollectingDownYear {
            property_id,
            monthly_rate,
            down_payment,
        } => {
            let year = if text.is_empty() {
                Some(start.year)
            } else {
                parse::parse_year(text)
            };
            match year {
                Some(down_year) => Step::stay(
                    ConversationState::CollectingDownMonth {
                        property_id,
                        monthly_rate,
                        down_payment,
                        down_year,
                    },
                    format!(
                        "And in which month of {}? (empty = {})",
                        down_year, start.month
                    ),
                ),
                None => Step::stay(
                    ConversationState::CollectingDownYear {
                        property_id,
                        monthly_rate,
                        down_payment,
                    },
                    "Which year will the down payment be paid in? e.g. 2026 (empty = this year).",
                ),
            }
        }

        ConversationState::CollectingDownMonth {
            property_id,
            monthly_rate,
            down_payment,
            down_year,
        } => {
            let month = if text.is_empty() {
                Some(start.month)
            } else {
                parse::parse_month(text)
            };
            let Some(month) = month else {
                return Step::stay(
                    ConversationState::CollectingDownMonth {
                        property_id,
                        monthly_rate,
                        down_payment,
                        down_year,
                    },
                    "Which month, 1-12? (empty = current month).",
                );
            };
            let down_payment_month = YearMonth::new(down_year, month);
            if months_between(start, down_payment_month) < 0 {
                return Step::stay(
                    ConversationState::CollectingDownMonth {
                        property_id,
                        monthly_rate,
                        down_payment,
                        down_year,
                    },
                    format!(
                        "{} is before the plan start ({}). When will the down payment actually be paid?",
                        down_payment_month, start
                    ),
                );
            }
            Step::stay(
                ConversationState::CollectingInstallmentCount {
                    property_id,
                    monthly_rate,
                    down_payment,
                    down_payment_month,
                },
                format!(
                    "Down payment of {:.0} in {}. Over how many monthly installments? (empty = {})",
                    down_payment, down_payment_month, DEFAULT_INSTALLMENT_COUNT
                ),
            )
        }

        ConversationState::CollectingInstallmentCount {
            property_id,
            monthly_rate,
            down_payment,
            down_payment_month,
        } => {
            let count = if text.is_empty() {
                Some(DEFAULT_INSTALLMENT_COUNT)
            } else {
                parse::parse_count(text)
            };
            let Some(installment_count) = count else {
                return Step::stay(
                    ConversationState::CollectingInstallmentCount {
                        property_id,
                        monthly_rate,
                        down_payment,
                        down_payment_month,
                    },
                    "How many monthly installments? Give me a whole number, e.g. 24.",
                );
            };
            let params = FinancingParameters {
                monthly_rate,
                down_payment,
                down_payment_month,
                installment_count,
            };
            let fallback = ConversationState::CollectingInstallmentCount {
                property_id: property_id.clone(),
                monthly_rate,
                down_payment,
                down_payment_month,
            };
            solve_and_complete(&property_id, params, fallback, context, catalog)
        }

        ConversationState::Completed {
            property_id,
            params,
        } => {
            if parse::is_lower_installment_request(text) {
                return Step::stay(
                    ConversationState::AwaitingLowerInstallment {
                        property_id,
                        params,
                        pending: None,
                    },
                    "Understood. What monthly installment would work for you?",
                );
            }
            Step::stay(
                ConversationState::Completed {
                    property_id,
                    params,
                },
                "Your plan is ready. Tell me if the installment is too high, or give me another unit id to start a new plan.",
            )
        }

        ConversationState::AwaitingLowerInstallment {
            property_id,
            params,
            pending,
        } => handle_lower_installment(text, property_id, params, pending, context, catalog),

        ConversationState::ShowingAlternatives {
            property_id,
            params,
            desired_installment,
            candidates,
        } => match parse::parse_ordinal(text) {
            Some(position) if (1..=candidates.len()).contains(&position) => {
                let pick = candidates[position - 1].clone();
                select_alternative(&pick, params, context, catalog)
            }
            Some(position) => {
                let reply = format!(
                    "There is no option {}. Pick one of these:\n{}",
                    position,
                    list_candidates(&candidates)
                );
                Step::stay(
                    ConversationState::ShowingAlternatives {
                        property_id,
                        params,
                        desired_installment,
                        candidates,
                    },
                    reply,
                )
            }
            None => {
                let reply = format!(
                    "Pick an option by number or unit id:\n{}",
                    list_candidates(&candidates)
                );
                Step::stay(
                    ConversationState::ShowingAlternatives {
                        property_id,
                        params,
                        desired_installment,
                        candidates,
                    },
                    reply,
                )
            }
        },
    }
}

/// Negotiation turn: confirm a pending down-payment proposal, or take the
/// desired installment and search for alternatives
fn handle_lower_installment(
    text: &str,
    property_id: String,
    params: FinancingParameters,
    pending: Option<DownPaymentProposal>,
    context: &mut ConversationContext,
    catalog: &[Property],
) -> Step {
    if let Some(proposal) = pending {
        if parse::is_affirmative(text) {
            let committed = FinancingParameters {
                down_payment: proposal.suggested_down_payment,
                ..params
            };
            let fallback = ConversationState::AwaitingLowerInstallment {
                property_id: property_id.clone(),
                params,
                pending: Some(proposal),
            };
            return solve_and_complete(&property_id, committed, fallback, context, catalog);
        }
    }

    let Some(desired) = parse::parse_amount(text) else {
        let reply = match pending {
            Some(proposal) => format!(
                "Say \"yes\" to raise the down payment to {:.0}, or give me the installment you're aiming for.",
                proposal.suggested_down_payment
            ),
            None => "Give me the monthly installment you're aiming for, as a number.".to_string(),
        };
        return Step::stay(
            ConversationState::AwaitingLowerInstallment {
                property_id,
                params,
                pending,
            },
            reply,
        );
    };

    let config = MatcherConfig::default();
    let terms = params.terms(context.start);
    let candidates = find_alternatives(catalog, &property_id, desired, &terms, &config);

    if !candidates.is_empty() {
        let reply = format!(
            "These units come close to {:.0}/month with the same down payment and term:\n{}\nPick one by number or unit id.",
            desired,
            list_candidates(&candidates)
        );
        return Step::stay(
            ConversationState::ShowingAlternatives {
                property_id,
                params,
                desired_installment: desired,
                candidates,
            },
            reply,
        );
    }

    // Nothing comparable in the catalog: illustrate a longer term, and try
    // raising the down payment toward the desired installment
    let Some(property) = find_property(catalog, &property_id) else {
        return missing_unit_step(&property_id);
    };

    let extended = illustrate_extended_term(property, &params, context.start);
    let suggested = search_down_payment(property, &params, desired, context.start, config.tolerance);

    match suggested {
        Some((down, installment)) => {
            let reply = format!(
                "No other unit lands near {:.0}/month. Two options on {}:\n\
                 1. Extend the term to {} months{}.\n\
                 2. Raise the down payment to {:.0}, which brings the installment to about {:.0}/month.\n\
                 Shall I apply the higher down payment? (yes/no)",
                desired,
                property.id,
                params.installment_count + TERM_EXTENSION_MONTHS,
                extended
                    .map(|t| format!(", about {:.0}/month", t))
                    .unwrap_or_default(),
                down,
                installment,
            );
            Step::stay(
                ConversationState::AwaitingLowerInstallment {
                    property_id,
                    params,
                    pending: Some(DownPaymentProposal {
                        desired_installment: desired,
                        suggested_down_payment: down,
                    }),
                },
                reply,
            )
        }
        None => {
            let reply = format!(
                "No other unit lands near {:.0}/month, and no reasonable down payment gets {} there either. \
                 Extending the term to {} months{} is the closest I can offer; or give me a different target.",
                desired,
                property.id,
                params.installment_count + TERM_EXTENSION_MONTHS,
                extended
                    .map(|t| format!(" (about {:.0}/month)", t))
                    .unwrap_or_default(),
            );
            Step::stay(
                ConversationState::AwaitingLowerInstallment {
                    property_id,
                    params,
                    pending: None,
                },
                reply,
            )
        }
    }
}

/// Concurrent-model installment if the term were 12 months longer
fn illustrate_extended_term(
    property: &Property,
    params: &FinancingParameters,
    start: YearMonth,
) -> Option<f64> {
    let extended = FinancingParameters {
        installment_count: params.installment_count + TERM_EXTENSION_MONTHS,
        ..*params
    };
    solve(
        SolveTarget::PresentValue(property.cash_price),
        &extended.terms(start),
    )
    .ok()
    .map(|r| r.concurrent.installment)
}

/// Walk the down payment up in fixed steps, capped at half the unit price,
/// for the smallest amount whose installment lands within `tolerance` of
/// `desired`. The cap keeps the search bounded.
fn search_down_payment(
    property: &Property,
    params: &FinancingParameters,
    desired: f64,
    start: YearMonth,
    tolerance: f64,
) -> Option<(f64, f64)> {
    let ceiling = property.cash_price * DOWN_PAYMENT_CEILING;
    let mut down = params.down_payment + DOWN_PAYMENT_STEP;

    while down <= ceiling {
        let trial = FinancingParameters {
            down_payment: down,
            ..*params
        };
        if let Ok(result) = solve(
            SolveTarget::PresentValue(property.cash_price),
            &trial.terms(start),
        ) {
            let installment = result.concurrent.installment;
            if installment > 0.0 && (installment - desired).abs() <= tolerance {
                return Some((down, installment));
            }
        }
        down += DOWN_PAYMENT_STEP;
    }
    None
}

/// Solve against the unit's price and move to the terminal state, or report
/// why the inputs don't make a valid plan and stay put
fn solve_and_complete(
    property_id: &str,
    params: FinancingParameters,
    fallback: ConversationState,
    context: &mut ConversationContext,
    catalog: &[Property],
) -> Step {
    let Some(property) = find_property(catalog, property_id) else {
        return missing_unit_step(property_id);
    };
    if params.down_payment > property.cash_price {
        return Step::stay(
            fallback,
            format!(
                "A down payment of {:.0} exceeds the price of {} ({:.0}).",
                params.down_payment, property.id, property.cash_price
            ),
        );
    }

    let result = match solve(
        SolveTarget::PresentValue(property.cash_price),
        &params.terms(context.start),
    ) {
        Ok(result) => result,
        Err(error) => {
            warn!("solver failed for {}: {}", property.id, error);
            return Step::stay(
                fallback,
                "Something went wrong computing that plan. Let's try again with different numbers.",
            );
        }
    };

    let price = property.cash_price;
    let invalid = [&result.concurrent, &result.skip].iter().any(|model| {
        model.installment < 0.0 || model.nominal_total - price < 0.0
    });
    if invalid {
        return Step::stay(
            fallback,
            "Those numbers don't produce a workable plan (the installment or implied interest comes out negative). Try a smaller down payment or a different term.",
        );
    }

    let reply = format_plan(property, &params, &result);
    context.last_result = Some(result.clone());
    Step {
        state: ConversationState::Completed {
            property_id: property.id.clone(),
            params,
        },
        reply,
        result: Some(result),
    }
}

fn accept_property(property: &Property) -> Step {
    Step::stay(
        ConversationState::CollectingRate {
            property_id: property.id.clone(),
            pending_unit: None,
        },
        format!(
            "{} - {} {}, {} rooms, {:.0} sqm, {}, cash price {:.0}.\nWhat discount rate should we use? Tell me the number and whether it's annual or monthly.",
            property.id,
            property.city,
            property.district,
            property.rooms,
            property.area_sqm,
            property.delivery_label,
            property.cash_price
        ),
    )
}

/// Fresh plan on a different unit, keeping only the start reference
fn restart_with_property(property: &Property, context: &mut ConversationContext) -> Step {
    context.last_result = None;
    let step = accept_property(property);
    Step::stay(
        step.state,
        format!("Starting a new plan.\n{}", step.reply),
    )
}

fn accept_rate(property_id: String, fraction: f64, unit: RateUnit) -> Step {
    let monthly_rate = match unit {
        RateUnit::Monthly => fraction,
        RateUnit::Annual => annual_to_monthly_rate(fraction),
    };
    debug!(
        "rate accepted: {:.6} monthly (given as {:?})",
        monthly_rate, unit
    );
    Step::stay(
        ConversationState::CollectingDownAmount {
            property_id,
            monthly_rate,
        },
        format!(
            "Using a monthly rate of {:.3}%. How much can you pay as a down payment?",
            monthly_rate * 100.0
        ),
    )
}

fn select_alternative(
    pick: &AlternativeMatch,
    params: FinancingParameters,
    context: &mut ConversationContext,
    catalog: &[Property],
) -> Step {
    debug!("alternative selected: {}", pick.property.id);
    let fallback = ConversationState::CollectingProperty;
    let step = solve_and_complete(&pick.property.id, params, fallback, context, catalog);
    if step.result.is_none() {
        // Re-solve against the picked unit failed; let the buyer start over
        return Step::stay(
            ConversationState::CollectingProperty,
            format!("{}\n{}", step.reply, property_prompt()),
        );
    }
    step
}

fn missing_unit_step(property_id: &str) -> Step {
    Step::stay(
        ConversationState::CollectingProperty,
        format!(
            "Unit {} is no longer in the catalog. {}",
            property_id,
            property_prompt()
        ),
    )
}

fn format_plan(property: &Property, params: &FinancingParameters, result: &NpvResult) -> String {
    format!(
        "Here is your plan for {} (cash price {:.0}):\n\
         Down payment: {:.0} in {}\n\
         Option A (installments every month): {:.0}/month x {} - total {:.0}\n\
         Option B (no installment in the down-payment month): {:.0}/month x {} - total {:.0}\n\
         If the installment is too high, just say so.",
        property.id,
        property.cash_price,
        params.down_payment,
        params.down_payment_month,
        result.concurrent.installment,
        params.installment_count,
        result.concurrent.nominal_total,
        result.skip.installment,
        params.installment_count,
        result.skip.nominal_total,
    )
}

fn list_candidates(candidates: &[AlternativeMatch]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "{}. {} - {} {}, {:.0}/month, price {:.0}, {}",
                i + 1,
                c.property.id,
                c.property.city,
                c.property.district,
                c.installment,
                c.property.cash_price,
                c.property.delivery_label,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn property_prompt() -> String {
    "Which unit are you interested in? Give me its id, e.g. NC-T4-102.".to_string()
}

fn greeting_reply() -> String {
    format!("Hello! I can work out a seller-financing plan for you. {}", property_prompt())
}

fn help_reply() -> String {
    "I collect a unit id, a discount rate, your down payment and its date, and the number of \
     monthly installments, then I compute the plan two ways (with and without an installment in \
     the down-payment month). If the result is too high, I can look for comparable units or \
     adjust the terms. Say \"restart\" at any point to begin again."
        .to_string()
}

/// Question for the active slot, used when restating
fn prompt_for(state: &ConversationState) -> String {
    match state {
        ConversationState::CollectingProperty => property_prompt(),
        ConversationState::CollectingRate { pending_unit, .. } => match pending_unit {
            Some(RateUnit::Monthly) => "What is the monthly rate? e.g. \"2\" for 2%.".to_string(),
            Some(RateUnit::Annual) => "What is the annual rate? e.g. \"24\" for 24%.".to_string(),
            None => "What discount rate should we use? Tell me the number and whether it's annual or monthly.".to_string(),
        },
        ConversationState::AwaitingRateUnit { value, .. } => {
            format!("Is that {:.2}% an annual or a monthly rate?", value * 100.0)
        }
        ConversationState::CollectingDownAmount { .. } => {
            "How much can you pay as a down payment?".to_string()
        }
        ConversationState::CollectingDownYear { .. } => {
            "Which year will the down payment be paid in?".to_string()
        }
        ConversationState::CollectingDownMonth { .. } => "Which month, 1-12?".to_string(),
        ConversationState::CollectingInstallmentCount { .. } => {
            "Over how many monthly installments?".to_string()
        }
        ConversationState::Completed { .. } => {
            "Your plan is ready. Tell me if the installment is too high, or give me another unit id.".to_string()
        }
        ConversationState::AwaitingLowerInstallment { .. } => {
            "What monthly installment would work for you?".to_string()
        }
        ConversationState::ShowingAlternatives { .. } => {
            "Pick an option by number or unit id.".to_string()
        }
    }
}

/// Short state tag for logs
fn variant_name(state: &ConversationState) -> &'static str {
    match state {
        ConversationState::CollectingProperty => "collecting_property",
        ConversationState::CollectingRate { .. } => "collecting_rate",
        ConversationState::AwaitingRateUnit { .. } => "awaiting_rate_unit",
        ConversationState::CollectingDownAmount { .. } => "collecting_down_amount",
        ConversationState::CollectingDownYear { .. } => "collecting_down_year",
        ConversationState::CollectingDownMonth { .. } => "collecting_down_month",
        ConversationState::CollectingInstallmentCount { .. } => "collecting_installment_count",
        ConversationState::Completed { .. } => "completed",
        ConversationState::AwaitingLowerInstallment { .. } => "awaiting_lower_installment",
        ConversationState::ShowingAlternatives { .. } => "showing_alternatives",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sample_catalog;
    use approx::assert_relative_eq;

    fn ctx() -> ConversationContext {
        ConversationContext::with_start(YearMonth::new(2025, 6))
    }

    fn run(utterances: &[&str], catalog: &[Property]) -> TurnOutcome {
        let mut context = ctx();
        let mut last = None;
        for u in utterances {
            let outcome = process_turn(u, context, catalog);
            context = outcome.context.clone();
            last = Some(outcome);
        }
        last.expect("at least one utterance")
    }

    #[test]
    fn test_happy_path_scenario() {
        let catalog = sample_catalog();
        let outcome = run(
            &["hello", "NC-T4-102", "monthly", "2", "500000", "", "", "24"],
            &catalog,
        );

        assert!(matches!(
            outcome.context.state,
            ConversationState::Completed { .. }
        ));
        let result = outcome.result.expect("a solved plan");
        assert!(result.concurrent.installment > 0.0);
        assert!(outcome.context.last_result.is_some());
    }

    #[test]
    fn test_defaults_match_start_month() {
        let catalog = sample_catalog();
        let outcome = run(
            &["NC-T4-102", "2% monthly", "500000", "", "", ""],
            &catalog,
        );

        let ConversationState::Completed { params, .. } = &outcome.context.state else {
            panic!("expected completed, got {:?}", outcome.context.state);
        };
        assert_eq!(params.down_payment_month, YearMonth::new(2025, 6));
        assert_eq!(params.installment_count, 24);
    }

    #[test]
    fn test_annual_rate_converted() {
        let catalog = sample_catalog();
        let outcome = run(&["NC-T4-102", "26.8% annual"], &catalog);

        let ConversationState::CollectingDownAmount { monthly_rate, .. } = outcome.context.state
        else {
            panic!("expected down-amount state");
        };
        assert_relative_eq!(monthly_rate, annual_to_monthly_rate(0.268), epsilon = 1e-12);
    }

    #[test]
    fn test_ambiguous_rate_asks_for_unit() {
        let catalog = sample_catalog();
        let outcome = run(&["NC-T4-102", "2"], &catalog);
        assert!(matches!(
            outcome.context.state,
            ConversationState::AwaitingRateUnit { .. }
        ));

        let outcome = process_turn("monthly", outcome.context, &catalog);
        let ConversationState::CollectingDownAmount { monthly_rate, .. } = outcome.context.state
        else {
            panic!("unit answer should resolve the rate");
        };
        assert_relative_eq!(monthly_rate, 0.02);
    }

    #[test]
    fn test_down_payment_above_price_rejected() {
        let catalog = sample_catalog();
        // NC-T4-102 costs 4.2m
        let outcome = run(&["NC-T4-102", "2% monthly", "9000000"], &catalog);

        assert!(matches!(
            outcome.context.state,
            ConversationState::CollectingDownAmount { .. }
        ));
        assert!(outcome.reply.contains("can't exceed"));
    }

    #[test]
    fn test_down_payment_date_before_start_rejected() {
        let catalog = sample_catalog();
        // Session starts 2025-06; try paying the down payment in 2025-01
        let outcome = run(
            &["NC-T4-102", "2% monthly", "500000", "2025", "1"],
            &catalog,
        );

        assert!(matches!(
            outcome.context.state,
            ConversationState::CollectingDownMonth { .. }
        ));
        assert!(outcome.reply.contains("before the plan start"));
    }

    #[test]
    fn test_unknown_property_reprompts() {
        let catalog = sample_catalog();
        let outcome = run(&["XX-Q9-999"], &catalog);
        assert!(matches!(
            outcome.context.state,
            ConversationState::CollectingProperty
        ));
        assert!(outcome.reply.contains("couldn't find"));
    }

    #[test]
    fn test_property_id_mid_collection_restates() {
        let catalog = sample_catalog();
        let outcome = run(&["NC-T4-102", "2% monthly", "ZD-A1-077"], &catalog);

        // Still collecting the down amount for the original unit
        let ConversationState::CollectingDownAmount { property_id, .. } = &outcome.context.state
        else {
            panic!("state should not change mid-collection");
        };
        assert_eq!(property_id, "NC-T4-102");
    }

    #[test]
    fn test_new_property_after_completion_restarts_at_rate() {
        let catalog = sample_catalog();
        let outcome = run(
            &["NC-T4-102", "2% monthly", "500000", "", "", "24", "ZD-A1-077"],
            &catalog,
        );

        let ConversationState::CollectingRate { property_id, .. } = &outcome.context.state else {
            panic!("expected a fresh rate collection");
        };
        assert_eq!(property_id, "ZD-A1-077");
        assert!(outcome.context.last_result.is_none());
    }

    #[test]
    fn test_negotiation_lists_alternatives_and_selects() {
        let catalog = sample_catalog();
        let mut context = run(
            &["NC-T4-102", "2% monthly", "500000", "", "", "24", "too high"],
            &catalog,
        )
        .context;
        assert!(matches!(
            context.state,
            ConversationState::AwaitingLowerInstallment { .. }
        ));

        // Target the installment the 3.1m unit solves to exactly
        let desired = solve(
            SolveTarget::PresentValue(3_100_000.0),
            &FinancingParameters {
                monthly_rate: 0.02,
                down_payment: 500_000.0,
                down_payment_month: YearMonth::new(2025, 6),
                installment_count: 24,
            }
            .terms(YearMonth::new(2025, 6)),
        )
        .unwrap()
        .concurrent
        .installment;

        let outcome = process_turn(&format!("{:.0}", desired), context, &catalog);
        let ConversationState::ShowingAlternatives { ref candidates, .. } = outcome.context.state
        else {
            panic!("expected alternatives, got: {}", outcome.reply);
        };
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.property.id != "NC-T4-102"));
        context = outcome.context;

        let outcome = process_turn("1", context, &catalog);
        assert!(matches!(
            outcome.context.state,
            ConversationState::Completed { .. }
        ));
        assert!(outcome.result.is_some());
    }

    #[test]
    fn test_negotiation_without_candidates_proposes_down_payment() {
        // Catalog with only one other, far-off unit: matcher finds nothing
        let catalog = vec![
            sample_catalog().into_iter().find(|p| p.id == "NC-T4-102").unwrap(),
            sample_catalog().into_iter().find(|p| p.id == "ZD-A3-031").unwrap(),
        ];
        let context = run(
            &["NC-T4-102", "2% monthly", "500000", "", "", "24", "too high"],
            &catalog,
        )
        .context;

        // Current installment is ~190k/month; ask for slightly less so the
        // bounded down-payment search can reach it
        let outcome = process_turn("185000", context, &catalog);
        let ConversationState::AwaitingLowerInstallment { ref pending, .. } = outcome.context.state
        else {
            panic!("expected to stay in negotiation, got: {}", outcome.reply);
        };
        let proposal = pending.expect("a down-payment proposal");
        assert!(proposal.suggested_down_payment > 500_000.0);
        assert!(proposal.suggested_down_payment <= 4_200_000.0 * 0.5);

        // Affirmative commits the proposal and completes
        let outcome = process_turn("yes, deal", outcome.context, &catalog);
        let ConversationState::Completed { params, .. } = outcome.context.state else {
            panic!("confirmation should complete the plan");
        };
        assert_relative_eq!(params.down_payment, proposal.suggested_down_payment);
        let result = outcome.result.expect("re-solved plan");
        assert!((result.concurrent.installment - 185_000.0).abs() <= 5_000.0);
    }

    #[test]
    fn test_greeting_resets_everything() {
        let catalog = sample_catalog();
        let outcome = run(
            &["NC-T4-102", "2% monthly", "500000", "", "", "24", "hello"],
            &catalog,
        );

        assert_eq!(outcome.context.state, ConversationState::CollectingProperty);
        assert!(outcome.context.last_result.is_none());
    }

    #[test]
    fn test_help_does_not_mutate_state() {
        let catalog = sample_catalog();
        let before = run(&["NC-T4-102", "2% monthly"], &catalog).context;
        let outcome = process_turn("help", before.clone(), &catalog);

        assert_eq!(outcome.context.state, before.state);
        assert!(outcome.reply.to_lowercase().contains("down payment"));
    }
}
