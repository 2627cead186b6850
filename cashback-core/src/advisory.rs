//! Plain-language descriptions of engine results, for an external text
//! advisor. The engine never reads the advisor's reply.

use std::fmt::Write as _;

use crate::catalog::Catalog;
use crate::finance::{format_percent, format_vnd, Category, Transaction};
use crate::ranker::RankedCard;
use crate::strategist::Plan;
use crate::usage::{usage_for, CardUsageStatus};

/// Shown in place of advisory text whenever the advisor fails or times out.
pub const ADVISORY_FALLBACK: &str = "Advisory text is unavailable right now.";

const ADVISOR_PERSONA: &str = "You are a personal finance adviser who helps a household in Vietnam \
get the most cashback from their credit cards. Be brief and concrete. The cashback figures you \
are given are already computed; do not recalculate or contradict them.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryRequest {
    pub system: String,
    pub prompt: String,
}

/// One sentence per card: remaining cap and minimum-spend progress.
pub fn describe_card_status(catalog: &Catalog, usage: &[CardUsageStatus]) -> String {
    catalog
        .cards()
        .iter()
        .map(|card| {
            let status = usage_for(usage, &card.id);
            let cap = match status.and_then(|u| u.remaining_cap) {
                Some(left) => format!("{} of cap left", format_vnd(left)),
                None if card.has_cap() => format!("{} of cap left", format_vnd(card.max_cashback)),
                None => "no cap".to_string(),
            };
            match status {
                Some(u) if u.min_spend > 0.0 && !u.met_min_spend => format!(
                    "{}: {}, {} more spend needed for the minimum",
                    card.name,
                    cap,
                    format_vnd(u.remaining_min_spend)
                ),
                _ => format!("{}: {}", card.name, cap),
            }
        })
        .collect::<Vec<_>>()
        .join(". ")
}

pub fn purchase_advice_request(
    amount: f64,
    category: Category,
    catalog: &Catalog,
    usage: &[CardUsageStatus],
    ranking: &[RankedCard],
) -> AdvisoryRequest {
    let mut prompt = format!(
        "I want to buy something for {} in the {} category.\nCurrent card status: {}.\n",
        format_vnd(amount),
        category,
        describe_card_status(catalog, usage)
    );

    if let Some(best) = ranking.first() {
        let _ = writeln!(
            prompt,
            "Computed best card: {} with {} cashback ({}).",
            best.card_name,
            format_vnd(best.cashback_amount),
            best.reason
        );
    }
    for r in ranking.iter().skip(1).take(3) {
        let _ = writeln!(
            prompt,
            "Alternative: {} with {} cashback.",
            r.card_name,
            format_vnd(r.cashback_amount)
        );
    }
    prompt.push_str("Briefly explain which card to use and anything to watch out for.");

    AdvisoryRequest {
        system: ADVISOR_PERSONA.to_string(),
        prompt,
    }
}

pub fn history_analysis_request(
    transactions: &[Transaction],
    catalog: &Catalog,
    usage: &[CardUsageStatus],
) -> AdvisoryRequest {
    let mut prompt = String::from("SPENDING HISTORY:\n");
    for t in transactions {
        let _ = writeln!(
            prompt,
            "- {}: {} ({}) - category {} - cashback {}",
            t.date,
            t.title,
            format_vnd(t.amount),
            t.category,
            format_vnd(t.cashback_earned)
        );
    }

    prompt.push_str("\nCARD STATUS:\n");
    for u in usage {
        let name = catalog.get(&u.card_id).map_or(u.card_id.as_str(), |c| c.name.as_str());
        let cap = u
            .remaining_cap
            .map_or_else(|| "no cap".to_string(), |left| format!("{} of cap left", format_vnd(left)));
        let _ = writeln!(
            prompt,
            "- {}: earned {}, {}",
            name,
            format_vnd(u.total_cashback),
            cap
        );
    }

    prompt.push_str(
        "\nPlease cover: (1) whether cashback was used well and which purchases went on the \
wrong card, (2) essential versus discretionary spending, (3) market versus supermarket \
shopping, (4) three concrete actions for next month.",
    );

    AdvisoryRequest {
        system: ADVISOR_PERSONA.to_string(),
        prompt,
    }
}

pub fn plan_advice_request(plan: &Plan) -> AdvisoryRequest {
    let mut prompt = format!(
        "Planned spend this month totals {}. Projected cashback: {}.\n",
        format_vnd(plan.total_spend),
        format_vnd(plan.total_projected_cashback)
    );
    if let Some(t) = plan.threshold {
        let state = if plan.threshold_unlocked { "reached" } else { "not reached" };
        let _ = writeln!(prompt, "Pooled card threshold of {} is {}.", format_vnd(t), state);
    }
    for e in &plan.entries {
        let _ = writeln!(
            prompt,
            "- {} ({}): {} at {} -> {}",
            e.item_name,
            format_vnd(e.amount),
            e.card_name,
            format_percent(e.rate),
            format_vnd(e.cashback)
        );
    }
    prompt.push_str("Suggest how to time or group these purchases; keep the card choices as given.");

    AdvisoryRequest {
        system: ADVISOR_PERSONA.to_string(),
        prompt,
    }
}
