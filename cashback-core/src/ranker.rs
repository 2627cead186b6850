//! Card ranking: evaluate every card for one prospective purchase.
//!
//! Ordering is by cashback descending. Equal rebates keep catalog order, so
//! the recommendation is deterministic.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::{check_amount, Result};
use crate::finance::Category;
use crate::rebate::{compute_rebate, CapOutcome};
use crate::usage::{accumulated_cashback, CardUsageStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCard {
    pub card_id: String,
    pub card_name: String,
    pub cashback_amount: f64,
    pub final_price: f64,
    pub rate: f64,
    pub reason: String,
    pub cap: CapOutcome,
    /// Capped out, as opposed to never eligible.
    pub is_maxed_out: bool,
}

/// Rank all catalog cards for `amount` spent in `category`. Index 0 is the
/// recommendation.
pub fn rank_cards(
    catalog: &Catalog,
    amount: f64,
    category: Category,
    usage: &[CardUsageStatus],
) -> Result<Vec<RankedCard>> {
    let amount = check_amount("amount", amount)?;

    let mut ranked = catalog
        .cards()
        .iter()
        .map(|card| {
            let accumulated = accumulated_cashback(usage, &card.id);
            let rebate = compute_rebate(card, amount, category, accumulated)?;
            Ok(RankedCard {
                card_id: card.id.clone(),
                card_name: card.name.clone(),
                cashback_amount: rebate.cashback,
                final_price: amount - rebate.cashback,
                rate: rebate.rate,
                is_maxed_out: rebate.cashback == 0.0 && amount > 0.0 && card.has_cap(),
                reason: rebate.reason,
                cap: rebate.cap,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // sort_by is stable: ties stay in catalog order
    ranked.sort_by(|a, b| b.cashback_amount.total_cmp(&a.cashback_amount));
    Ok(ranked)
}
