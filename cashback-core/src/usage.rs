//! Usage aggregation: per-card spend, cashback, cap and minimum-spend progress
//! projected from a transaction snapshot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::catalog::{Card, Catalog};
use crate::finance::Transaction;
use crate::period::AccountingPeriod;

/// Derived per-card status for one accounting period. Never stored; always
/// recomputed from the transaction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardUsageStatus {
    pub card_id: String,
    pub total_spent: f64,
    pub total_cashback: f64,
    pub transaction_count: usize,
    pub min_spend: f64,
    pub met_min_spend: bool,
    pub remaining_min_spend: f64,
    /// `None` when the card is uncapped.
    pub remaining_cap: Option<f64>,
}

impl CardUsageStatus {
    pub fn is_capped_out(&self) -> bool {
        self.remaining_cap == Some(0.0)
    }
}

/// One status per catalog card, in catalog order. Cards without
/// transactions get zero-valued entries. Transactions on cards missing from
/// the catalog are skipped.
pub fn derive_usage<P>(
    transactions: &[Transaction],
    catalog: &Catalog,
    period: &P,
) -> Vec<CardUsageStatus>
where
    P: AccountingPeriod + ?Sized,
{
    let mut by_card: HashMap<&str, Vec<&Transaction>> = HashMap::new();
    for tx in transactions.iter().filter(|t| period.contains(t.date)) {
        if !catalog.contains(&tx.card_id) {
            warn!(tx = %tx.id, card = %tx.card_id, "transaction references unknown card; skipped");
            continue;
        }
        by_card.entry(tx.card_id.as_str()).or_default().push(tx);
    }

    let statuses: Vec<CardUsageStatus> = catalog
        .cards()
        .iter()
        .map(|card| {
            let txs = by_card.get(card.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            usage_for_card(card, txs)
        })
        .collect();

    debug!(cards = statuses.len(), "derived card usage");
    statuses
}

pub(crate) fn usage_for_card(card: &Card, txs: &[&Transaction]) -> CardUsageStatus {
    let total_spent = stable_sum(txs.iter().map(|t| t.amount));
    let total_cashback = stable_sum(txs.iter().map(|t| t.cashback_earned));

    let remaining_cap = card
        .has_cap()
        .then(|| (card.max_cashback - total_cashback).max(0.0));

    CardUsageStatus {
        card_id: card.id.clone(),
        total_spent,
        total_cashback,
        transaction_count: txs.len(),
        min_spend: card.min_spend,
        met_min_spend: total_spent >= card.min_spend,
        remaining_min_spend: (card.min_spend - total_spent).max(0.0),
        remaining_cap,
    }
}

/// Floating-point addition is not associative, so values are summed in
/// sorted order to make the result independent of input order.
pub(crate) fn stable_sum(values: impl Iterator<Item = f64>) -> f64 {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}

pub fn usage_for<'a>(usage: &'a [CardUsageStatus], card_id: &str) -> Option<&'a CardUsageStatus> {
    usage.iter().find(|u| u.card_id == card_id)
}

/// Cashback already attributed to a card this period; 0 when unknown.
pub fn accumulated_cashback(usage: &[CardUsageStatus], card_id: &str) -> f64 {
    usage_for(usage, card_id).map_or(0.0, |u| u.total_cashback)
}

/// The card still short of its minimum spend that is closest to reaching
/// it. `None` once every minimum-spend target is met.
pub fn next_min_spend_target(usage: &[CardUsageStatus]) -> Option<&CardUsageStatus> {
    usage
        .iter()
        .filter(|u| u.min_spend > 0.0 && !u.met_min_spend)
        .min_by(|a, b| a.remaining_min_spend.total_cmp(&b.remaining_min_spend))
}
