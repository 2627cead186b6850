//! Batch strategy: assign a card to every planned purchase and pending bill.
//!
//! The pooled card's minimum spend is evaluated once against the whole
//! batch, because issuers judge it on aggregate monthly spend. Each item then
//! picks the best rate independently.
//!
//! Known limitation: assignment is greedy per item. Monthly caps are not
//! consulted across items, so two large items may both be routed to a card
//! whose cap only covers one of them. Changing that is a product decision.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bills::classify_bill;
use crate::catalog::{Card, Catalog};
use crate::error::{CashbackError, Result};
use crate::finance::{format_percent, format_vnd, Category, FinancialEvent, ShoppingItem};
use crate::rates::CardVariant;
use crate::usage::stable_sum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendSource {
    Shopping,
    Bill,
}

/// A planned spend from either source, normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub category: Category,
    pub date: NaiveDate,
    pub source: SpendSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub item_id: String,
    pub item_name: String,
    pub source: SpendSource,
    pub category: Category,
    pub amount: f64,
    pub card_id: String,
    pub card_name: String,
    pub rate: f64,
    pub cashback: f64,
    pub reason: String,
    /// Chosen because the batch unlocked the pooled rate.
    pub pooled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub entries: Vec<PlanEntry>,
    pub total_spend: f64,
    /// Minimum spend of the pooled card, if the catalog has one.
    pub threshold: Option<f64>,
    pub threshold_unlocked: bool,
    pub total_projected_cashback: f64,
}

impl Plan {
    /// Suggestion for one original item, for inline rendering.
    pub fn entry_for(&self, item_id: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.item_id == item_id)
    }
}

/// Merge unpurchased shopping items and pending bills into one list.
/// Bill categories are guessed from their titles.
pub fn gather_candidates(
    items: &[ShoppingItem],
    bills: &[FinancialEvent],
) -> Result<Vec<Candidate>> {
    let mut out = Vec::with_capacity(items.len() + bills.len());

    for item in items.iter().filter(|i| !i.is_purchased) {
        item.validate()?;
        out.push(Candidate {
            id: item.id.clone(),
            name: item.name.clone(),
            amount: item.estimated_price,
            category: item.category,
            date: item.planned_date,
            source: SpendSource::Shopping,
        });
    }

    for bill in bills {
        bill.validate()?;
        out.push(Candidate {
            id: bill.id.clone(),
            name: bill.title.clone(),
            amount: bill.amount,
            category: classify_bill(&bill.title),
            date: bill.date,
            source: SpendSource::Bill,
        });
    }

    Ok(out)
}

pub fn build_plan(
    items: &[ShoppingItem],
    bills: &[FinancialEvent],
    catalog: &Catalog,
) -> Result<Plan> {
    let candidates = gather_candidates(items, bills)?;
    plan_candidates(&candidates, catalog)
}

pub fn plan_candidates(candidates: &[Candidate], catalog: &Catalog) -> Result<Plan> {
    let total_spend = stable_sum(candidates.iter().map(|c| c.amount));
    let threshold = catalog.pooled_card().map(|c| c.min_spend);
    let threshold_unlocked = threshold.is_some_and(|t| total_spend >= t);

    let contenders = comparison_set(catalog, threshold_unlocked);
    if contenders.is_empty() && !candidates.is_empty() {
        return Err(CashbackError::InvalidCatalog(
            "no card is eligible to compete for planned spend".into(),
        ));
    }

    let mut entries = Vec::with_capacity(candidates.len());
    let mut total_projected_cashback = 0.0;

    for candidate in candidates {
        let Some((card, rate)) = best_contender(&contenders, candidate.category) else {
            continue;
        };
        let cashback = candidate.amount * rate;
        let pooled = card.variant.is_pooled();

        let reason = match threshold {
            Some(t) if pooled => format!(
                "batch spend {} reaches the {} threshold, unlocking the pooled {} rate",
                format_vnd(total_spend),
                format_vnd(t),
                format_percent(rate)
            ),
            _ => format!(
                "best per-category rate {} ({})",
                format_percent(rate),
                card.policy().rule_for(candidate.category).label
            ),
        };

        total_projected_cashback += cashback;
        entries.push(PlanEntry {
            item_id: candidate.id.clone(),
            item_name: candidate.name.clone(),
            source: candidate.source,
            category: candidate.category,
            amount: candidate.amount,
            card_id: card.id.clone(),
            card_name: card.name.clone(),
            rate,
            cashback,
            reason,
            pooled,
        });
    }

    debug!(
        items = entries.len(),
        total_spend,
        threshold_unlocked,
        total_projected_cashback,
        "built batch plan"
    );

    Ok(Plan {
        entries,
        total_spend,
        threshold,
        threshold_unlocked,
        total_projected_cashback,
    })
}

/// One card per rate variant, first in catalog order. Cash never competes,
/// and a pooled card only competes once its threshold is unlocked.
fn comparison_set(catalog: &Catalog, threshold_unlocked: bool) -> Vec<&Card> {
    let mut seen: Vec<CardVariant> = Vec::new();
    catalog
        .cards()
        .iter()
        .filter(|c| c.variant != CardVariant::Cash)
        .filter(|c| threshold_unlocked || !c.variant.is_pooled())
        .filter(|c| {
            if seen.contains(&c.variant) {
                false
            } else {
                seen.push(c.variant);
                true
            }
        })
        .collect()
}

/// Highest rate wins; the first listed card wins ties.
fn best_contender<'a>(contenders: &[&'a Card], category: Category) -> Option<(&'a Card, f64)> {
    let mut best: Option<(&'a Card, f64)> = None;
    for &card in contenders {
        let rate = card.policy().rate_for(category);
        match best {
            Some((_, best_rate)) if rate <= best_rate => {}
            _ => best = Some((card, rate)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::EventKind;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, d).unwrap()
    }

    fn item(id: &str, price: f64, category: Category) -> ShoppingItem {
        ShoppingItem::new(id, id, price, category, day(11))
    }

    fn bill(id: &str, title: &str, amount: f64) -> FinancialEvent {
        FinancialEvent::new(id, title, amount, day(5), EventKind::Expense)
    }

    #[test]
    fn test_gather_merges_sources_and_skips_purchased() {
        let mut bought = item("done", 100_000.0, Category::Shopee);
        bought.is_purchased = true;
        let items = vec![item("a", 200_000.0, Category::Shopee), bought];
        let bills = vec![bill("b1", "Tiền điện tháng 11", 900_000.0)];

        let candidates = gather_candidates(&items, &bills).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].source, SpendSource::Shopping);
        assert_eq!(candidates[1].category, Category::Electricity);
        assert_eq!(candidates[1].source, SpendSource::Bill);
    }

    #[test]
    fn test_gather_rejects_invalid_inputs() {
        let nameless = ShoppingItem::new("x", "", 10_000.0, Category::Online, day(1));
        assert_eq!(
            gather_candidates(&[nameless], &[]),
            Err(CashbackError::MissingField { field: "name" })
        );
        let free_bill = bill("b", "Internet", 0.0);
        assert!(gather_candidates(&[], &[free_bill]).is_err());
    }

    #[test]
    fn test_below_threshold_uses_category_rates() {
        let catalog = Catalog::builtin();
        let items = vec![
            item("shopee", 1_000_000.0, Category::Shopee),
            item("coop", 500_000.0, Category::Supermarket),
            item("cho", 200_000.0, Category::Market),
        ];
        let plan = build_plan(&items, &[], &catalog).unwrap();

        assert!(!plan.threshold_unlocked);
        assert_eq!(plan.threshold, Some(5_000_000.0));
        assert_eq!(plan.total_spend, 1_700_000.0);

        let shopee = plan.entry_for("shopee").unwrap();
        assert_eq!(shopee.card_id, "vp-shopee-plat-h");
        assert!(shopee.reason.starts_with("best per-category rate 10%"), "{}", shopee.reason);

        let coop = plan.entry_for("coop").unwrap();
        assert_eq!(coop.card_id, "tcb-everyday");
        assert_eq!(coop.rate, 0.05);

        let cho = plan.entry_for("cho").unwrap();
        assert_eq!(cho.card_id, "tcb-everyday");
        assert_eq!(cho.rate, 0.005);
        assert!(plan.entries.iter().all(|e| !e.pooled));
    }

    #[test]
    fn test_above_threshold_pools_everything() {
        let catalog = Catalog::builtin();
        let items = vec![
            item("tv", 4_000_000.0, Category::Online),
            item("coop", 600_000.0, Category::Supermarket),
        ];
        let bills = vec![bill("water", "Tiền nước", 400_000.0)];
        let plan = build_plan(&items, &bills, &catalog).unwrap();

        assert!(plan.threshold_unlocked);
        assert_eq!(plan.entries.len(), 3);
        for e in &plan.entries {
            assert_eq!(e.card_id, "vp-s-rewards-h");
            assert!(e.pooled);
            assert!(e.reason.contains("unlocking the pooled 12% rate"), "{}", e.reason);
        }
    }

    #[test]
    fn test_bill_category_drives_choice() {
        let catalog = Catalog::builtin();
        let bills = vec![bill("wifi", "Cước Wifi FPT", 250_000.0)];
        let plan = build_plan(&[], &bills, &catalog).unwrap();
        let e = plan.entry_for("wifi").unwrap();
        assert_eq!(e.category, Category::Internet);
        assert_eq!(e.card_id, "vp-shopee-plat-h");
        assert_eq!(e.source, SpendSource::Bill);
    }

    #[test]
    fn test_total_spend_is_order_independent() {
        let forward = vec![
            item("a", 0.1, Category::Online),
            item("b", 0.2, Category::Online),
            item("c", 0.3, Category::Online),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let catalog = Catalog::builtin();
        let p1 = build_plan(&forward, &[], &catalog).unwrap();
        let p2 = build_plan(&backward, &[], &catalog).unwrap();
        assert_eq!(p1.total_spend.to_bits(), p2.total_spend.to_bits());
        assert_eq!(p1.threshold_unlocked, p2.threshold_unlocked);
    }

    #[test]
    fn test_empty_batch() {
        let catalog = Catalog::builtin();
        let plan = build_plan(&[], &[], &catalog).unwrap();
        assert!(plan.entries.is_empty());
        assert_eq!(plan.total_projected_cashback, 0.0);
        assert!(!plan.threshold_unlocked);
    }

    #[test]
    fn test_catalog_without_pooled_card() {
        let builtin = Catalog::builtin();
        let cards: Vec<_> = builtin
            .cards()
            .iter()
            .filter(|c| !c.variant.is_pooled())
            .cloned()
            .collect();
        let catalog = Catalog::new(cards).unwrap();
        let plan = build_plan(&[item("big", 9_000_000.0, Category::Online)], &[], &catalog).unwrap();
        assert_eq!(plan.threshold, None);
        assert!(!plan.threshold_unlocked);
        assert_eq!(plan.entries[0].card_id, "msb-online-h");
    }

    #[test]
    fn test_cash_only_catalog_cannot_plan() {
        let cash = Catalog::builtin().get("cash-debit").unwrap().clone();
        let catalog = Catalog::new(vec![cash]).unwrap();
        let result = build_plan(&[item("a", 10_000.0, Category::Shopee)], &[], &catalog);
        assert!(matches!(result, Err(CashbackError::InvalidCatalog(_))));
    }

    #[test]
    fn test_caps_are_not_consulted_across_items() {
        // Greedy per item: two Shopee items worth 8M total would both land on
        // the 600k-capped Shopee card if S Rewards were absent.
        let builtin = Catalog::builtin();
        let cards: Vec<_> = builtin
            .cards()
            .iter()
            .filter(|c| !c.variant.is_pooled())
            .cloned()
            .collect();
        let catalog = Catalog::new(cards).unwrap();
        let items = vec![
            item("a", 4_000_000.0, Category::Shopee),
            item("b", 4_000_000.0, Category::Shopee),
        ];
        let plan = build_plan(&items, &[], &catalog).unwrap();
        assert!(plan.entries.iter().all(|e| e.card_id == "vp-shopee-plat-h"));
        assert_eq!(plan.total_projected_cashback, 800_000.0);
    }
}
