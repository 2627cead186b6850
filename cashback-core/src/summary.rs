//! Period reports: spending totals by category and day, and cash-flow outlook.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::finance::{Category, EventKind, FinancialEvent, ShoppingItem, Transaction};
use crate::period::AccountingPeriod;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub spent: f64,
    pub cashback: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendingSummary {
    pub total_spent: f64,
    pub total_cashback: f64,
    /// Cashback as a percentage of spend.
    pub effective_rate_pct: f64,
    pub by_category: BTreeMap<Category, CategoryTotals>,
    pub by_day: BTreeMap<NaiveDate, f64>,
}

pub fn summarize_spending<P>(transactions: &[Transaction], period: &P) -> SpendingSummary
where
    P: AccountingPeriod + ?Sized,
{
    let mut summary = SpendingSummary::default();

    for tx in transactions.iter().filter(|t| period.contains(t.date)) {
        summary.total_spent += tx.amount;
        summary.total_cashback += tx.cashback_earned;

        let cat = summary.by_category.entry(tx.category).or_default();
        cat.spent += tx.amount;
        cat.cashback += tx.cashback_earned;

        *summary.by_day.entry(tx.date).or_insert(0.0) += tx.amount;
    }

    if summary.total_spent > 0.0 {
        summary.effective_rate_pct = summary.total_cashback / summary.total_spent * 100.0;
    }
    summary
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSummary {
    pub current_asset: f64,
    pub pending_income: f64,
    pub pending_expense: f64,
    /// Asset after every pending event settles.
    pub projected_balance: f64,
    /// All events, earliest first.
    pub timeline: Vec<FinancialEvent>,
}

pub fn summarize_cash_flow(events: &[FinancialEvent], current_asset: f64) -> CashFlowSummary {
    let pending = |kind: EventKind| -> f64 {
        events
            .iter()
            .filter(|e| e.kind == kind && !e.is_completed)
            .map(|e| e.amount)
            .sum()
    };
    let pending_income = pending(EventKind::Income);
    let pending_expense = pending(EventKind::Expense);

    let mut timeline = events.to_vec();
    timeline.sort_by_key(|e| e.date);

    CashFlowSummary {
        current_asset,
        pending_income,
        pending_expense,
        projected_balance: current_asset + pending_income - pending_expense,
        timeline,
    }
}

/// Shopping items grouped by planned date, dates ascending.
pub fn group_items_by_date(items: &[ShoppingItem]) -> BTreeMap<NaiveDate, Vec<&ShoppingItem>> {
    let mut groups: BTreeMap<NaiveDate, Vec<&ShoppingItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.planned_date).or_default().push(item);
    }
    groups
}
