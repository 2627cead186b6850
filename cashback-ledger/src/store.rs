//! File-backed ledger: the host-side store of transactions, planned purchases
//! and cash-flow events.
//!
//! The engine only ever sees snapshots of these collections. The one write it
//! influences is `cashback_earned`, filled in through the rebate calculator
//! when a transaction is created or edited.

use anyhow::{bail, Context, Result};
use cashback_core::{
    derive_usage, price_transaction, AccountingPeriod, CalendarMonth, CardUsageStatus, Catalog,
    Category, FinancialEvent, ShoppingItem, Transaction,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::csv_io::ImportedRow;

/// User input for a new or edited transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub date: NaiveDate,
    pub title: String,
    pub amount: f64,
    pub category: Category,
    pub card_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Ledger {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub shopping_items: Vec<ShoppingItem>,
    #[serde(default)]
    pub events: Vec<FinancialEvent>,
    /// Cash currently on hand, in đồng.
    #[serde(default)]
    pub current_asset: f64,
}

impl Ledger {
    /// Load from JSON; a missing file is an empty ledger.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Per-card usage for one calendar month.
    pub fn usage(&self, catalog: &Catalog, month: CalendarMonth) -> Vec<CardUsageStatus> {
        derive_usage(&self.transactions, catalog, &month)
    }

    pub fn usage_in<P: AccountingPeriod + ?Sized>(
        &self,
        catalog: &Catalog,
        period: &P,
    ) -> Vec<CardUsageStatus> {
        derive_usage(&self.transactions, catalog, period)
    }

    // --- transactions ---

    pub fn record_transaction(
        &mut self,
        catalog: &Catalog,
        draft: TransactionDraft,
    ) -> Result<&Transaction> {
        let id = next_id("tx", self.transactions.iter().map(|t| t.id.as_str()));
        let tx = self.price(catalog, id, draft)?;
        info!(id = %tx.id, card = %tx.card_id, cashback = tx.cashback_earned, "recorded transaction");
        self.transactions.push(tx);
        Ok(&self.transactions[self.transactions.len() - 1])
    }

    /// Replace a transaction's fields and re-price it. Other transactions keep
    /// the cashback they were saved with.
    pub fn edit_transaction(
        &mut self,
        catalog: &Catalog,
        id: &str,
        draft: TransactionDraft,
    ) -> Result<&Transaction> {
        let idx = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .with_context(|| format!("no transaction with id {id}"))?;
        let tx = self.price(catalog, id.to_string(), draft)?;
        info!(id, cashback = tx.cashback_earned, "edited transaction");
        self.transactions[idx] = tx;
        Ok(&self.transactions[idx])
    }

    pub fn remove_transaction(&mut self, id: &str) -> Result<Transaction> {
        let idx = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .with_context(|| format!("no transaction with id {id}"))?;
        Ok(self.transactions.remove(idx))
    }

    pub fn clear_transactions(&mut self) -> usize {
        let n = self.transactions.len();
        self.transactions.clear();
        n
    }

    fn price(&self, catalog: &Catalog, id: String, draft: TransactionDraft) -> Result<Transaction> {
        let tx = Transaction::new(
            id,
            draft.date,
            draft.title,
            draft.amount,
            draft.category,
            draft.card_id,
        );
        let month = CalendarMonth::of(tx.date);
        Ok(price_transaction(catalog, &self.transactions, tx, &month)?)
    }

    /// Import parsed CSV rows in date order. Rows with a stored cashback keep
    /// it, up to what the card could have paid at that point; the rest are
    /// priced as if entered by hand on that date.
    pub fn import_rows(&mut self, catalog: &Catalog, mut rows: Vec<ImportedRow>) -> ImportSummary {
        rows.sort_by_key(|r| r.date);
        let mut summary = ImportSummary::default();

        for row in rows {
            if !catalog.contains(&row.card_id) {
                warn!(line = row.line, card = %row.card_id, "unknown card; row skipped");
                summary.skipped += 1;
                continue;
            }
            let line = row.line;
            let draft = TransactionDraft {
                date: row.date,
                title: row.title,
                amount: row.amount,
                category: row.category,
                card_id: row.card_id,
            };
            let result = match row.cashback {
                Some(cashback) => self.import_with_cashback(catalog, draft, cashback, line),
                None => self.record_transaction(catalog, draft).map(|_| ()),
            };
            match result {
                Ok(()) => summary.imported += 1,
                Err(e) => {
                    warn!(line, error = %e, "row skipped");
                    summary.skipped += 1;
                }
            }
        }
        summary
    }

    /// Keep a cashback figure computed elsewhere (an earlier export), clamped
    /// to the rebate the card's rate and remaining cap allow.
    fn import_with_cashback(
        &mut self,
        catalog: &Catalog,
        draft: TransactionDraft,
        cashback: f64,
        line: usize,
    ) -> Result<()> {
        if !cashback.is_finite() || cashback < 0.0 {
            bail!("invalid cashback {cashback}");
        }
        let id = next_id("tx", self.transactions.iter().map(|t| t.id.as_str()));
        let priced = self.price(catalog, id, draft)?;
        let allowed = priced.cashback_earned;
        if cashback > allowed {
            warn!(
                line,
                card = %priced.card_id,
                stored = cashback,
                allowed,
                "imported cashback exceeds rate or remaining cap; clamped"
            );
        }
        let tx = priced.with_cashback(cashback.min(allowed));
        self.transactions.push(tx);
        Ok(())
    }

    // --- shopping items ---

    pub fn add_item(&mut self, mut item: ShoppingItem) -> Result<&ShoppingItem> {
        item.id = next_id("item", self.shopping_items.iter().map(|i| i.id.as_str()));
        item.validate()?;
        self.shopping_items.push(item);
        Ok(&self.shopping_items[self.shopping_items.len() - 1])
    }

    pub fn remove_item(&mut self, id: &str) -> Result<ShoppingItem> {
        let idx = self
            .shopping_items
            .iter()
            .position(|i| i.id == id)
            .with_context(|| format!("no shopping item with id {id}"))?;
        Ok(self.shopping_items.remove(idx))
    }

    /// Flip an item's purchased flag; returns the new state.
    pub fn toggle_item(&mut self, id: &str) -> Result<bool> {
        let Some(item) = self.shopping_items.iter_mut().find(|i| i.id == id) else {
            bail!("no shopping item with id {id}");
        };
        item.is_purchased = !item.is_purchased;
        Ok(item.is_purchased)
    }

    // --- cash-flow events ---

    pub fn add_event(&mut self, mut event: FinancialEvent) -> Result<&FinancialEvent> {
        event.id = next_id("event", self.events.iter().map(|e| e.id.as_str()));
        event.validate()?;
        self.events.push(event);
        Ok(&self.events[self.events.len() - 1])
    }

    pub fn remove_event(&mut self, id: &str) -> Result<FinancialEvent> {
        let idx = self
            .events
            .iter()
            .position(|e| e.id == id)
            .with_context(|| format!("no event with id {id}"))?;
        Ok(self.events.remove(idx))
    }

    /// Flip an event's completed flag; returns the new state.
    pub fn toggle_event(&mut self, id: &str) -> Result<bool> {
        let Some(event) = self.events.iter_mut().find(|e| e.id == id) else {
            bail!("no event with id {id}");
        };
        event.is_completed = !event.is_completed;
        Ok(event.is_completed)
    }
}

/// `<prefix>-<n>` with n one past the highest existing number.
fn next_id<'a>(prefix: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let n = existing
        .filter_map(|id| id.strip_prefix(prefix)?.strip_prefix('-')?.parse::<u64>().ok())
        .max()
        .map_or(1, |n| n + 1);
    format!("{prefix}-{n}")
}
