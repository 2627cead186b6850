//! Rebate calculation: one transaction against one card, with the monthly cap
//! applied against cashback already earned this period.

use serde::{Deserialize, Serialize};

use crate::catalog::{Card, Catalog};
use crate::error::{check_amount, Result};
use crate::finance::{format_vnd, Category, Transaction};
use crate::period::AccountingPeriod;
use crate::usage::usage_for_card;

/// How the card's monthly cap affected a rebate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapOutcome {
    /// The card has no cap.
    Uncapped,
    /// The full potential cashback fits under the cap.
    WithinCap,
    /// Only part of the potential cashback fit under the cap.
    Partial,
    /// Nothing left under the cap this period.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rebate {
    pub cashback: f64,
    pub rate: f64,
    /// Matched rate rule plus, when the cap bit, a note saying so.
    pub reason: String,
    pub cap: CapOutcome,
}

/// Compute the rebate `card` pays on `amount` spent in `category`, given
/// `accumulated` cashback already earned on the card this period.
///
/// Pure: identical inputs always give identical outputs.
pub fn compute_rebate(
    card: &Card,
    amount: f64,
    category: Category,
    accumulated: f64,
) -> Result<Rebate> {
    let amount = check_amount("amount", amount)?;
    let accumulated = check_amount("accumulated cashback", accumulated)?;
    let rule = card.policy().rule_for(category);
    Ok(apply_cap(card, amount, rule.rate, rule.label, accumulated))
}

fn apply_cap(card: &Card, amount: f64, rate: f64, label: &str, accumulated: f64) -> Rebate {
    let potential = amount * rate;
    let mut reason = label.to_string();

    if !card.has_cap() {
        return Rebate {
            cashback: potential,
            rate,
            reason,
            cap: CapOutcome::Uncapped,
        };
    }

    let remaining_cap = (card.max_cashback - accumulated).max(0.0);
    let (cashback, cap) = if amount == 0.0 {
        (0.0, CapOutcome::WithinCap)
    } else if remaining_cap == 0.0 {
        reason.push_str(" (monthly cap exhausted, no cashback left this period)");
        (0.0, CapOutcome::Exhausted)
    } else if potential > remaining_cap {
        reason.push_str(&format!(
            " (monthly cap reached: only {} of {} paid)",
            format_vnd(remaining_cap),
            format_vnd(potential)
        ));
        (remaining_cap, CapOutcome::Partial)
    } else {
        (potential, CapOutcome::WithinCap)
    };

    Rebate {
        cashback,
        rate,
        reason,
        cap,
    }
}

/// Price a transaction at save time: fill in `cashback_earned` from the
/// card's cashback already earned in `period`.
///
/// `history` may contain an earlier version of the same transaction (an
/// edit); its previous cashback does not count towards the cap.
pub fn price_transaction<P>(
    catalog: &Catalog,
    history: &[Transaction],
    draft: Transaction,
    period: &P,
) -> Result<Transaction>
where
    P: AccountingPeriod + ?Sized,
{
    draft.validate()?;
    let card = catalog.get(&draft.card_id)?;

    let prior: Vec<&Transaction> = history
        .iter()
        .filter(|t| t.card_id == card.id && t.id != draft.id && period.contains(t.date))
        .collect();
    let accumulated = usage_for_card(card, &prior).total_cashback;

    let rebate = compute_rebate(card, draft.amount, draft.category, accumulated)?;
    Ok(draft.with_cashback(rebate.cashback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CashbackError;
    use crate::period::CalendarMonth;
    use chrono::NaiveDate;

    fn catalog() -> Catalog {
        Catalog::builtin()
    }

    #[test]
    fn test_within_cap() {
        let catalog = catalog();
        let card = catalog.get("vp-shopee-plat-h").unwrap();
        let r = compute_rebate(card, 1_000_000.0, Category::Shopee, 0.0).unwrap();
        assert_eq!(r.cashback, 100_000.0);
        assert_eq!(r.rate, 0.10);
        assert_eq!(r.cap, CapOutcome::WithinCap);
        assert_eq!(r.reason, "10% on Shopee spend");
    }

    #[test]
    fn test_partial_cap() {
        let catalog = catalog();
        let card = catalog.get("vp-shopee-plat-h").unwrap();
        let r = compute_rebate(card, 1_000_000.0, Category::Shopee, 550_000.0).unwrap();
        assert_eq!(r.cashback, 50_000.0);
        assert_eq!(r.cap, CapOutcome::Partial);
        assert!(r.reason.contains("monthly cap reached"), "{}", r.reason);
        assert!(r.reason.contains("50,000đ"), "{}", r.reason);
    }

    #[test]
    fn test_exhausted_cap() {
        let catalog = catalog();
        let card = catalog.get("msb-online-l").unwrap();
        let r = compute_rebate(card, 2_000_000.0, Category::Online, 300_000.0).unwrap();
        assert_eq!(r.cashback, 0.0);
        assert_eq!(r.cap, CapOutcome::Exhausted);
        assert!(r.reason.contains("cap exhausted"), "{}", r.reason);

        let over = compute_rebate(card, 2_000_000.0, Category::Online, 450_000.0).unwrap();
        assert_eq!(over.cashback, 0.0);
        assert_eq!(over.cap, CapOutcome::Exhausted);
    }

    #[test]
    fn test_zero_amount_has_no_cap_note() {
        let catalog = catalog();
        let card = catalog.get("msb-online-h").unwrap();
        let r = compute_rebate(card, 0.0, Category::Online, 300_000.0).unwrap();
        assert_eq!(r.cashback, 0.0);
        assert_eq!(r.rate, 0.10);
        assert_eq!(r.reason, "10% on online and Shopee spend");
    }

    #[test]
    fn test_uncapped_card_ignores_accumulated() {
        let catalog = catalog();
        let card = catalog.get("vp-s-rewards-l").unwrap();
        let r = compute_rebate(card, 3_000_000.0, Category::Market, 9_999_999.0).unwrap();
        assert_eq!(r.cashback, 3_000_000.0 * 0.12);
        assert_eq!(r.cap, CapOutcome::Uncapped);
    }

    #[test]
    fn test_cash_pays_nothing() {
        let catalog = catalog();
        let card = catalog.get("cash-debit").unwrap();
        let r = compute_rebate(card, 750_000.0, Category::Shopee, 0.0).unwrap();
        assert_eq!(r.cashback, 0.0);
        assert_eq!(r.rate, 0.0);
    }

    #[test]
    fn test_rejects_negative_inputs() {
        let catalog = catalog();
        let card = catalog.get("tcb-everyday").unwrap();
        assert!(matches!(
            compute_rebate(card, -1.0, Category::Shopee, 0.0),
            Err(CashbackError::InvalidAmount { field: "amount", .. })
        ));
        assert!(matches!(
            compute_rebate(card, 1.0, Category::Shopee, f64::NAN),
            Err(CashbackError::InvalidAmount { field: "accumulated cashback", .. })
        ));
    }

    fn oct(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    #[test]
    fn test_price_transaction_uses_period_history() {
        let catalog = catalog();
        let history = vec![
            Transaction::new("t1", oct(2), "Đồ gia dụng", 1_500_000.0, Category::Shopee, "tcb-everyday")
                .with_cashback(75_000.0),
            Transaction::new("t2", oct(9), "Siêu thị", 2_000_000.0, Category::Supermarket, "tcb-everyday")
                .with_cashback(100_000.0),
        ];
        let draft = Transaction::new("t3", oct(19), "Co.op Mart", 1_000_000.0, Category::Supermarket, "tcb-everyday");

        let month = CalendarMonth::of(oct(19));
        let priced = price_transaction(&catalog, &history, draft, &month).unwrap();
        // 200,000 cap - 175,000 earned leaves 25,000.
        assert_eq!(priced.cashback_earned, 25_000.0);
    }

    #[test]
    fn test_price_transaction_edit_excludes_itself() {
        let catalog = catalog();
        let original = Transaction::new("t1", oct(2), "Shopee", 2_000_000.0, Category::Shopee, "tcb-everyday")
            .with_cashback(100_000.0);
        let edited = Transaction {
            amount: 3_000_000.0,
            cashback_earned: 0.0,
            ..original.clone()
        };

        let month = CalendarMonth::of(oct(2));
        let priced = price_transaction(&catalog, &[original], edited, &month).unwrap();
        assert_eq!(priced.cashback_earned, 150_000.0);
    }

    #[test]
    fn test_price_transaction_unknown_card() {
        let catalog = catalog();
        let draft = Transaction::new("t1", oct(2), "Shopee", 100_000.0, Category::Shopee, "visa-x");
        let month = CalendarMonth::of(oct(2));
        assert_eq!(
            price_transaction(&catalog, &[], draft, &month),
            Err(CashbackError::UnknownCard("visa-x".to_string()))
        );
    }
}
