//! Spend records and planning inputs: categories, transactions, shopping items, bills

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{check_amount, check_present, CashbackError, Result};

/// Spend categories. Closed set; card rate tables are keyed on these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Shopee,
    Online,
    #[serde(rename = "VPBankNEO")]
    VpBankNeo,
    Supermarket,
    Market,
    Electricity,
    Water,
    Internet,
    Phone,
    Cash,
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Shopee,
        Category::Online,
        Category::VpBankNeo,
        Category::Supermarket,
        Category::Market,
        Category::Electricity,
        Category::Water,
        Category::Internet,
        Category::Phone,
        Category::Cash,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Shopee => "Shopee",
            Category::Online => "Online",
            Category::VpBankNeo => "VPBankNEO",
            Category::Supermarket => "Supermarket",
            Category::Market => "Market",
            Category::Electricity => "Electricity",
            Category::Water => "Water",
            Category::Internet => "Internet",
            Category::Phone => "Phone",
            Category::Cash => "Cash",
            Category::Other => "Other",
        }
    }

    /// Recurring household bills
    pub fn is_utility(&self) -> bool {
        matches!(
            self,
            Category::Electricity | Category::Water | Category::Internet | Category::Phone
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CashbackError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CashbackError::UnknownCategory(wanted.to_string()))
    }
}

/// A recorded purchase paid with one card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub title: String,
    /// Positive amount in đồng
    pub amount: f64,
    pub category: Category,
    pub card_id: String,
    /// Priced once when the record is saved; never re-priced when other
    /// transactions change.
    #[serde(default)]
    pub cashback_earned: f64,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        title: impl Into<String>,
        amount: f64,
        category: Category,
        card_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            title: title.into(),
            amount,
            category,
            card_id: card_id.into(),
            cashback_earned: 0.0,
        }
    }

    pub fn with_cashback(mut self, cashback: f64) -> Self {
        self.cashback_earned = cashback;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_present("title", &self.title)?;
        check_present("card", &self.card_id)?;
        check_amount("amount", self.amount)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ItemPriority {
    High,
    #[default]
    Medium,
    Low,
}

/// A purchase the user intends to make.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShoppingItem {
    pub id: String,
    pub name: String,
    pub estimated_price: f64,
    pub category: Category,
    pub planned_date: NaiveDate,
    #[serde(default)]
    pub priority: ItemPriority,
    #[serde(default)]
    pub is_purchased: bool,
}

impl ShoppingItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        estimated_price: f64,
        category: Category,
        planned_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            estimated_price,
            category,
            planned_date,
            priority: ItemPriority::Medium,
            is_purchased: false,
        }
    }

    pub fn with_priority(mut self, priority: ItemPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Planned purchases need a name and a strictly positive price.
    pub fn validate(&self) -> Result<()> {
        check_present("name", &self.name)?;
        check_positive("estimated price", self.estimated_price)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Income,
    Expense,
}

/// A scheduled cash-flow event: salary, rent, utility bill...
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialEvent {
    pub id: String,
    pub title: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub kind: EventKind,
    #[serde(default)]
    pub is_completed: bool,
}

impl FinancialEvent {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        amount: f64,
        date: NaiveDate,
        kind: EventKind,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            amount,
            date,
            kind,
            is_completed: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_present("title", &self.title)?;
        check_positive("amount", self.amount)
    }

    /// Uncompleted expenses are the bills still to be paid this period.
    pub fn is_pending_bill(&self) -> bool {
        self.kind == EventKind::Expense && !self.is_completed
    }

    /// Still pending after its date has passed. An event due today is not overdue.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_completed && self.date < today
    }
}

/// Bills still awaiting payment, in input order.
pub fn pending_bills(events: &[FinancialEvent]) -> Vec<FinancialEvent> {
    events.iter().filter(|e| e.is_pending_bill()).cloned().collect()
}

fn check_positive(field: &'static str, value: f64) -> Result<()> {
    if check_amount(field, value)? > 0.0 {
        Ok(())
    } else {
        Err(CashbackError::InvalidAmount { field, value })
    }
}

/// Format an amount in đồng with thousands separators: `1,250,000đ`.
pub fn format_vnd(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0 {
        format!("-{out}đ")
    } else {
        format!("{out}đ")
    }
}

/// Format a fractional rate as a percentage: `0.1` -> `10%`, `0.001` -> `0.1%`.
pub fn format_percent(rate: f64) -> String {
    let pct = (rate * 10_000.0).round() / 100.0;
    if pct.fract() == 0.0 {
        format!("{pct:.0}%")
    } else {
        format!("{pct}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("shopee".parse::<Category>().unwrap(), Category::Shopee);
        assert_eq!("VPBankNEO".parse::<Category>().unwrap(), Category::VpBankNeo);
        assert_eq!(" market ".parse::<Category>().unwrap(), Category::Market);
    }

    #[test]
    fn test_category_parse_unknown() {
        assert_eq!(
            "Groceries".parse::<Category>(),
            Err(CashbackError::UnknownCategory("Groceries".to_string()))
        );
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&Category::VpBankNeo).unwrap();
        assert_eq!(json, "\"VPBankNEO\"");
        let back: Category = serde_json::from_str("\"Electricity\"").unwrap();
        assert_eq!(back, Category::Electricity);
    }

    #[test]
    fn test_transaction_validate() {
        let tx = Transaction::new("t1", day(3), "Tai nghe", 450_000.0, Category::Shopee, "msb-online-h");
        assert!(tx.validate().is_ok());
        assert_eq!(tx.cashback_earned, 0.0);

        let untitled = Transaction { title: String::new(), ..tx.clone() };
        assert_eq!(untitled.validate(), Err(CashbackError::MissingField { field: "title" }));

        let negative = Transaction { amount: -5.0, ..tx };
        assert!(matches!(negative.validate(), Err(CashbackError::InvalidAmount { .. })));
    }

    #[test]
    fn test_shopping_item_requires_positive_price() {
        let item = ShoppingItem::new("i1", "Nước giặt", 0.0, Category::Shopee, day(10));
        assert!(matches!(item.validate(), Err(CashbackError::InvalidAmount { .. })));
        let item = ShoppingItem { estimated_price: 189_000.0, ..item };
        assert!(item.validate().is_ok());
        assert_eq!(item.priority, ItemPriority::Medium);
    }

    #[test]
    fn test_pending_bills_filters_income_and_completed() {
        let mut paid = FinancialEvent::new("e1", "Tiền điện", 800_000.0, day(5), EventKind::Expense);
        paid.is_completed = true;
        let salary = FinancialEvent::new("e2", "Lương", 20_000_000.0, day(1), EventKind::Income);
        let water = FinancialEvent::new("e3", "Tiền nước", 150_000.0, day(6), EventKind::Expense);

        let pending = pending_bills(&[paid, salary, water]);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "e3");
    }

    #[test]
    fn test_is_overdue() {
        let mut rent = FinancialEvent::new("e1", "Tiền nhà", 6_000_000.0, day(5), EventKind::Expense);
        assert!(rent.is_overdue(day(19)));
        assert!(!rent.is_overdue(day(5)));
        assert!(!rent.is_overdue(day(1)));
        rent.is_completed = true;
        assert!(!rent.is_overdue(day(19)));

        let salary = FinancialEvent::new("e2", "Lương", 20_000_000.0, day(10), EventKind::Income);
        assert!(salary.is_overdue(day(11)));
    }

    #[test]
    fn test_format_vnd() {
        assert_eq!(format_vnd(0.0), "0đ");
        assert_eq!(format_vnd(999.0), "999đ");
        assert_eq!(format_vnd(1_000.0), "1,000đ");
        assert_eq!(format_vnd(1_250_000.4), "1,250,000đ");
        assert_eq!(format_vnd(-50_000.0), "-50,000đ");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.1), "10%");
        assert_eq!(format_percent(0.12), "12%");
        assert_eq!(format_percent(0.001), "0.1%");
        assert_eq!(format_percent(0.005), "0.5%");
        assert_eq!(format_percent(0.0), "0%");
    }
}
