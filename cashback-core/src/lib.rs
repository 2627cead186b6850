//! cashback-core: card catalog, rate rules and the rebate/ranking/planning engine

pub mod advisory;
pub mod catalog;
pub mod error;
pub mod finance;
pub mod period;
pub mod ranker;
pub mod rates;
pub mod rebate;
pub mod strategist;
pub mod summary;
pub mod usage;

pub use advisory::{AdvisoryRequest, ADVISORY_FALLBACK};
pub use catalog::{Card, Catalog, POOLED_SPEND_THRESHOLD};
pub use error::{CashbackError, Result};
pub use finance::{
    format_percent, format_vnd, pending_bills, Category, EventKind, FinancialEvent, ItemPriority,
    ShoppingItem, Transaction,
};
pub use period::{AccountingPeriod, AllTime, CalendarMonth};
pub use ranker::{rank_cards, RankedCard};
pub use rates::{CardVariant, RatePolicy, RateRule};
pub use rebate::{compute_rebate, price_transaction, CapOutcome, Rebate};
pub use strategist::{build_plan, Candidate, Plan, PlanEntry, SpendSource};
pub use summary::{summarize_cash_flow, summarize_spending, CashFlowSummary, SpendingSummary};
pub use usage::{derive_usage, next_min_spend_target, CardUsageStatus};

/// Best-effort category guess for free-text bill titles.
///
/// This is an approximation: titles are typed by hand, in Vietnamese or
/// English, and carry no merchant code. Anything unrecognised is treated as
/// generic online spend. There is no confidence score.
pub mod bills {
    use super::Category;

    pub fn classify_bill(title: &str) -> Category {
        let t = title.to_lowercase();

        // Electricity
        if t.contains("điện") || t.contains("electric") || t.contains("evn") {
            return Category::Electricity;
        }

        // Water
        if t.contains("nước") || t.contains("water") {
            return Category::Water;
        }

        // Internet ("internet", "fpt net", "wifi")
        if t.contains("net") || t.contains("wifi") {
            return Category::Internet;
        }

        Category::Online
    }

}

pub use bills::classify_bill;
