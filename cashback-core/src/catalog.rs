//! Card catalog: the static set of cards the engine chooses between.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CashbackError, Result};
use crate::rates::{CardVariant, RatePolicy};

/// Aggregate monthly spend that unlocks the pooled S Rewards rate.
pub const POOLED_SPEND_THRESHOLD: f64 = 5_000_000.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub issuer: String,
    pub variant: CardVariant,
    /// Headline percentage, informational only. Rebates come from the
    /// variant's rate policy.
    pub cashback_rate: f64,
    /// Monthly cashback cap in đồng. 0 means unlimited.
    pub max_cashback: f64,
    /// Spend needed in a period to qualify. 0 means none.
    pub min_spend: f64,
    /// Primary eligible spend label ("Shopee", "All", ...), informational.
    pub category: String,
    #[serde(default = "default_count")]
    pub count: u32,
    /// Statement payment day of month; 0 for immediate debit.
    #[serde(default)]
    pub due_day: u8,
    #[serde(default)]
    pub notes: String,
}

fn default_count() -> u32 {
    1
}

impl Card {
    pub fn has_cap(&self) -> bool {
        self.max_cashback > 0.0
    }

    pub fn policy(&self) -> &'static RatePolicy {
        self.variant.policy()
    }
}

/// Ordered card list. Order is significant: it is the tie-break order for
/// ranking and planning.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    cards: Vec<Card>,
}

impl Catalog {
    pub fn new(cards: Vec<Card>) -> Result<Self> {
        let mut seen = HashSet::new();
        for card in &cards {
            if card.id.trim().is_empty() {
                return Err(CashbackError::InvalidCatalog("card with empty id".into()));
            }
            if !seen.insert(card.id.as_str()) {
                return Err(CashbackError::InvalidCatalog(format!("duplicate card id {}", card.id)));
            }
            let limits_ok = [card.max_cashback, card.min_spend]
                .iter()
                .all(|v| v.is_finite() && *v >= 0.0);
            if !limits_ok {
                return Err(CashbackError::InvalidCatalog(format!(
                    "{}: cap and minimum spend must be non-negative",
                    card.id
                )));
            }
        }
        Ok(Self { cards })
    }

    /// The eight cards of the household wallet.
    pub fn builtin() -> Self {
        Self {
            cards: builtin_cards(),
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, id: &str) -> Result<&Card> {
        self.cards
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| CashbackError::UnknownCard(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cards.iter().any(|c| c.id == id)
    }

    /// First pooled (threshold-gated) card in catalog order.
    pub fn pooled_card(&self) -> Option<&Card> {
        self.cards.iter().find(|c| c.variant.is_pooled())
    }
}

#[allow(clippy::too_many_arguments)]
fn card(
    id: &str,
    name: &str,
    issuer: &str,
    variant: CardVariant,
    cashback_rate: f64,
    max_cashback: f64,
    min_spend: f64,
    category: &str,
    due_day: u8,
    notes: &str,
) -> Card {
    Card {
        id: id.to_string(),
        name: name.to_string(),
        issuer: issuer.to_string(),
        variant,
        cashback_rate,
        max_cashback,
        min_spend,
        category: category.to_string(),
        count: 1,
        due_day,
        notes: notes.to_string(),
    }
}

fn builtin_cards() -> Vec<Card> {
    vec![
        card(
            "vp-shopee-plat-h",
            "VPBank Shopee Platinum (H)",
            "VPBank",
            CardVariant::ShopeePlatinum,
            10.0,
            600_000.0,
            4_000_000.0,
            "Shopee",
            8,
            "Card H: 10% on Shopee. Min spend 4M. Due on the 8th.",
        ),
        card(
            "vp-shopee-plat-l",
            "VPBank Shopee Platinum (L)",
            "VPBank",
            CardVariant::ShopeePlatinum,
            10.0,
            600_000.0,
            4_000_000.0,
            "Shopee",
            8,
            "Card L: 10% on Shopee. Min spend 4M. Due on the 8th.",
        ),
        card(
            "msb-online-h",
            "MSB Visa Online (H)",
            "MSB",
            CardVariant::MsbOnline,
            10.0,
            300_000.0,
            3_000_000.0,
            "Online",
            7,
            "Card H: 10% on online/Shopee. Min spend 3M. Due on the 7th.",
        ),
        card(
            "msb-online-l",
            "MSB Visa Online (L)",
            "MSB",
            CardVariant::MsbOnline,
            10.0,
            300_000.0,
            3_000_000.0,
            "Online",
            7,
            "Card L: 10% on online/Shopee. Min spend 3M. Due on the 7th.",
        ),
        card(
            "vp-s-rewards-h",
            "VPBank S Rewards (H)",
            "VPBank",
            CardVariant::SRewards,
            12.0,
            0.0,
            POOLED_SPEND_THRESHOLD,
            "All",
            8,
            "Card H: 12% once monthly spend reaches 5M.",
        ),
        card(
            "vp-s-rewards-l",
            "VPBank S Rewards (L)",
            "VPBank",
            CardVariant::SRewards,
            12.0,
            0.0,
            POOLED_SPEND_THRESHOLD,
            "All",
            8,
            "Card L: 12% once monthly spend reaches 5M.",
        ),
        card(
            "tcb-everyday",
            "Techcombank Everyday",
            "Techcombank",
            CardVariant::TechcombankEveryday,
            5.0,
            200_000.0,
            0.0,
            "Specific",
            5,
            "5% on Shopee/supermarkets. Due on the 5th.",
        ),
        card(
            "cash-debit",
            "Cash / Payment account",
            "Cash",
            CardVariant::Cash,
            0.0,
            0.0,
            0.0,
            "Cash",
            0,
            "Debited directly from available funds.",
        ),
    ]
}
