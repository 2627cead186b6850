//! Rate policies keyed by card variant.
//!
//! Each variant owns an ordered list of category rules and one fallback
//! rule. The first rule whose category set contains the spend category wins.

use serde::{Deserialize, Serialize};

use crate::finance::Category;

/// Rate family of a card. Several physical cards (e.g. the H and L copies of
/// one product) share a variant and therefore a rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardVariant {
    ShopeePlatinum,
    MsbOnline,
    TechcombankEveryday,
    SRewards,
    Cash,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateRule {
    pub categories: &'static [Category],
    pub rate: f64,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatePolicy {
    pub rules: &'static [RateRule],
    pub fallback: RateRule,
}

impl RatePolicy {
    pub fn rule_for(&self, category: Category) -> &RateRule {
        self.rules
            .iter()
            .find(|r| r.categories.contains(&category))
            .unwrap_or(&self.fallback)
    }

    pub fn rate_for(&self, category: Category) -> f64 {
        self.rule_for(category).rate
    }
}

impl CardVariant {
    pub fn policy(&self) -> &'static RatePolicy {
        match self {
            CardVariant::ShopeePlatinum => &SHOPEE_PLATINUM,
            CardVariant::MsbOnline => &MSB_ONLINE,
            CardVariant::TechcombankEveryday => &TECHCOMBANK_EVERYDAY,
            CardVariant::SRewards => &S_REWARDS,
            CardVariant::Cash => &CASH,
            CardVariant::Generic => &GENERIC,
        }
    }

    /// Pooled variants pay their headline rate only once aggregate spend
    /// reaches the card's minimum spend.
    pub fn is_pooled(&self) -> bool {
        matches!(self, CardVariant::SRewards)
    }
}

const UTILITIES: &[Category] = &[
    Category::Electricity,
    Category::Water,
    Category::Internet,
    Category::Phone,
];

static SHOPEE_PLATINUM: RatePolicy = RatePolicy {
    rules: &[
        RateRule {
            categories: &[Category::Shopee],
            rate: 0.10,
            label: "10% on Shopee spend",
        },
        RateRule {
            categories: UTILITIES,
            rate: 0.10,
            label: "10% on bills paid through ShopeePay",
        },
    ],
    fallback: RateRule {
        categories: &[],
        rate: 0.001,
        label: "0.1% on other spend",
    },
};

static MSB_ONLINE: RatePolicy = RatePolicy {
    rules: &[RateRule {
        categories: &[Category::Shopee, Category::Online],
        rate: 0.10,
        label: "10% on online and Shopee spend",
    }],
    fallback: RateRule {
        categories: &[],
        rate: 0.001,
        label: "0.1% on other spend",
    },
};

static TECHCOMBANK_EVERYDAY: RatePolicy = RatePolicy {
    rules: &[
        RateRule {
            categories: &[Category::Shopee, Category::Supermarket],
            rate: 0.05,
            label: "5% on supermarket and Shopee spend",
        },
        // Wet markets rarely carry a supermarket MCC.
        RateRule {
            categories: &[Category::Market],
            rate: 0.005,
            label: "0.5% on market spend",
        },
    ],
    fallback: RateRule {
        categories: &[],
        rate: 0.005,
        label: "0.5% base rate",
    },
};

static S_REWARDS: RatePolicy = RatePolicy {
    rules: &[],
    fallback: RateRule {
        categories: &[],
        rate: 0.12,
        label: "12% on all spend (requires 5,000,000đ monthly spend)",
    },
};

static CASH: RatePolicy = RatePolicy {
    rules: &[],
    fallback: RateRule {
        categories: &[],
        rate: 0.0,
        label: "cash payments earn no cashback",
    },
};

static GENERIC: RatePolicy = RatePolicy {
    rules: &[],
    fallback: RateRule {
        categories: &[],
        rate: 0.005,
        label: "0.5% base reward",
    },
};
