use cashback_core::{
    build_plan, compute_rebate, derive_usage, rank_cards, AllTime, CalendarMonth, Card, CardVariant,
    Catalog, Category, EventKind, FinancialEvent, ShoppingItem, Transaction,
};
use chrono::NaiveDate;

const AMOUNTS: [f64; 6] = [0.0, 1.0, 99_999.0, 1_000_000.0, 3_500_000.0, 40_000_000.0];
const ACCUMULATED: [f64; 6] = [0.0, 10_000.0, 199_999.0, 299_999.0, 600_000.0, 2_000_000.0];

fn test_card(variant: CardVariant, max_cashback: f64) -> Card {
    Card {
        id: format!("{variant:?}-{max_cashback}"),
        name: "Test card".to_string(),
        issuer: "Test".to_string(),
        variant,
        cashback_rate: 10.0,
        max_cashback,
        min_spend: 0.0,
        category: "All".to_string(),
        count: 1,
        due_day: 1,
        notes: String::new(),
    }
}

fn oct(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

/// Uncapped cards always pay amount x rate, whatever was earned before.
#[test]
fn test_uncapped_pays_full_rate() {
    for variant in [CardVariant::SRewards, CardVariant::MsbOnline, CardVariant::Generic] {
        let card = test_card(variant, 0.0);
        for category in Category::ALL {
            let rate = card.policy().rate_for(category);
            for amount in AMOUNTS {
                for acc in ACCUMULATED {
                    let r = compute_rebate(&card, amount, category, acc).unwrap();
                    assert_eq!(r.cashback, amount * rate);
                }
            }
        }
    }
}

/// Once accumulated cashback reaches the cap, nothing more is paid.
#[test]
fn test_cap_reached_pays_nothing() {
    let catalog = Catalog::builtin();
    for card in catalog.cards().iter().filter(|c| c.has_cap()) {
        for category in Category::ALL {
            for amount in AMOUNTS {
                for acc in [card.max_cashback, card.max_cashback + 1.0, card.max_cashback * 3.0] {
                    let r = compute_rebate(card, amount, category, acc).unwrap();
                    assert_eq!(r.cashback, 0.0, "{} {category} {amount} {acc}", card.id);
                }
            }
        }
    }
}

/// 0 <= rebate <= amount x rate, and rebate <= remaining cap.
#[test]
fn test_rebate_bounds() {
    let catalog = Catalog::builtin();
    for card in catalog.cards() {
        for category in Category::ALL {
            for amount in AMOUNTS {
                for acc in ACCUMULATED {
                    let r = compute_rebate(card, amount, category, acc).unwrap();
                    assert!(r.cashback >= 0.0);
                    assert!(r.cashback <= amount * r.rate);
                    if card.has_cap() {
                        assert!(r.cashback <= (card.max_cashback - acc).max(0.0));
                    }
                }
            }
        }
    }
}

#[test]
fn test_rebate_is_idempotent() {
    let catalog = Catalog::builtin();
    for card in catalog.cards() {
        let a = compute_rebate(card, 1_234_567.0, Category::Shopee, 123_456.0).unwrap();
        let b = compute_rebate(card, 1_234_567.0, Category::Shopee, 123_456.0).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn test_ranking_sorted_with_stable_ties() {
    let catalog = Catalog::builtin();
    let history = vec![
        Transaction::new("t1", oct(1), "Shopee", 5_000_000.0, Category::Shopee, "vp-shopee-plat-h")
            .with_cashback(580_000.0),
        Transaction::new("t2", oct(2), "Tiki", 1_000_000.0, Category::Online, "msb-online-l")
            .with_cashback(100_000.0),
    ];
    let usage = derive_usage(&history, &catalog, &AllTime);
    let position = |id: &str| catalog.cards().iter().position(|c| c.id == id).unwrap();

    for category in Category::ALL {
        for amount in AMOUNTS {
            let ranked = rank_cards(&catalog, amount, category, &usage).unwrap();
            assert_eq!(ranked.len(), catalog.cards().len());
            for w in ranked.windows(2) {
                assert!(w[0].cashback_amount >= w[1].cashback_amount);
                if w[0].cashback_amount == w[1].cashback_amount {
                    assert!(position(&w[0].card_id) < position(&w[1].card_id));
                }
            }
        }
    }
}

#[test]
fn test_usage_is_order_independent() {
    let catalog = Catalog::builtin();
    let cards = ["vp-shopee-plat-h", "msb-online-h", "tcb-everyday", "cash-debit"];
    let txs: Vec<Transaction> = (0..24)
        .map(|i| {
            let amount = 10_000.0 * (i as f64) + 0.1 * (i as f64);
            Transaction::new(
                format!("t{i}"),
                oct(1 + i % 28),
                "item",
                amount,
                Category::Shopee,
                cards[i as usize % cards.len()],
            )
            .with_cashback(amount * 0.013)
        })
        .collect();

    let forward = derive_usage(&txs, &catalog, &AllTime);

    let mut reversed = txs.clone();
    reversed.reverse();
    assert_eq!(derive_usage(&reversed, &catalog, &AllTime), forward);

    let mut interleaved: Vec<Transaction> = txs.iter().step_by(2).cloned().collect();
    interleaved.extend(txs.iter().skip(1).step_by(2).cloned());
    assert_eq!(derive_usage(&interleaved, &catalog, &AllTime), forward);
}

#[test]
fn test_partial_cap_scenario() {
    let card = test_card(CardVariant::ShopeePlatinum, 600_000.0);
    let r = compute_rebate(&card, 1_000_000.0, Category::Shopee, 550_000.0).unwrap();
    assert_eq!(r.rate, 0.10);
    assert_eq!(r.cashback, 50_000.0);
    assert!(r.reason.contains("monthly cap reached"), "{}", r.reason);
}

#[test]
fn test_cash_scenario() {
    let catalog = Catalog::builtin();
    let cash = catalog.get("cash-debit").unwrap();
    for category in Category::ALL {
        for amount in AMOUNTS {
            let r = compute_rebate(cash, amount, category, 0.0).unwrap();
            assert_eq!(r.cashback, 0.0);
            assert_eq!(r.rate, 0.0);
        }
    }
}

fn item(id: &str, price: f64, category: Category) -> ShoppingItem {
    ShoppingItem::new(id, id, price, category, NaiveDate::from_ymd_opt(2026, 11, 11).unwrap())
}

#[test]
fn test_pooled_card_locked_below_threshold() {
    let catalog = Catalog::builtin();
    let items: Vec<ShoppingItem> = Category::ALL
        .iter()
        .enumerate()
        .map(|(i, c)| item(&format!("i{i}"), 4_500_000.0 / 11.0, *c))
        .collect();
    let plan = build_plan(&items, &[], &catalog).unwrap();

    assert!(!plan.threshold_unlocked);
    assert!((plan.total_spend - 4_500_000.0).abs() < 1e-6);
    assert!(plan.entries.iter().all(|e| !e.pooled && !e.card_id.starts_with("vp-s-rewards")));
}

#[test]
fn test_pooled_card_wins_above_threshold() {
    let catalog = Catalog::builtin();
    let items = vec![
        item("shopee", 2_000_000.0, Category::Shopee),
        item("online", 1_000_000.0, Category::Online),
        item("supermarket", 1_000_000.0, Category::Supermarket),
    ];
    let bills = vec![
        FinancialEvent::new("power", "Tiền điện", 1_500_000.0, oct(25), EventKind::Expense),
        FinancialEvent::new("net", "Internet", 500_000.0, oct(25), EventKind::Expense),
    ];
    let plan = build_plan(&items, &bills, &catalog).unwrap();

    assert!(plan.threshold_unlocked);
    assert_eq!(plan.total_spend, 6_000_000.0);
    assert!(plan.entries.iter().all(|e| e.card_id == "vp-s-rewards-h" && e.pooled));
}

#[test]
fn test_two_item_pooled_scenario() {
    let catalog = Catalog::builtin();
    let items = vec![
        item("a", 2_000_000.0, Category::Shopee),
        item("b", 3_500_000.0, Category::Online),
    ];
    let plan = build_plan(&items, &[], &catalog).unwrap();

    assert!(plan.threshold_unlocked);
    for id in ["a", "b"] {
        let e = plan.entry_for(id).unwrap();
        assert_eq!(e.card_id, "vp-s-rewards-h");
        assert_eq!(e.rate, 0.12);
    }
    assert!((plan.total_projected_cashback - 660_000.0).abs() < 1e-6);
}

#[test]
fn test_custom_catalog_pooled_card_competes() {
    // The first pooled card in catalog order is the one that competes.
    let mut cards: Vec<Card> = Catalog::builtin().cards().to_vec();
    for c in cards.iter_mut().filter(|c| c.variant.is_pooled()) {
        c.variant = CardVariant::Generic;
    }
    let mut pooled = test_card(CardVariant::SRewards, 0.0);
    pooled.min_spend = 5_000_000.0;
    cards.insert(0, pooled);
    let catalog = Catalog::new(cards).unwrap();

    let items = vec![
        item("a", 2_000_000.0, Category::Shopee),
        item("b", 3_500_000.0, Category::Market),
    ];
    let plan = build_plan(&items, &[], &catalog).unwrap();
    assert!(plan.threshold_unlocked);
    // 12% pooled beats 10% Shopee and 0.5% market
    assert!(plan.entries.iter().all(|e| e.pooled));
}

#[test]
fn test_month_boundary_resets_caps() {
    let catalog = Catalog::builtin();
    let sept = NaiveDate::from_ymd_opt(2026, 9, 28).unwrap();
    let history = vec![
        Transaction::new("t1", sept, "Shopee", 3_000_000.0, Category::Shopee, "msb-online-h")
            .with_cashback(300_000.0),
    ];
    let usage = derive_usage(&history, &catalog, &CalendarMonth::of(oct(1)));
    let ranked = rank_cards(&catalog, 1_000_000.0, Category::Online, &usage).unwrap();
    let msb = ranked.iter().find(|r| r.card_id == "msb-online-h").unwrap();
    assert_eq!(msb.cashback_amount, 100_000.0);
    assert!(!msb.is_maxed_out);
}
