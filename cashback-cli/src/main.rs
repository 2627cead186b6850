use anyhow::{bail, Result};
use cashback_core::advisory::{
    history_analysis_request, plan_advice_request, purchase_advice_request,
};
use cashback_core::summary::group_items_by_date;
use cashback_core::usage::next_min_spend_target;
use cashback_core::{
    build_plan, format_percent, format_vnd, pending_bills, rank_cards, summarize_cash_flow,
    summarize_spending, AccountingPeriod, AdvisoryRequest, CalendarMonth, Catalog, Category,
    EventKind, FinancialEvent, ItemPriority, ShoppingItem, SpendSource,
};
use cashback_ledger::csv_io::parse_date;
use cashback_ledger::{parse_transactions_csv, write_transactions_csv, Ledger, TransactionDraft};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod advisor;
mod auth;
mod config;
mod state;

use advisor::Provider;

#[derive(Parser, Debug)]
#[command(name = "cashback", version, about = "Pick the card that pays the most cashback")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the card catalog with caps, minimum spend and due days
    Cards,

    /// Rank every card for one prospective purchase
    Rank {
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        category: Category,
        /// Accounting month whose usage counts against caps (default: this month)
        #[arg(long)]
        month: Option<CalendarMonth>,
        /// Ask the advisor for a short explanation
        #[arg(long)]
        advise: bool,
    },

    /// Recorded card transactions
    Tx {
        #[command(subcommand)]
        command: TxCommand,
    },

    /// Per-card spend, cashback and cap status
    Usage {
        #[arg(long)]
        month: Option<CalendarMonth>,
    },

    /// Planned purchases
    Item {
        #[command(subcommand)]
        command: ItemCommand,
    },

    /// Income and bills
    Event {
        #[command(subcommand)]
        command: EventCommand,
    },

    /// Show or set cash on hand, used for the projected balance
    Asset { amount: Option<f64> },

    /// Assign a card to every planned purchase and pending bill
    Plan {
        #[arg(long)]
        advise: bool,
    },

    /// Spending summary and cash-flow outlook
    Report {
        #[arg(long)]
        month: Option<CalendarMonth>,
        #[arg(long)]
        advise: bool,
    },

    /// Manage ~/.cashback/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Store advisor API keys
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Args, Debug)]
struct TxFields {
    /// YYYY-MM-DD or DD/MM/YYYY (default: today)
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
    #[arg(long)]
    title: String,
    #[arg(long)]
    amount: f64,
    #[arg(long)]
    category: Category,
    #[arg(long)]
    card: String,
}

#[derive(Subcommand, Debug)]
enum TxCommand {
    /// Record a purchase; cashback is computed now and stored
    Add(TxFields),
    /// Change a purchase and re-price it
    Edit {
        id: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        card: Option<String>,
    },
    Rm {
        id: String,
    },
    /// Delete every recorded transaction
    Clear {
        #[arg(long)]
        yes: bool,
    },
    List {
        #[arg(long)]
        month: Option<CalendarMonth>,
    },
    /// Import a CSV with date,title,amount,category,card[,cashback] columns
    Import {
        path: PathBuf,
    },
    Export {
        path: PathBuf,
        #[arg(long)]
        month: Option<CalendarMonth>,
    },
}

#[derive(Subcommand, Debug)]
enum ItemCommand {
    Add {
        name: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        category: Category,
        /// Planned purchase date (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// high, medium or low
        #[arg(long, value_parser = parse_priority, default_value = "medium")]
        priority: ItemPriority,
    },
    Rm {
        id: String,
    },
    /// Mark purchased / not purchased
    Toggle {
        id: String,
    },
    List,
}

#[derive(Subcommand, Debug)]
enum EventCommand {
    Add {
        title: String,
        #[arg(long)]
        amount: f64,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// income or expense
        #[arg(long, value_parser = parse_kind, default_value = "expense")]
        kind: EventKind,
    },
    Rm {
        id: String,
    },
    /// Mark completed / pending
    Toggle {
        id: String,
    },
    List,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config.toml if none exists
    Init,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Paste a key for the configured provider, or the one named
    PasteKey {
        #[arg(long, value_parser = parse_provider)]
        provider: Option<Provider>,
    },
    PasteOpenaiApiKey,
    PasteAnthropicToken,
    /// Show which providers have a stored key
    Status,
}

/// Loaded state shared by the data commands.
struct Session {
    cfg: config::Config,
    catalog: Catalog,
    ledger: Ledger,
    ledger_path: PathBuf,
}

impl Session {
    fn open() -> Result<Self> {
        let cfg = config::load_config()?;
        let catalog = config::load_catalog(&cfg)?;
        let ledger_path = state::ledger_path()?;
        let ledger = Ledger::load(&ledger_path)?;
        Ok(Self {
            cfg,
            catalog,
            ledger,
            ledger_path,
        })
    }

    fn save(&self) -> Result<()> {
        self.ledger.save(&self.ledger_path)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Cards => {
            let s = Session::open()?;
            print_cards(&s.catalog);
        }

        Command::Rank {
            amount,
            category,
            month,
            advise,
        } => {
            let s = Session::open()?;
            let usage = s.ledger.usage(&s.catalog, month.unwrap_or_else(this_month));
            let ranked = rank_cards(&s.catalog, amount, category, &usage)?;

            println!("{} in {category}:\n", format_vnd(amount));
            for (i, r) in ranked.iter().enumerate() {
                let maxed = if r.is_maxed_out { "  [cap reached]" } else { "" };
                println!(
                    "{:>2}. {:<28} {:>12} cashback  {:>12} net  {:>6}  {}{}",
                    i + 1,
                    r.card_name,
                    format_vnd(r.cashback_amount),
                    format_vnd(r.final_price),
                    format_percent(r.rate),
                    r.reason,
                    maxed
                );
            }

            if advise {
                let req = purchase_advice_request(amount, category, &s.catalog, &usage, &ranked);
                print_advice(&s.cfg, &req).await;
            }
        }

        Command::Tx { command } => run_tx(command)?,

        Command::Usage { month } => {
            let s = Session::open()?;
            let month = month.unwrap_or_else(this_month);
            let usage = s.ledger.usage(&s.catalog, month);

            println!("Card usage for {month}\n");
            for u in &usage {
                let name = s.catalog.get(&u.card_id).map_or(u.card_id.as_str(), |c| c.name.as_str());
                let cap = u
                    .remaining_cap
                    .map_or_else(|| "no cap".to_string(), |left| format!("{} cap left", format_vnd(left)));
                let min = if u.min_spend <= 0.0 {
                    "no minimum".to_string()
                } else if u.met_min_spend {
                    "minimum met".to_string()
                } else {
                    format!("{} to minimum", format_vnd(u.remaining_min_spend))
                };
                println!(
                    "{:<28} {:>3} tx  {:>12} spent  {:>10} cashback  {:<20} {}",
                    name,
                    u.transaction_count,
                    format_vnd(u.total_spent),
                    format_vnd(u.total_cashback),
                    cap,
                    min
                );
            }

            match next_min_spend_target(&usage) {
                Some(u) => println!(
                    "\nSpend next on {}: {} more reaches its minimum.",
                    u.card_id,
                    format_vnd(u.remaining_min_spend)
                ),
                None => println!("\nAll minimum-spend targets are met."),
            }
        }

        Command::Item { command } => run_item(command)?,

        Command::Event { command } => run_event(command)?,

        Command::Asset { amount } => {
            let mut s = Session::open()?;
            if let Some(amount) = amount {
                if !amount.is_finite() {
                    bail!("asset must be a finite amount");
                }
                s.ledger.current_asset = amount;
                s.save()?;
            }
            println!("Current asset: {}", format_vnd(s.ledger.current_asset));
        }

        Command::Plan { advise } => {
            let s = Session::open()?;
            run_plan(&s, advise).await?;
        }

        Command::Report { month, advise } => {
            let s = Session::open()?;
            run_report(&s, month.unwrap_or_else(this_month), advise).await?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
        },

        Command::Auth { command } => match command {
            AuthCommand::PasteKey { provider } => {
                let provider = match provider {
                    Some(p) => p,
                    None => match Provider::parse(&config::load_config()?.advisor.provider)? {
                        Some(p) => p,
                        None => bail!("advisor is disabled; pass --provider openai or --provider anthropic"),
                    },
                };
                auth::paste_key(provider)?
            }
            AuthCommand::PasteOpenaiApiKey => auth::paste_key(Provider::OpenAI)?,
            AuthCommand::PasteAnthropicToken => auth::paste_key(Provider::Anthropic)?,
            AuthCommand::Status => {
                let cfg = config::load_config()?;
                auth::print_status(Provider::parse(&cfg.advisor.provider)?)?
            }
        },
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn this_month() -> CalendarMonth {
    CalendarMonth::of(today())
}

fn parse_priority(s: &str) -> Result<ItemPriority> {
    match s.to_ascii_lowercase().as_str() {
        "high" | "h" => Ok(ItemPriority::High),
        "medium" | "m" => Ok(ItemPriority::Medium),
        "low" | "l" => Ok(ItemPriority::Low),
        _ => bail!("priority must be high, medium or low"),
    }
}

fn parse_provider(s: &str) -> Result<Provider> {
    match Provider::parse(s)? {
        Some(p) => Ok(p),
        None => bail!("provider must be openai or anthropic"),
    }
}

fn parse_kind(s: &str) -> Result<EventKind> {
    match s.to_ascii_lowercase().as_str() {
        "income" => Ok(EventKind::Income),
        "expense" | "bill" => Ok(EventKind::Expense),
        _ => bail!("kind must be income or expense"),
    }
}

fn print_cards(catalog: &Catalog) {
    for card in catalog.cards() {
        let cap = if card.has_cap() {
            format!("cap {}", format_vnd(card.max_cashback))
        } else {
            "no cap".to_string()
        };
        let min = if card.min_spend > 0.0 {
            format!("min {}", format_vnd(card.min_spend))
        } else {
            "no minimum".to_string()
        };
        let due = match card.due_day {
            0 => "paid immediately".to_string(),
            d => format!("due day {d}"),
        };
        println!("{:<18} {:<28} {:<16} {:<18} {}", card.id, card.name, cap, min, due);

        let policy = card.policy();
        for rule in policy.rules {
            println!("{:>20} {}", "", rule.label);
        }
        println!("{:>20} {}", "", policy.fallback.label);
        if !card.notes.is_empty() {
            println!("{:>20} note: {}", "", card.notes);
        }
    }
}

fn run_tx(command: TxCommand) -> Result<()> {
    let mut s = Session::open()?;

    match command {
        TxCommand::Add(fields) => {
            let draft = TransactionDraft {
                date: fields.date.unwrap_or_else(today),
                title: fields.title,
                amount: fields.amount,
                category: fields.category,
                card_id: fields.card,
            };
            let tx = s.ledger.record_transaction(&s.catalog, draft)?;
            println!(
                "Recorded {}: {} on {}, cashback {}",
                tx.id,
                format_vnd(tx.amount),
                tx.card_id,
                format_vnd(tx.cashback_earned)
            );
            s.save()?;
        }

        TxCommand::Edit {
            id,
            date,
            title,
            amount,
            category,
            card,
        } => {
            let Some(old) = s.ledger.transactions.iter().find(|t| t.id == id) else {
                bail!("no transaction with id {id}");
            };
            let draft = TransactionDraft {
                date: date.unwrap_or(old.date),
                title: title.unwrap_or_else(|| old.title.clone()),
                amount: amount.unwrap_or(old.amount),
                category: category.unwrap_or(old.category),
                card_id: card.unwrap_or_else(|| old.card_id.clone()),
            };
            let tx = s.ledger.edit_transaction(&s.catalog, &id, draft)?;
            println!("Updated {}: cashback {}", tx.id, format_vnd(tx.cashback_earned));
            s.save()?;
        }

        TxCommand::Rm { id } => {
            let tx = s.ledger.remove_transaction(&id)?;
            println!("Removed {} ({})", tx.id, tx.title);
            s.save()?;
        }

        TxCommand::Clear { yes } => {
            if !yes {
                bail!("this deletes every transaction; pass --yes to confirm");
            }
            let n = s.ledger.clear_transactions();
            println!("Removed {n} transactions");
            s.save()?;
        }

        TxCommand::List { month } => {
            let mut txs: Vec<_> = s
                .ledger
                .transactions
                .iter()
                .filter(|t| month.is_none_or(|m| m.contains(t.date)))
                .collect();
            txs.sort_by_key(|t| t.date);
            if txs.is_empty() {
                println!("No transactions.");
            }
            for t in txs {
                println!(
                    "{:<8} {} {:<30} {:>12} {:<12} {:<18} {:>10}",
                    t.id,
                    t.date,
                    t.title,
                    format_vnd(t.amount),
                    t.category.as_str(),
                    t.card_id,
                    format_vnd(t.cashback_earned)
                );
            }
        }

        TxCommand::Import { path } => {
            let parsed = parse_transactions_csv(&path)?;
            for (line, why) in &parsed.skipped {
                println!("line {line}: skipped ({why})");
            }
            let summary = s.ledger.import_rows(&s.catalog, parsed.rows);
            println!(
                "Imported {} transactions from {} ({} skipped)",
                summary.imported,
                path.display(),
                summary.skipped + parsed.skipped.len()
            );
            s.save()?;
        }

        TxCommand::Export { path, month } => {
            let txs: Vec<_> = s
                .ledger
                .transactions
                .iter()
                .filter(|t| month.is_none_or(|m| m.contains(t.date)))
                .cloned()
                .collect();
            write_transactions_csv(&path, &txs)?;
            println!("Wrote {} transactions to {}", txs.len(), path.display());
        }
    }

    Ok(())
}

fn run_item(command: ItemCommand) -> Result<()> {
    let mut s = Session::open()?;

    match command {
        ItemCommand::Add {
            name,
            price,
            category,
            date,
            priority,
        } => {
            let item = ShoppingItem::new("", name, price, category, date.unwrap_or_else(today))
                .with_priority(priority);
            let item = s.ledger.add_item(item)?;
            println!("Added {}: {} ({})", item.id, item.name, format_vnd(item.estimated_price));
            s.save()?;
        }
        ItemCommand::Rm { id } => {
            let item = s.ledger.remove_item(&id)?;
            println!("Removed {} ({})", item.id, item.name);
            s.save()?;
        }
        ItemCommand::Toggle { id } => {
            let purchased = s.ledger.toggle_item(&id)?;
            println!("{id}: {}", if purchased { "purchased" } else { "to buy" });
            s.save()?;
        }
        ItemCommand::List => {
            if s.ledger.shopping_items.is_empty() {
                println!("No planned purchases.");
            }
            for (date, items) in group_items_by_date(&s.ledger.shopping_items) {
                println!("{date}");
                for item in items {
                    let mark = if item.is_purchased { "x" } else { " " };
                    println!(
                        "  [{mark}] {:<8} {:<30} {:>12} {:<12} {:?}",
                        item.id,
                        item.name,
                        format_vnd(item.estimated_price),
                        item.category.as_str(),
                        item.priority
                    );
                }
            }
        }
    }

    Ok(())
}

fn run_event(command: EventCommand) -> Result<()> {
    let mut s = Session::open()?;

    match command {
        EventCommand::Add {
            title,
            amount,
            date,
            kind,
        } => {
            let event = FinancialEvent::new("", title, amount, date.unwrap_or_else(today), kind);
            let event = s.ledger.add_event(event)?;
            println!("Added {}: {} ({})", event.id, event.title, format_vnd(event.amount));
            s.save()?;
        }
        EventCommand::Rm { id } => {
            let event = s.ledger.remove_event(&id)?;
            println!("Removed {} ({})", event.id, event.title);
            s.save()?;
        }
        EventCommand::Toggle { id } => {
            let done = s.ledger.toggle_event(&id)?;
            println!("{id}: {}", if done { "completed" } else { "pending" });
            s.save()?;
        }
        EventCommand::List => {
            let flow = summarize_cash_flow(&s.ledger.events, s.ledger.current_asset);
            if flow.timeline.is_empty() {
                println!("No events.");
            }
            let today = today();
            for e in &flow.timeline {
                print_event(e, today);
            }
        }
    }

    Ok(())
}

fn print_event(e: &FinancialEvent, today: NaiveDate) {
    println!("{}", event_line(e, today));
}

fn event_line(e: &FinancialEvent, today: NaiveDate) -> String {
    let mark = if e.is_completed { "x" } else { " " };
    let sign = match e.kind {
        EventKind::Income => "+",
        EventKind::Expense => "-",
    };
    let overdue = if e.is_overdue(today) { "  (overdue)" } else { "" };
    format!(
        "  [{mark}] {:<9} {} {:<30} {sign}{}{overdue}",
        e.id,
        e.date,
        e.title,
        format_vnd(e.amount)
    )
}

async fn run_plan(s: &Session, advise: bool) -> Result<()> {
    let bills = pending_bills(&s.ledger.events);
    let plan = build_plan(&s.ledger.shopping_items, &bills, &s.catalog)?;

    if plan.entries.is_empty() {
        println!("Nothing planned: add items with `cashback item add` or bills with `cashback event add`.");
        return Ok(());
    }

    println!("Planned spend: {}", format_vnd(plan.total_spend));
    if let Some(t) = plan.threshold {
        if plan.threshold_unlocked {
            println!("Pooled card threshold {} reached.", format_vnd(t));
        } else {
            println!(
                "Pooled card threshold {} not reached ({} short).",
                format_vnd(t),
                format_vnd(t - plan.total_spend)
            );
        }
    }

    let pending_items: Vec<ShoppingItem> = s
        .ledger
        .shopping_items
        .iter()
        .filter(|i| !i.is_purchased)
        .cloned()
        .collect();
    println!("\nShopping");
    for (date, items) in group_items_by_date(&pending_items) {
        println!("  {date}");
        for item in items {
            if let Some(e) = plan.entry_for(&item.id) {
                print_suggestion(&e.item_name, e.amount, &e.card_name, e.rate, e.cashback, &e.reason);
            }
        }
    }

    let bill_entries: Vec<_> = plan
        .entries
        .iter()
        .filter(|e| e.source == SpendSource::Bill)
        .collect();
    if !bill_entries.is_empty() {
        println!("\nBills");
        for e in bill_entries {
            print_suggestion(&e.item_name, e.amount, &e.card_name, e.rate, e.cashback, &e.reason);
        }
    }

    println!("\nProjected cashback: {}", format_vnd(plan.total_projected_cashback));

    if advise {
        print_advice(&s.cfg, &plan_advice_request(&plan)).await;
    }
    Ok(())
}

fn print_suggestion(name: &str, amount: f64, card: &str, rate: f64, cashback: f64, reason: &str) {
    println!(
        "    {:<30} {:>12} -> {:<28} {:>6} {:>10}  ({})",
        name,
        format_vnd(amount),
        card,
        format_percent(rate),
        format_vnd(cashback),
        reason
    );
}

async fn run_report(s: &Session, month: CalendarMonth, advise: bool) -> Result<()> {
    let summary = summarize_spending(&s.ledger.transactions, &month);

    println!("Report for {month}\n");
    println!("Total spent:    {}", format_vnd(summary.total_spent));
    println!("Total cashback: {}", format_vnd(summary.total_cashback));
    println!("Effective rate: {:.2}%", summary.effective_rate_pct);

    if !summary.by_category.is_empty() {
        println!("\nBy category");
        for (category, totals) in &summary.by_category {
            println!(
                "  {:<12} {:>12} spent {:>10} cashback",
                category.as_str(),
                format_vnd(totals.spent),
                format_vnd(totals.cashback)
            );
        }
    }
    if !summary.by_day.is_empty() {
        println!("\nBy day");
        for (day, spent) in &summary.by_day {
            println!("  {day} {:>12}", format_vnd(*spent));
        }
    }

    let flow = summarize_cash_flow(&s.ledger.events, s.ledger.current_asset);
    println!("\nCash flow");
    println!("  Current asset:     {}", format_vnd(flow.current_asset));
    println!("  Pending income:    {}", format_vnd(flow.pending_income));
    println!("  Pending expenses:  {}", format_vnd(flow.pending_expense));
    println!("  Projected balance: {}", format_vnd(flow.projected_balance));
    let today = today();
    for e in flow.timeline.iter().filter(|e| !e.is_completed) {
        print_event(e, today);
    }

    if advise {
        let txs: Vec<_> = s
            .ledger
            .transactions
            .iter()
            .filter(|t| month.contains(t.date))
            .cloned()
            .collect();
        let usage = s.ledger.usage(&s.catalog, month);
        print_advice(&s.cfg, &history_analysis_request(&txs, &s.catalog, &usage)).await;
    }
    Ok(())
}

/// Runs after the numeric output is on screen; failures become the fallback text.
async fn print_advice(cfg: &config::Config, req: &AdvisoryRequest) {
    use std::io::Write;
    println!("\nAdvice (asking {})...", cfg.advisor.provider);
    std::io::stdout().flush().ok();

    let keys = auth::load_keys().unwrap_or_else(|e| {
        tracing::warn!(error = %format!("{e:#}"), "could not read auth.json");
        auth::AdvisorKeys::default()
    });
    let text = advisor::advise(&cfg.advisor, &keys, req).await;
    println!("{text}");
}
