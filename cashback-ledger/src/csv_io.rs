//! CSV import/export of card transactions.
//!
//! Import expects a header row naming at least `date,title,amount,category,card`
//! (any order, case-insensitive). An optional `cashback` column carries a
//! previously computed rebate, as written by [`write_transactions_csv`].
//! Amounts may use Vietnamese (`1.250.000đ`) or English (`1,250,000`) grouping.

use anyhow::{bail, Context, Result};
use cashback_core::{Category, Transaction};
use chrono::NaiveDate;
use regex::Regex;
use std::io;
use std::path::Path;

/// One parsed data row, not yet priced.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedRow {
    pub line: usize,
    pub date: NaiveDate,
    pub title: String,
    pub amount: f64,
    pub category: Category,
    pub card_id: String,
    pub cashback: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCsv {
    pub rows: Vec<ImportedRow>,
    /// (line number, why it was skipped)
    pub skipped: Vec<(usize, String)>,
}

struct Columns {
    date: usize,
    title: usize,
    amount: usize,
    category: usize,
    card: usize,
    cashback: Option<usize>,
}

pub fn parse_transactions_csv(path: impl AsRef<Path>) -> Result<ParsedCsv> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("opening {}", path.as_ref().display()))?;
    parse_transactions_reader(file)
        .with_context(|| format!("parsing {}", path.as_ref().display()))
}

pub fn parse_transactions_reader<R: io::Read>(reader: R) -> Result<ParsedCsv> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("reading CSV header")?.clone();
    let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let require = |name: &str| find(name).with_context(|| format!("CSV is missing a '{name}' column"));

    let cols = Columns {
        date: require("date")?,
        title: require("title")?,
        amount: require("amount")?,
        category: require("category")?,
        card: require("card")?,
        cashback: find("cashback"),
    };

    let amount_re = amount_regex()?;
    let mut parsed = ParsedCsv::default();

    for (i, result) in rdr.records().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let record = result?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        match parse_row(&record, &cols, &amount_re, line) {
            Ok(row) => parsed.rows.push(row),
            Err(e) => parsed.skipped.push((line, e.to_string())),
        }
    }

    Ok(parsed)
}

fn parse_row(
    record: &csv::StringRecord,
    cols: &Columns,
    amount_re: &Regex,
    line: usize,
) -> Result<ImportedRow> {
    let field = |idx: usize| record.get(idx).unwrap_or("");

    let date = parse_date(field(cols.date))?;
    let title = field(cols.title).to_string();
    if title.is_empty() {
        bail!("empty title");
    }
    let amount = parse_amount(amount_re, field(cols.amount))?;
    let category: Category = field(cols.category).parse()?;
    let card_id = field(cols.card).to_string();
    if card_id.is_empty() {
        bail!("empty card");
    }
    let cashback = match cols.cashback.map(field) {
        Some(s) if !s.is_empty() => Some(parse_amount(amount_re, s)?),
        _ => None,
    };

    Ok(ImportedRow {
        line,
        date,
        title,
        amount,
        category,
        card_id,
        cashback,
    })
}

fn amount_regex() -> Result<Regex> {
    // Either grouped thousands ("1.250.000", "1,250,000") or a plain number.
    Ok(Regex::new(
        r"^(?:(?P<grouped>\d{1,3}(?:[.,]\d{3})+)|(?P<plain>\d+(?:\.\d+)?))$",
    )?)
}

/// Parse a non-negative amount, tolerating currency markers.
pub fn parse_amount(re: &Regex, raw: &str) -> Result<f64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches(['đ', '₫'])
        .trim_end_matches("VND")
        .trim_end_matches("vnd")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let Some(caps) = re.captures(&cleaned) else {
        bail!("invalid amount '{raw}'");
    };
    if let Some(g) = caps.name("grouped") {
        let digits: String = g.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
        return Ok(digits.parse()?);
    }
    Ok(caps["plain"].parse()?)
}

/// ISO dates, or day-first dates as written by Vietnamese locales.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .with_context(|| format!("invalid date '{raw}'"))
}

pub fn write_transactions_csv(path: impl AsRef<Path>, transactions: &[Transaction]) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())
        .with_context(|| format!("creating {}", path.as_ref().display()))?;
    write_transactions(file, transactions)
}

pub fn write_transactions<W: io::Write>(writer: W, transactions: &[Transaction]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["date", "title", "amount", "category", "card", "cashback"])?;
    for t in transactions {
        wtr.write_record([
            t.date.to_string(),
            t.title.clone(),
            t.amount.to_string(),
            t.category.to_string(),
            t.card_id.clone(),
            t.cashback_earned.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
