//! cashback-ledger: JSON-backed transaction ledger and CSV import/export

pub mod csv_io;
pub mod store;

pub use csv_io::{parse_transactions_csv, write_transactions_csv, ImportedRow, ParsedCsv};
pub use store::{ImportSummary, Ledger, TransactionDraft};
