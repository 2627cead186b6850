//! Error taxonomy for the cashback engine.
//!
//! Cap exhaustion is deliberately absent: it is a normal outcome reported
//! through [`crate::rebate::CapOutcome`], not a failure.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CashbackError {
    #[error("{field} must be a finite, non-negative amount (got {value})")]
    InvalidAmount { field: &'static str, value: f64 },

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown card: {0}")]
    UnknownCard(String),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid accounting period '{0}' (expected YYYY-MM)")]
    InvalidPeriod(String),

    #[error("invalid card catalog: {0}")]
    InvalidCatalog(String),
}

pub type Result<T> = std::result::Result<T, CashbackError>;

/// Reject negative, NaN and infinite amounts. Zero is valid.
pub(crate) fn check_amount(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(CashbackError::InvalidAmount { field, value })
    }
}

pub(crate) fn check_present(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(CashbackError::MissingField { field })
    } else {
        Ok(())
    }
}
