//! Validation utilities for the Stock Ledger platform
//!
//! Every date that enters the system goes through [`normalize_date`] so that
//! report and cascade code only ever sees a calendar date in local civil time.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use thiserror::Error;

/// Canonical wire format for ledger dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("Invalid date format: '{0}'. Expected YYYY-MM-DD, DD/MM/YYYY or an ISO datetime")]
    Malformed(String),

    #[error("Date {date} is in the future (today is {today})")]
    InFuture { date: NaiveDate, today: NaiveDate },

    #[error("Date is outside the supported calendar range")]
    OutOfRange,
}

// ============================================================================
// Date Normalization
// ============================================================================

/// The current calendar date in local civil time
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Normalize a caller-supplied date to a calendar date.
///
/// Accepts `YYYY-MM-DD`, `DD/MM/YYYY`, and ISO datetimes with or without an
/// offset. Datetimes carrying an offset are converted to the local calendar
/// date; naive datetimes keep their own date.
pub fn normalize_date(input: &str) -> Result<NaiveDate, DateError> {
    let trimmed = input.trim();
    let malformed = || DateError::Malformed(trimmed.to_string());

    if trimmed.is_empty() {
        return Err(malformed());
    }

    if trimmed.contains('T') {
        if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(with_offset.with_timezone(&Local).date_naive());
        }
        return ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
            .map(|naive| naive.date())
            .ok_or_else(malformed);
    }

    if trimmed.contains('/') {
        return parse_day_month_year(trimmed).ok_or_else(malformed);
    }

    if !is_iso_date_shape(trimmed) {
        return Err(malformed());
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| malformed())
}

/// `DD/MM/YYYY`, day and month may be a single digit
fn parse_day_month_year(input: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = input.split('/').collect();
    let [day, month, year] = parts.as_slice() else {
        return None;
    };
    let (day, month, year) = (*day, *month, *year);

    let digits = |s: &str, min: usize, max: usize| {
        (min..=max).contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit())
    };
    if !digits(day, 1, 2) || !digits(month, 1, 2) || !digits(year, 4, 4) {
        return None;
    }

    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Exactly `NNNN-NN-NN`
fn is_iso_date_shape(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Format a date as `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Reject dates later than `today`
pub fn validate_not_future(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate, DateError> {
    if date > today {
        return Err(DateError::InFuture { date, today });
    }
    Ok(date)
}

/// Normalize a ledger date and reject it if it is after `today`
pub fn parse_ledger_date(input: &str, today: NaiveDate) -> Result<NaiveDate, DateError> {
    validate_not_future(normalize_date(input)?, today)
}

/// `date - 1` by calendar field arithmetic
pub fn previous_day(date: NaiveDate) -> Result<NaiveDate, DateError> {
    date.pred_opt().ok_or(DateError::OutOfRange)
}

/// `date + 1` by calendar field arithmetic
pub fn next_day(date: NaiveDate) -> Result<NaiveDate, DateError> {
    date.succ_opt().ok_or(DateError::OutOfRange)
}

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate that a quantity or price is not negative
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Value cannot be negative");
    }
    Ok(())
}

/// `validator` adapter for non-negative decimal fields
pub fn validate_non_negative(value: &Decimal) -> Result<(), validator::ValidationError> {
    validate_quantity(*value).map_err(|msg| {
        let mut error = validator::ValidationError::new("non_negative");
        error.message = Some(msg.into());
        error
    })
}
