//! Parsing of raw HTML form values.
//!
//! Browsers submit everything as strings and users type dates either the
//! Ukrainian way (`31.12.2024`) or the ISO way (`2024-12-31`), and amounts
//! with either a comma or a dot as decimal separator.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a non-blank form value cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("invalid date '{0}'")]
    Date(String),
    #[error("invalid number '{0}'")]
    Number(String),
    #[error("invalid integer '{0}'")]
    Integer(String),
}

const DATE_FORMATS: [&str; 2] = ["%d.%m.%Y", "%Y-%m-%d"];

/// Trimmed value, or `None` when the field was left blank.
pub fn non_empty(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses `DD.MM.YYYY` or `YYYY-MM-DD`.
pub fn parse_date(input: &str) -> Result<NaiveDate, FormError> {
    let trimmed = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| FormError::Date(trimmed.to_string()))
}

/// Like [`parse_date`] but a blank value is `Ok(None)`.
pub fn parse_optional_date(input: &str) -> Result<Option<NaiveDate>, FormError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    parse_date(input).map(Some)
}

/// Strict `YYYY-MM-DD`, as produced by `<input type="date">`.
pub fn parse_iso_date(input: &str) -> Result<NaiveDate, FormError> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| FormError::Date(trimmed.to_string()))
}

/// Parses an amount. Blank and `-` mean zero, a comma is a decimal point
/// and spaces used as thousands separators are ignored.
pub fn parse_decimal(input: &str) -> Result<Decimal, FormError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Ok(Decimal::ZERO);
    }
    let normalized: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    Decimal::from_str(&normalized).map_err(|_| FormError::Number(trimmed.to_string()))
}

pub fn parse_integer(input: &str) -> Result<i32, FormError> {
    let trimmed = input.trim();
    trimmed
        .parse::<i32>()
        .map_err(|_| FormError::Integer(trimmed.to_string()))
}

/// `DD.MM.YYYY`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// `DD.MM.YYYY HH:MM`
pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format("%d.%m.%Y %H:%M").to_string()
}
