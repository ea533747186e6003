//! Input validation at the API boundary
//!
//! Everything that reaches the billing and analytics code has passed through
//! here first: periods are one of the supported values, prices are positive
//! and dates are real calendar dates.

use chrono::NaiveDate;
use regex::Regex;

use crate::billing::parse_day;
use crate::error::{Error, Result};
use crate::models::BillingPeriod;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const CARD_NUMBER_LEN: std::ops::RangeInclusive<usize> = 4..=24;

/// Trimmed name with at least [`MIN_NAME_LEN`] characters
pub fn validate_name(input: &str, field: &str) -> Result<String> {
    let name = input.trim();
    if name.chars().count() < MIN_NAME_LEN {
        return Err(Error::InvalidData(format!(
            "{} must be at least {} characters",
            field, MIN_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

/// Parse a price, accepting `,` as the decimal separator
pub fn parse_price(input: &str) -> Result<f64> {
    let normalized = input.trim().replace(',', ".");
    let price: f64 = normalized
        .parse()
        .map_err(|_| Error::InvalidData(format!("Invalid price: {}", input.trim())))?;
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::InvalidData(
            "Price must be greater than zero".to_string(),
        ));
    }
    Ok(price)
}

/// Validate an already-numeric price
pub fn check_price(price: f64) -> Result<f64> {
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::InvalidData(
            "Price must be greater than zero".to_string(),
        ));
    }
    Ok(price)
}

pub fn parse_period(months: i64) -> Result<BillingPeriod> {
    BillingPeriod::try_from(months).map_err(Error::InvalidData)
}

/// Optional `YYYY-MM-DD` date; blank input means no date
pub fn parse_optional_date(input: Option<&str>) -> Result<Option<NaiveDate>> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_day(value)
            .map(Some)
            .ok_or_else(|| Error::InvalidData(format!("Invalid date: {}", value))),
    }
}

/// Trimmed, lower-cased email
pub fn normalize_email(input: &str) -> Result<String> {
    let email = input.trim().to_lowercase();
    let re = Regex::new(EMAIL_PATTERN)?;
    if !re.is_match(&email) {
        return Err(Error::InvalidData("Invalid email address".to_string()));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidData(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Collapse whitespace and keep only digits, `*` and spaces
pub fn normalize_card_number(input: &str) -> Result<String> {
    let collapsed = Regex::new(r"\s+")?.replace_all(input, " ");
    let cleaned = Regex::new(r"[^0-9* ]")?.replace_all(collapsed.trim(), "");
    let card = cleaned.trim().to_string();
    if !CARD_NUMBER_LEN.contains(&card.chars().count()) {
        return Err(Error::InvalidData(format!(
            "Card number must be {} to {} characters",
            CARD_NUMBER_LEN.start(),
            CARD_NUMBER_LEN.end()
        )));
    }
    Ok(card)
}

/// Optional avatar link; must be an http(s) URL when present
pub fn normalize_avatar_link(input: Option<&str>) -> Result<Option<String>> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(link) => {
            let lower = link.to_lowercase();
            let has_host = lower
                .strip_prefix("https://")
                .or_else(|| lower.strip_prefix("http://"))
                .is_some_and(|rest| !rest.is_empty());
            if !has_host {
                return Err(Error::InvalidData(
                    "Avatar link must be an http or https URL".to_string(),
                ));
            }
            Ok(Some(link.to_string()))
        }
    }
}

/// Required free-text field such as a ban reason
pub fn required_text(input: &str, field: &str) -> Result<String> {
    match input.trim() {
        "" => Err(Error::InvalidData(format!("{} is required", field))),
        text => Ok(text.to_string()),
    }
}

/// Trim an optional text field, mapping blank to `None`
pub fn optional_text(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
