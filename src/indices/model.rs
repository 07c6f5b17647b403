use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of macroeconomic index an observation belongs to.
///
/// `None` is a sentinel for leases that carry no adjustment clause: every
/// factor computed against it is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexType {
    /// Monthly consumer-price inflation, stored as the month's percentage change.
    ConsumerPrice,
    /// Rental contract adjustment index published as an absolute level.
    RentalContract,
    /// Informal-market exchange rate (sell).
    ExchangeBlue,
    /// Official exchange rate (sell).
    ExchangeOfficial,
    /// Stock-market-settled exchange rate (sell).
    ExchangeMep,
    None,
}

impl IndexType {
    pub const ALL: [IndexType; 6] = [
        IndexType::ConsumerPrice,
        IndexType::RentalContract,
        IndexType::ExchangeBlue,
        IndexType::ExchangeOfficial,
        IndexType::ExchangeMep,
        IndexType::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::ConsumerPrice => "CONSUMER_PRICE",
            IndexType::RentalContract => "RENTAL_CONTRACT",
            IndexType::ExchangeBlue => "EXCHANGE_BLUE",
            IndexType::ExchangeOfficial => "EXCHANGE_OFFICIAL",
            IndexType::ExchangeMep => "EXCHANGE_MEP",
            IndexType::None => "NONE",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown index type: {0}")]
pub struct ParseIndexTypeError(pub String);

impl FromStr for IndexType {
    type Err = ParseIndexTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONSUMER_PRICE" => Ok(IndexType::ConsumerPrice),
            "RENTAL_CONTRACT" => Ok(IndexType::RentalContract),
            "EXCHANGE_BLUE" => Ok(IndexType::ExchangeBlue),
            "EXCHANGE_OFFICIAL" => Ok(IndexType::ExchangeOfficial),
            "EXCHANGE_MEP" => Ok(IndexType::ExchangeMep),
            "NONE" => Ok(IndexType::None),
            _ => Err(ParseIndexTypeError(s.to_string())),
        }
    }
}

/// Validated two-letter ISO country code, uppercased on parse.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid country code: {0:?} (expected two ASCII letters)")]
pub struct ParseCountryCodeError(pub String);

impl CountryCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CountryCode {
    type Err = ParseCountryCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(CountryCode(trimmed.to_ascii_uppercase()))
        } else {
            Err(ParseCountryCodeError(s.to_string()))
        }
    }
}

impl TryFrom<String> for CountryCode {
    type Error = ParseCountryCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CountryCode> for String {
    fn from(value: CountryCode) -> Self {
        value.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for CountryCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// One dated data point of one index type for one country.
///
/// The (index_type, country, value_date) tuple is unique in any store;
/// observations are append-only and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexObservation {
    pub index_type: IndexType,
    pub country: CountryCode,
    /// The date the observation applies to, not when it was fetched.
    pub value_date: NaiveDate,
    pub value: Decimal,
    /// Identifier of the origin feed.
    pub source: String,
    /// Original payload kept for audit, when the source provides one per item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    pub created_at: DateTime<Utc>,
}
