//! Type-safe price representation using decimal arithmetic.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is not a decimal number.
    #[error("invalid price amount: {0}")]
    Invalid(String),
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Parse a decimal string as returned by Shopify (e.g. `"189.00"`).
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] for non-numeric input and
    /// [`PriceError::Negative`] for amounts below zero.
    pub fn parse(amount: &str, currency_code: CurrencyCode) -> Result<Self, PriceError> {
        let amount = Decimal::from_str(amount.trim())
            .map_err(|_| PriceError::Invalid(amount.to_owned()))?;
        Self::checked(amount, currency_code)
    }

    /// Wrap an already-decimal amount, rejecting negatives.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero.
    pub fn checked(amount: Decimal, currency_code: CurrencyCode) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self::new(amount, currency_code))
    }

    /// Format for display, e.g. `$189.00` or `€95.50`.
    #[must_use]
    pub fn display(&self) -> String {
        let mut amount = self.amount.round_dp(2);
        amount.rescale(2);
        format!("{}{amount}", self.currency_code.symbol())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shopify_amount() {
        let price = Price::parse("189.00", CurrencyCode::USD).unwrap();
        assert_eq!(price.amount, Decimal::new(18900, 2));
    }

    #[test]
    fn test_parse_rejects_garbage_and_negative() {
        assert!(matches!(
            Price::parse("abc", CurrencyCode::USD),
            Err(PriceError::Invalid(_))
        ));
        assert_eq!(
            Price::parse("-1.00", CurrencyCode::USD),
            Err(PriceError::Negative)
        );
        assert!(Price::parse("0", CurrencyCode::USD).is_ok());
    }

    #[test]
    fn test_display_pads_to_cents() {
        assert_eq!(
            Price::parse("95.5", CurrencyCode::EUR).unwrap().display(),
            "€95.50"
        );
        assert_eq!(
            Price::parse("120", CurrencyCode::USD).unwrap().display(),
            "$120.00"
        );
        assert_eq!(
            Price::parse("19.999", CurrencyCode::GBP).unwrap().display(),
            "£20.00"
        );
    }
}
