use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MoneyError {
    #[error("Invalid amount:{0}")]
    InvalidAmount(String),
}

/// Amount in minor units, so point and price math never touches floats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Money {
    pub cents: i64,
    pub currency: String,
}

impl Money {
    pub fn new(cents: i64, currency: &str) -> Self {
        Self {
            cents,
            currency: currency.to_uppercase(),
        }
    }

    /// Parses PayPal style values such as "40.00", "40.5" or "40"
    pub fn parse(value: &str, currency: &str) -> Result<Self, MoneyError> {
        let invalid = || MoneyError::InvalidAmount(value.to_string());
        let value = value.trim();

        let (whole, fraction) = match value.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (value, ""),
        };
        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || fraction.len() > 2
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .ok_or_else(invalid)?;

        Ok(Self::new(cents, currency))
    }

    /// Value string as PayPal expects it in order requests
    pub fn value(&self) -> String {
        format!("{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value(), self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paypal_values() {
        assert_eq!(Money::parse("40.00", "EUR").unwrap().cents, 4000);
        assert_eq!(Money::parse("40.5", "eur").unwrap(), Money::new(4050, "EUR"));
        assert_eq!(Money::parse("150", "EUR").unwrap().cents, 15000);
        assert_eq!(Money::parse("0.07", "EUR").unwrap().cents, 7);
    }

    #[test]
    fn test_rejects_malformed_values() {
        for value in ["", "-1.00", "1.234", "abc", ".50", "1,00", "1.-5"] {
            assert!(Money::parse(value, "EUR").is_err(), "{value} should fail");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::new(4005, "EUR").to_string(), "40.05 EUR");
        assert_eq!(Money::new(15000, "EUR").value(), "150.00");
    }
}
