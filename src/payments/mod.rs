use crate::catalog::money::MoneyError;
use crate::catalog::Money;
use crate::database::DatabaseError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod checkout_link;
pub mod fulfilment;
pub mod paypal;
pub mod webhook;

pub use checkout_link::LinkSigner;
pub use fulfilment::{FulfilmentOutcome, FulfilmentService};
pub use paypal::PaypalClient;
pub use webhook::{WebhookOutcome, WebhookProcessor};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("PayPal request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("PayPal returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Could not decode PayPal payload: {0}")]
    Decode(String),

    #[error("PayPal credentials are not configured")]
    MissingCredentials,

    #[error("Order {0} has no approve link")]
    MissingApproveLink(String),

    #[error("Order {0} has no capture")]
    NoCapture(String),

    #[error("Invalid buyer reference: {0}")]
    InvalidReference(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    #[error("Store error: {0}")]
    Database(#[from] DatabaseError),
}

/// Who bought what, carried through PayPal in `custom_id` as `<telegram_id>:<SKU>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyerReference {
    pub user_id: i64,
    pub sku: String,
}

impl FromStr for BuyerReference {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PaymentError::InvalidReference(s.to_string());
        let (user_id, sku) = s.trim().split_once(':').ok_or_else(invalid)?;
        let user_id: i64 = user_id.parse().map_err(|_| invalid())?;
        if user_id <= 0 || sku.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            user_id,
            sku: sku.to_string(),
        })
    }
}

impl fmt::Display for BuyerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.sku)
    }
}

/// A capture as far as fulfilment cares about it
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedCapture {
    pub capture_id: String,
    pub order_id: Option<String>,
    pub status: String,
    pub buyer: BuyerReference,
    pub amount: Money,
}

impl CompletedCapture {
    pub fn is_completed(&self) -> bool {
        self.status == "COMPLETED"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buyer_reference_parsing() {
        let buyer: BuyerReference = "123:VIP_PASS".parse().unwrap();
        assert_eq!(buyer.user_id, 123);
        assert_eq!(buyer.sku, "VIP_PASS");
        assert_eq!(buyer.to_string(), "123:VIP_PASS");

        for bad in ["123", ":VIP_PASS", "abc:VIP_PASS", "123:", "-5:VIP_PASS"] {
            assert!(bad.parse::<BuyerReference>().is_err(), "{bad}");
        }
    }
}
