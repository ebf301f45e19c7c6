use chrono::NaiveDate;
use serde::Serialize;

/// Everything a fulfilled capture writes, applied in one transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseGrant {
    pub capture_id: String,
    pub user_id: i64,
    pub sku: String,
    pub product_name: String,
    // None for one-off products, which leave the current tier untouched
    pub status: Option<String>,
    pub status_start: Option<NaiveDate>,
    pub status_end: Option<NaiveDate>,
    pub points: i64,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Applied,
    // Capture id was already claimed, nothing changed
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    Redeemed { remaining: i64 },
    InsufficientPoints { balance: i64 },
}
