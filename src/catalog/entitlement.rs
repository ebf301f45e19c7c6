use super::money::Money;
use super::Product;
use crate::database::PurchaseGrant;
use chrono::{Days, Months, NaiveDate, Utc};
use chrono_tz::Europe::Berlin;

/// Validity at or above this many days means lifetime access
pub const UNLIMITED_DAYS: u32 = 9999;
pub const LIFETIME_YEARS: u32 = 50;

// 15 % of the paid amount, expressed against cents
const POINTS_PERCENT: i64 = 15;

/// Calendar date the shop runs on
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&Berlin).date_naive()
}

/// `None` means the entitlement has no end date.
pub fn status_end(start: NaiveDate, validity_days: u32) -> Option<NaiveDate> {
    match validity_days {
        0 => None,
        days if days >= UNLIMITED_DAYS => {
            start.checked_add_months(Months::new(LIFETIME_YEARS * 12))
        }
        days => start.checked_add_days(Days::new(u64::from(days))),
    }
}

/// floor(amount * 0.15 * multiplier)
pub fn loyalty_points(paid: &Money, multiplier: u32) -> i64 {
    if paid.cents <= 0 {
        return 0;
    }
    // Widened so absurd captures saturate instead of overflowing
    let points =
        i128::from(paid.cents) * i128::from(POINTS_PERCENT) * i128::from(multiplier) / 10_000;
    i64::try_from(points).unwrap_or(i64::MAX)
}

pub fn grant_for(
    product: &Product,
    capture_id: &str,
    user_id: i64,
    paid: &Money,
    today: NaiveDate,
) -> PurchaseGrant {
    let (status, status_start, status_end) = match product.status {
        Some(status) if product.validity_days > 0 => (
            Some(status.to_string()),
            Some(today),
            status_end(today, product.validity_days),
        ),
        _ => (None, None, None),
    };

    PurchaseGrant {
        capture_id: capture_id.to_string(),
        user_id,
        sku: product.sku.to_string(),
        product_name: product.name.to_string(),
        status,
        status_start,
        status_end,
        points: loyalty_points(paid, product.points_multiplier),
        amount_cents: paid.cents,
        currency: paid.currency.clone(),
    }
}
