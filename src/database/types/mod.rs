mod purchase;
mod user;

pub use purchase::{PurchaseGrant, PurchaseOutcome, RedeemOutcome};
pub use user::{NewUser, User};
