use async_trait::async_trait;

pub mod errors;
mod memory;
mod services;
pub mod types;

pub use errors::DatabaseError;
pub use memory::MemoryStore;
pub use services::DatabaseService;
pub use types::{NewUser, PurchaseGrant, PurchaseOutcome, RedeemOutcome, User};

/// Persistence used by the bot and the webshop.
///
/// `apply_purchase` and `redeem_points` must be atomic: the first claims the
/// capture id and updates the user in one step, the second checks and
/// decrements the balance in one step.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError>;

    /// Returns false when the user was already registered
    async fn register_user(&self, profile: &NewUser) -> Result<bool, DatabaseError>;

    async fn list_user_ids(&self) -> Result<Vec<i64>, DatabaseError>;

    async fn count_users(&self) -> Result<usize, DatabaseError> {
        Ok(self.list_user_ids().await?.len())
    }

    async fn apply_purchase(&self, grant: &PurchaseGrant)
        -> Result<PurchaseOutcome, DatabaseError>;

    async fn redeem_points(
        &self,
        user_id: i64,
        cost: i64,
        reward: &str,
    ) -> Result<RedeemOutcome, DatabaseError>;
}
