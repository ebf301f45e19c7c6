use super::errors::DatabaseError;
use super::{NewUser, PurchaseGrant, PurchaseOutcome, RedeemOutcome, User, UserStore};
use async_trait::async_trait;
use postgrest::Postgrest;

mod purchase;
mod user;

/// Supabase (PostgREST) backed store
pub struct DatabaseService {
    pub client: Postgrest,
}

impl DatabaseService {
    pub fn new(url: &str, service_key: &str) -> Result<Self, DatabaseError> {
        if url.is_empty() || service_key.is_empty() {
            return Err(DatabaseError::ConnectionError(
                "Supabase url and service key are required".to_string(),
            ));
        }

        let rest_url = format!("{}/rest/v1", url.trim_end_matches('/'));
        let client = Postgrest::new(&rest_url)
            .insert_header("apikey", service_key)
            .insert_header("Authorization", format!("Bearer {}", service_key));

        Ok(Self { client })
    }
}

#[async_trait]
impl UserStore for DatabaseService {
    async fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        self.get_user_by_id(id).await
    }

    async fn register_user(&self, profile: &NewUser) -> Result<bool, DatabaseError> {
        self.register_user_rpc(profile).await
    }

    async fn list_user_ids(&self) -> Result<Vec<i64>, DatabaseError> {
        self.fetch_user_ids().await
    }

    async fn apply_purchase(
        &self,
        grant: &PurchaseGrant,
    ) -> Result<PurchaseOutcome, DatabaseError> {
        self.apply_purchase_rpc(grant).await
    }

    async fn redeem_points(
        &self,
        user_id: i64,
        cost: i64,
        reward: &str,
    ) -> Result<RedeemOutcome, DatabaseError> {
        self.redeem_points_rpc(user_id, cost, reward).await
    }
}
