use super::super::types::{PurchaseGrant, PurchaseOutcome, RedeemOutcome};
use super::DatabaseError;
use super::DatabaseService;
use serde_json::json;

// Both functions are defined in migrations/001_init.sql and run as one
// transaction each on the database side.
impl DatabaseService {
    pub async fn apply_purchase_rpc(
        &self,
        grant: &PurchaseGrant,
    ) -> Result<PurchaseOutcome, DatabaseError> {
        let params = json!({
            "p_capture_id": grant.capture_id,
            "p_user_id": grant.user_id,
            "p_sku": grant.sku,
            "p_product": grant.product_name,
            "p_status": grant.status,
            "p_status_start": grant.status_start,
            "p_status_end": grant.status_end,
            "p_points": grant.points,
            "p_amount_cents": grant.amount_cents,
            "p_currency": grant.currency,
        });

        let response = self
            .client
            .rpc("apply_purchase", params.to_string())
            .execute()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DatabaseError::ResponseError {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let applied: bool = response
            .json()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        Ok(if applied {
            PurchaseOutcome::Applied
        } else {
            PurchaseOutcome::Duplicate
        })
    }

    pub async fn redeem_points_rpc(
        &self,
        user_id: i64,
        cost: i64,
        reward: &str,
    ) -> Result<RedeemOutcome, DatabaseError> {
        let params = json!({
            "p_user_id": user_id,
            "p_cost": cost,
            "p_reward": reward,
        });

        let response = self
            .client
            .rpc("redeem_points", params.to_string())
            .execute()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DatabaseError::ResponseError {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        // null when the balance was too small
        let remaining: Option<i64> = response
            .json()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        match remaining {
            Some(remaining) => Ok(RedeemOutcome::Redeemed { remaining }),
            None => {
                let user = self
                    .get_user_by_id(user_id)
                    .await?
                    .ok_or(DatabaseError::UserNotFound)?;
                Ok(RedeemOutcome::InsufficientPoints {
                    balance: user.punkte,
                })
            }
        }
    }
}
