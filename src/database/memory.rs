use super::{
    DatabaseError, NewUser, PurchaseGrant, PurchaseOutcome, RedeemOutcome, User, UserStore,
};
use async_trait::async_trait;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    claimed_captures: HashSet<String>,
}

/// Process-local store for development and tests. One mutex guards both
/// tables so claim and update happen together.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn fill(column: &mut Option<String>, value: &Option<String>) {
    if column.is_none() {
        column.clone_from(value);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn register_user(&self, profile: &NewUser) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.lock().await;
        match tables.users.entry(profile.id) {
            Entry::Vacant(slot) => {
                slot.insert(User::from(profile.clone()));
                Ok(true)
            }
            // A purchase may have created the row before the first /start
            Entry::Occupied(mut slot) => {
                let user = slot.get_mut();
                fill(&mut user.username, &profile.username);
                fill(&mut user.first_name, &profile.first_name);
                fill(&mut user.last_name, &profile.last_name);
                fill(&mut user.language_code, &profile.language_code);
                Ok(false)
            }
        }
    }

    async fn list_user_ids(&self) -> Result<Vec<i64>, DatabaseError> {
        Ok(self.tables.lock().await.users.keys().copied().collect())
    }

    async fn apply_purchase(
        &self,
        grant: &PurchaseGrant,
    ) -> Result<PurchaseOutcome, DatabaseError> {
        let mut tables = self.tables.lock().await;
        if !tables.claimed_captures.insert(grant.capture_id.clone()) {
            return Ok(PurchaseOutcome::Duplicate);
        }

        let user = tables.users.entry(grant.user_id).or_insert_with(|| {
            User::from(NewUser {
                id: grant.user_id,
                username: None,
                first_name: None,
                last_name: None,
                language_code: None,
            })
        });
        if let Some(status) = &grant.status {
            user.status = Some(status.clone());
            user.status_start = grant.status_start;
            user.status_end = grant.status_end;
        }
        user.punkte = user.punkte.saturating_add(grant.points);
        user.purchases.push(grant.product_name.clone());

        Ok(PurchaseOutcome::Applied)
    }

    async fn redeem_points(
        &self,
        user_id: i64,
        cost: i64,
        reward: &str,
    ) -> Result<RedeemOutcome, DatabaseError> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or(DatabaseError::UserNotFound)?;

        if user.punkte < cost {
            return Ok(RedeemOutcome::InsufficientPoints {
                balance: user.punkte,
            });
        }
        user.punkte -= cost;
        user.purchases.push(reward.to_string());

        Ok(RedeemOutcome::Redeemed {
            remaining: user.punkte,
        })
    }
}
