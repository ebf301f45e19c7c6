use super::super::types::{NewUser, User};
use super::DatabaseError;
use super::DatabaseService;
use serde::Deserialize;
use serde_json::json;

// PostgREST caps responses, so ids are fetched page by page
const PAGE_SIZE: usize = 1000;

#[derive(Deserialize)]
struct IdRow {
    id: i64,
}

impl DatabaseService {
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let response = self
            .client
            .from("users")
            .select("*")
            .eq("id", id.to_string())
            .single()
            .execute()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        if response.status() == 406 {
            // No rows found
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(DatabaseError::ResponseError {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let user: User = response
            .json()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        Ok(Some(user))
    }

    /// Inserts the profile, or fills the profile columns a purchase left
    /// empty. Returns true only for a brand new row.
    pub async fn register_user_rpc(&self, profile: &NewUser) -> Result<bool, DatabaseError> {
        let params = json!({
            "p_id": profile.id,
            "p_username": profile.username,
            "p_first_name": profile.first_name,
            "p_last_name": profile.last_name,
            "p_language_code": profile.language_code,
        });

        let response = self
            .client
            .rpc("register_user", params.to_string())
            .execute()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DatabaseError::ResponseError {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))
    }

    pub async fn fetch_user_ids(&self) -> Result<Vec<i64>, DatabaseError> {
        let mut ids = Vec::new();
        let mut offset = 0;

        loop {
            let response = self
                .client
                .from("users")
                .select("id")
                .order("id.asc")
                .range(offset, offset + PAGE_SIZE - 1)
                .execute()
                .await
                .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

            if !response.status().is_success() {
                return Err(DatabaseError::ResponseError {
                    status: response.status().as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }

            let page: Vec<IdRow> = response
                .json()
                .await
                .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
            let page_len = page.len();
            ids.extend(page.into_iter().map(|row| row.id));

            if page_len < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }

        Ok(ids)
    }
}
