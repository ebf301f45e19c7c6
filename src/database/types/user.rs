use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_start: Option<NaiveDate>,
    #[serde(default)]
    pub status_end: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub punkte: i64,
    // Older deployments named the column "produkte"
    #[serde(default, alias = "produkte", deserialize_with = "null_as_default")]
    pub purchases: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// An entitlement without an end date never expires
    pub fn has_active_status(&self, today: NaiveDate) -> bool {
        self.status.is_some() && self.status_end.map_or(true, |end| end >= today)
    }
}

impl From<NewUser> for User {
    fn from(profile: NewUser) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            language_code: profile.language_code,
            status: None,
            status_start: None,
            status_end: None,
            punkte: 0,
            purchases: Vec::new(),
            created_at: Some(Utc::now()),
        }
    }
}

// Profile captured from Telegram on /start
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NewUser {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
}

impl From<&teloxide::types::User> for NewUser {
    fn from(user: &teloxide::types::User) -> Self {
        Self {
            id: user.id.0 as i64,
            username: user.username.clone(),
            first_name: Some(user.first_name.clone()),
            last_name: user.last_name.clone(),
            language_code: user.language_code.clone(),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_supabase_row_with_nulls() {
        let row = r#"{
            "id": 123,
            "username": null,
            "first_name": "Max",
            "last_name": null,
            "language_code": "de",
            "status": null,
            "status_start": null,
            "status_end": null,
            "punkte": null,
            "produkte": null
        }"#;
        let user: User = serde_json::from_str(row).unwrap();
        assert_eq!(user.id, 123);
        assert_eq!(user.punkte, 0);
        assert!(user.purchases.is_empty());
        assert!(user.created_at.is_none());
    }

    #[test]
    fn test_active_status_respects_end_date() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut user = User::from(NewUser {
            id: 1,
            username: None,
            first_name: None,
            last_name: None,
            language_code: None,
        });
        assert!(!user.has_active_status(today));

        user.status = Some("VIP".to_string());
        assert!(user.has_active_status(today));

        user.status_end = NaiveDate::from_ymd_opt(2026, 10, 17);
        assert!(!user.has_active_status(today));

        user.status_end = Some(today);
        assert!(user.has_active_status(today));
    }
}
