use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// End user able to authorize clients on their behalf.
///
/// `username` and `email` are globally unique; an inactive user cannot
/// authenticate through any grant flow.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, hashed_password: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            hashed_password,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.updated_at = Utc::now();
    }

    pub fn update_password(&mut self, new_hashed_password: String) {
        self.hashed_password = new_hashed_password;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_active() {
        let user = User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "$2b$12$hash".to_string(),
        );

        assert!(user.is_active);
        assert_eq!(user.username, "alice");
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn deactivate_and_activate_toggle_state() {
        let mut user = User::new(
            "bob".to_string(),
            "bob@example.com".to_string(),
            "hash".to_string(),
        );

        user.deactivate();
        assert!(!user.is_active);
        assert!(user.updated_at >= user.created_at);

        user.activate();
        assert!(user.is_active);
    }

    #[test]
    fn update_password_replaces_hash() {
        let mut user = User::new(
            "carol".to_string(),
            "carol@example.com".to_string(),
            "old".to_string(),
        );

        user.update_password("new".to_string());
        assert_eq!(user.hashed_password, "new");
    }
}
