use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Issued bearer token pair.
///
/// `access_token` (and `refresh_token` when present) are unique across the
/// store. Deletion is the only state transition; for the client credentials
/// grant `user_id` equals the client's id and `refresh_token` is absent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Token {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Uuid,
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub scopes: Vec<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Token {
    pub fn new(
        user_id: Uuid,
        client_id: Uuid,
        access_token: String,
        expires_at: DateTime<Utc>,
        scopes: Vec<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            client_id,
            access_token,
            token_type: "Bearer".to_string(),
            expires_at,
            scopes,
            refresh_token,
            created_at: Utc::now(),
        }
    }

    /// Strict expiry predicate: a token expiring exactly now is not yet
    /// expired here. Introspection applies the complementary
    /// `expires_at <= now` rule so the equal-instant case reports inactive.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_token(expires_at: DateTime<Utc>) -> Token {
        Token::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "access".to_string(),
            expires_at,
            vec!["read".to_string()],
            Some("refresh".to_string()),
        )
    }

    #[test]
    fn token_type_is_bearer() {
        let token = sample_token(Utc::now() + Duration::minutes(30));
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn future_expiry_is_not_expired() {
        let token = sample_token(Utc::now() + Duration::minutes(30));
        assert!(!token.is_expired());
    }

    #[test]
    fn past_expiry_is_expired() {
        let token = sample_token(Utc::now() - Duration::seconds(1));
        assert!(token.is_expired());
    }

    #[test]
    fn expiry_boundary_is_strict() {
        let now = Utc::now();
        let token = sample_token(now);

        // now == expires_at: the entity predicate says not expired yet.
        assert!(!token.is_expired_at(now));
        // One tick past the boundary flips it.
        assert!(token.is_expired_at(now + Duration::milliseconds(1)));
    }
}
