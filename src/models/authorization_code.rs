use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Maximum authorization code lifetime in seconds.
pub const AUTHORIZATION_CODE_TTL_SECS: i64 = 600;

/// One-time authorization code delivered to the client via redirect.
///
/// Once `is_used` is set or `expires_at` has passed the code can never
/// yield a token again; redemption deletes the row as the permanent
/// invalidator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuthorizationCode {
    pub id: Uuid,
    pub code: String,
    pub client_id: Uuid,
    pub user_id: Uuid,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub state: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

impl AuthorizationCode {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        code: String,
        client_id: Uuid,
        user_id: Uuid,
        redirect_uri: String,
        scopes: Vec<String>,
        code_challenge: Option<String>,
        code_challenge_method: Option<String>,
        state: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            client_id,
            user_id,
            redirect_uri,
            scopes,
            code_challenge,
            code_challenge_method,
            state,
            expires_at: now + Duration::seconds(AUTHORIZATION_CODE_TTL_SECS),
            is_used: false,
            created_at: now,
        }
    }

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

    fn sample_code(now: DateTime<Utc>) -> AuthorizationCode {
        AuthorizationCode::new(
            "opaque-code".to_string(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "https://app.example.com/callback".to_string(),
            vec!["read".to_string()],
            None,
            None,
            None,
            now,
        )
    }

    #[test]
    fn code_expires_ten_minutes_after_creation() {
        let now = Utc::now();
        let code = sample_code(now);

        assert_eq!(code.expires_at - now, Duration::seconds(600));
        assert!(!code.is_used);
    }

    #[test]
    fn within_lifetime_is_not_expired() {
        let now = Utc::now();
        let code = sample_code(now);

        assert!(!code.is_expired_at(now + Duration::minutes(9)));
    }

    #[test]
    fn past_lifetime_is_expired() {
        let now = Utc::now();
        let code = sample_code(now);

        assert!(code.is_expired_at(now + Duration::minutes(11)));
    }

    #[test]
    fn expiry_boundary_is_strict() {
        let now = Utc::now();
        let code = sample_code(now);

        assert!(!code.is_expired_at(code.expires_at));
        assert!(code.is_expired_at(code.expires_at + Duration::milliseconds(1)));
    }
}
