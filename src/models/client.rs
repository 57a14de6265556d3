use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Grant types a client may be allowed to use.
pub const GRANT_TYPE_PASSWORD: &str = "password";
pub const GRANT_TYPE_REFRESH_TOKEN: &str = "refresh_token";
pub const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";

/// Registered OAuth2 client application.
///
/// A client carries at least one redirect URI and one grant type. Only
/// confidential clients may use the `password` or `client_credentials`
/// grants; an inactive client cannot authenticate.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: Uuid,
    pub client_name: String,
    #[serde(skip_serializing)]
    pub client_secret_hash: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub scopes: Vec<String>,
    pub is_confidential: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(
        client_name: String,
        client_secret_hash: String,
        redirect_uris: Vec<String>,
        grant_types: Vec<String>,
        scopes: Vec<String>,
        is_confidential: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_name,
            client_secret_hash,
            redirect_uris,
            grant_types,
            scopes,
            is_confidential,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Exact-match check against the registered redirect URIs. No prefix
    /// or pattern matching.
    pub fn has_redirect_uri(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.iter().any(|uri| uri == redirect_uri)
    }

    pub fn allows_grant_type(&self, grant_type: &str) -> bool {
        self.grant_types.iter().any(|g| g == grant_type)
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_client() -> Client {
        Client::new(
            "Test Client".to_string(),
            "$2b$12$hash".to_string(),
            vec!["https://app.example.com/callback".to_string()],
            vec![
                GRANT_TYPE_PASSWORD.to_string(),
                GRANT_TYPE_REFRESH_TOKEN.to_string(),
            ],
            vec!["read".to_string(), "write".to_string()],
            true,
        )
    }

    #[test]
    fn redirect_uri_requires_exact_match() {
        let client = sample_client();

        assert!(client.has_redirect_uri("https://app.example.com/callback"));
        assert!(!client.has_redirect_uri("https://app.example.com/callback/"));
        assert!(!client.has_redirect_uri("https://app.example.com"));
        assert!(!client.has_redirect_uri("https://evil.example.com/callback"));
    }

    #[test]
    fn grant_type_membership() {
        let client = sample_client();

        assert!(client.allows_grant_type(GRANT_TYPE_PASSWORD));
        assert!(client.allows_grant_type(GRANT_TYPE_REFRESH_TOKEN));
        assert!(!client.allows_grant_type(GRANT_TYPE_AUTHORIZATION_CODE));
        assert!(!client.allows_grant_type(GRANT_TYPE_CLIENT_CREDENTIALS));
    }

    #[test]
    fn deactivate_marks_inactive() {
        let mut client = sample_client();
        client.deactivate();
        assert!(!client.is_active);
    }
}
