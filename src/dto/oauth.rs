//! Request/response DTOs for the OAuth2 endpoints (RFC 6749, RFC 7009,
//! RFC 7662). All token endpoints accept application/x-www-form-urlencoded.

use serde::{Deserialize, Serialize};

use crate::models::Token;

fn split_scope(scope: &Option<String>) -> Vec<String> {
    scope
        .as_ref()
        .map(|s| s.split_whitespace().map(String::from).collect())
        .unwrap_or_default()
}

/// GET /oauth2/authorize query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeParams {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

impl AuthorizeParams {
    pub fn scopes(&self) -> Vec<String> {
        split_scope(&self.scope)
    }
}

/// Consent payload returned to the front-end session layer, which renders
/// the consent screen and posts the decision back.
#[derive(Debug, Clone, Serialize)]
pub struct ConsentPayload {
    pub client_id: String,
    pub client_name: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

/// POST /oauth2/authorize/approve form fields.
///
/// `user_id` is the verified end-user identifier handed over by the
/// upstream session layer after authentication and consent.
#[derive(Debug, Clone, Deserialize)]
pub struct ApproveParams {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub user_id: String,
}

impl ApproveParams {
    pub fn scopes(&self) -> Vec<String> {
        self.scope.split_whitespace().map(String::from).collect()
    }
}

/// POST /oauth2/authorize/deny form fields.
#[derive(Debug, Clone, Deserialize)]
pub struct DenyParams {
    pub redirect_uri: String,
    pub state: Option<String>,
}

/// POST /oauth2/token form fields, shared across all grant types.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequestParams {
    pub grant_type: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub refresh_token: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub code_verifier: Option<String>,
    pub scope: Option<String>,
}

impl TokenRequestParams {
    pub fn scopes(&self) -> Vec<String> {
        split_scope(&self.scope)
    }
}

/// Successful POST /oauth2/token response.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        let scope = if token.scopes.is_empty() {
            None
        } else {
            Some(token.scopes.join(" "))
        };

        Self {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_in: (token.expires_at - token.created_at).num_seconds(),
            refresh_token: token.refresh_token,
            scope,
        }
    }
}

/// POST /oauth2/introspect form fields. Client credentials may also
/// arrive via HTTP Basic authentication.
#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectParams {
    pub token: String,
    pub token_type_hint: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// POST /oauth2/revoke form fields.
#[derive(Debug, Clone, Deserialize)]
pub struct RevokeParams {
    pub token: String,
    pub token_type_hint: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    #[test]
    fn scope_strings_split_on_whitespace() {
        let params = TokenRequestParams {
            grant_type: "password".to_string(),
            username: None,
            password: None,
            refresh_token: None,
            code: None,
            redirect_uri: None,
            client_id: None,
            client_secret: None,
            code_verifier: None,
            scope: Some("read  write".to_string()),
        };

        assert_eq!(params.scopes(), vec!["read".to_string(), "write".to_string()]);
    }

    #[test]
    fn token_response_derives_expires_in() {
        let mut token = Token::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "access".to_string(),
            chrono::Utc::now(),
            vec!["read".to_string()],
            Some("refresh".to_string()),
        );
        token.expires_at = token.created_at + Duration::seconds(1800);

        let response = TokenResponse::from(token);

        assert_eq!(response.expires_in, 1800);
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.scope.as_deref(), Some("read"));
    }

    #[test]
    fn empty_scope_list_serializes_as_absent() {
        let token = Token::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "access".to_string(),
            chrono::Utc::now(),
            vec![],
            None,
        );

        let response = TokenResponse::from(token);
        assert!(response.scope.is_none());
        assert!(response.refresh_token.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("scope").is_none());
        assert!(json.get("refresh_token").is_none());
    }
}
