//! OAuth2 grant engine.
//!
//! Implements the four RFC 6749 grant flows (password, refresh_token,
//! authorization_code with PKCE, client_credentials), token introspection
//! per RFC 7662 with cache acceleration, and revocation per RFC 7009.
//!
//! Every operation returns either a success value or an [`OAuthError`]
//! from the closed protocol taxonomy; the handlers map those to HTTP.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::cache::Cache;
use crate::error::OAuthError;
use crate::models::{
    AuthorizationCode, Client, Token, GRANT_TYPE_AUTHORIZATION_CODE, GRANT_TYPE_CLIENT_CREDENTIALS,
    GRANT_TYPE_PASSWORD, GRANT_TYPE_REFRESH_TOKEN,
};
use crate::repositories::{AuthorizationCodeRepository, TokenRepository};
use crate::services::{ClientService, UserService};
use crate::utils::clock::Clock;
use crate::utils::jwt::{JwtManager, TokenUse};
use crate::utils::pkce::{is_valid_code_verifier, verify_challenge, CodeChallengeMethod};
use crate::utils::secret::generate_authorization_code;

/// Cache key prefix for introspection results.
const INTROSPECT_CACHE_PREFIX: &str = "token:introspect:";

/// RFC 7662 introspection response.
///
/// Only `active` is always present; the metadata fields are filled in for
/// active tokens.
#[derive(Debug, Clone, Serialize)]
pub struct TokenIntrospection {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

impl TokenIntrospection {
    pub fn inactive() -> Self {
        Self {
            active: false,
            scope: None,
            client_id: None,
            username: None,
            token_type: None,
            exp: None,
            iat: None,
            sub: None,
        }
    }

    fn active_unverified() -> Self {
        Self {
            active: true,
            ..Self::inactive()
        }
    }
}

/// Outcome of validating a `GET /oauth2/authorize` request: the resolved
/// client plus the effective scope set.
#[derive(Debug, Clone)]
pub struct AuthorizationRequestContext {
    pub client: Client,
    pub scopes: Vec<String>,
}

/// OAuth2 grant engine. Sole writer and verification-time reader of
/// tokens and authorization codes.
#[derive(Clone)]
pub struct OAuthService {
    users: UserService,
    clients: ClientService,
    tokens: Arc<dyn TokenRepository>,
    codes: Arc<dyn AuthorizationCodeRepository>,
    cache: Arc<dyn Cache>,
    jwt: JwtManager,
    clock: Arc<dyn Clock>,
}

impl OAuthService {
    pub fn new(
        users: UserService,
        clients: ClientService,
        tokens: Arc<dyn TokenRepository>,
        codes: Arc<dyn AuthorizationCodeRepository>,
        cache: Arc<dyn Cache>,
        jwt: JwtManager,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            clients,
            tokens,
            codes,
            cache,
            jwt,
            clock,
        }
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn clients(&self) -> &ClientService {
        &self.clients
    }

    // ------------------------------------------------------------------
    // Password grant (RFC 6749 §4.3)
    // ------------------------------------------------------------------

    pub async fn password_grant(
        &self,
        username: &str,
        password: &str,
        client_id: Uuid,
        client_secret: &str,
        requested_scopes: &[String],
    ) -> Result<Token, OAuthError> {
        let client = self
            .clients
            .authenticate_client(client_id, Some(client_secret))
            .await
            .map_err(internal)?
            .ok_or(OAuthError::InvalidClient)?;

        if !client.is_confidential || !client.allows_grant_type(GRANT_TYPE_PASSWORD) {
            return Err(OAuthError::UnauthorizedClient);
        }

        let user = self
            .users
            .authenticate_user(username, password)
            .await
            .map_err(internal)?
            .ok_or_else(|| OAuthError::InvalidGrant("Invalid user credentials".to_string()))?;

        let scopes = resolve_scopes(&client, requested_scopes)?;

        self.issue_token_pair(user.id, client.id, scopes).await
    }

    // ------------------------------------------------------------------
    // Refresh token grant (RFC 6749 §6), single-use rotation
    // ------------------------------------------------------------------

    pub async fn refresh_token_grant(
        &self,
        refresh_token: &str,
        client_id: Uuid,
        client_secret: Option<&str>,
    ) -> Result<Token, OAuthError> {
        let client = self
            .clients
            .authenticate_client(client_id, client_secret)
            .await
            .map_err(internal)?
            .ok_or(OAuthError::InvalidClient)?;

        if !client.allows_grant_type(GRANT_TYPE_REFRESH_TOKEN) {
            return Err(OAuthError::UnauthorizedClient);
        }

        let claims = self
            .jwt
            .verify_token(refresh_token)
            .map_err(|_| OAuthError::InvalidGrant("Invalid refresh token".to_string()))?;

        if claims.token_use != TokenUse::Refresh {
            return Err(OAuthError::InvalidGrant(
                "Token is not a refresh token".to_string(),
            ));
        }

        // The token must still be present in bound storage so revocation
        // and rotation stay effective.
        let existing = self
            .tokens
            .get_by_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| OAuthError::InvalidGrant("Refresh token is not recognized".to_string()))?;

        if existing.client_id != client.id {
            return Err(OAuthError::InvalidGrant(
                "Refresh token was not issued to this client".to_string(),
            ));
        }

        let user_id = claims
            .user_id()
            .ok_or_else(|| OAuthError::InvalidGrant("Malformed refresh token subject".to_string()))?;

        // Single-use rotation: delete the old row before minting. The
        // conditional delete admits exactly one concurrent caller.
        if !self.tokens.revoke(existing.id).await? {
            return Err(OAuthError::InvalidGrant(
                "Refresh token has already been used".to_string(),
            ));
        }

        self.issue_token_pair(user_id, client.id, claims.scopes).await
    }

    // ------------------------------------------------------------------
    // Authorization code flow (RFC 6749 §4.1, PKCE per RFC 7636)
    // ------------------------------------------------------------------

    /// Validate the authorization request before the consent step.
    pub async fn validate_authorization_request(
        &self,
        response_type: &str,
        client_id: Uuid,
        redirect_uri: &str,
        requested_scopes: &[String],
        code_challenge: Option<&str>,
        code_challenge_method: Option<&str>,
    ) -> Result<AuthorizationRequestContext, OAuthError> {
        if response_type != "code" {
            return Err(OAuthError::UnsupportedResponseType);
        }

        let client = self
            .clients
            .get_client(client_id)
            .await
            .map_err(|e| OAuthError::ServerError(e.to_string()))?
            .filter(|c| c.is_active)
            .ok_or(OAuthError::InvalidClient)?;

        if !client.has_redirect_uri(redirect_uri) {
            return Err(OAuthError::InvalidRequest(
                "redirect_uri is not registered for this client".to_string(),
            ));
        }

        if !client.allows_grant_type(GRANT_TYPE_AUTHORIZATION_CODE) {
            return Err(OAuthError::InvalidClient);
        }

        if code_challenge.is_some() && CodeChallengeMethod::from_param(code_challenge_method).is_none()
        {
            return Err(OAuthError::InvalidRequest(
                "code_challenge_method must be 'S256' or 'plain'".to_string(),
            ));
        }

        let scopes = resolve_scopes(&client, requested_scopes)?;

        Ok(AuthorizationRequestContext { client, scopes })
    }

    /// Issue an authorization code after user consent. The caller has
    /// already validated client, redirect URI and scopes.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_authorization_code(
        &self,
        client_id: Uuid,
        user_id: Uuid,
        redirect_uri: &str,
        scopes: Vec<String>,
        state: Option<String>,
        code_challenge: Option<String>,
        code_challenge_method: Option<String>,
    ) -> Result<AuthorizationCode, OAuthError> {
        let method = code_challenge
            .as_ref()
            .map(|_| {
                CodeChallengeMethod::from_param(code_challenge_method.as_deref())
                    .ok_or_else(|| {
                        OAuthError::InvalidRequest(
                            "code_challenge_method must be 'S256' or 'plain'".to_string(),
                        )
                    })
                    .map(|m| m.as_str().to_string())
            })
            .transpose()?;

        let code = AuthorizationCode::new(
            generate_authorization_code(),
            client_id,
            user_id,
            redirect_uri.to_string(),
            scopes,
            code_challenge,
            method,
            state,
            self.clock.now(),
        );

        Ok(self.codes.create(code).await?)
    }

    /// Redeem an authorization code for a token pair.
    pub async fn authorization_code_grant(
        &self,
        code: &str,
        client_id: Uuid,
        client_secret: Option<&str>,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<Token, OAuthError> {
        let client = self
            .clients
            .authenticate_client(client_id, client_secret)
            .await
            .map_err(internal)?
            .ok_or(OAuthError::InvalidClient)?;

        if !client.allows_grant_type(GRANT_TYPE_AUTHORIZATION_CODE) {
            return Err(OAuthError::UnauthorizedClient);
        }

        let auth_code = self
            .codes
            .get_by_code(code)
            .await?
            .ok_or_else(|| OAuthError::InvalidGrant("Invalid authorization code".to_string()))?;

        // Expired or replayed codes are removed on sight so a stolen code
        // cannot be retried indefinitely.
        if auth_code.is_used || auth_code.is_expired_at(self.clock.now()) {
            self.codes.delete(auth_code.id).await?;
            return Err(OAuthError::InvalidGrant(
                "Authorization code is expired or already used".to_string(),
            ));
        }

        if auth_code.client_id != client.id {
            return Err(OAuthError::InvalidGrant(
                "Authorization code was not issued to this client".to_string(),
            ));
        }

        if auth_code.redirect_uri != redirect_uri {
            return Err(OAuthError::InvalidGrant(
                "redirect_uri does not match the authorization request".to_string(),
            ));
        }

        if let Some(challenge) = &auth_code.code_challenge {
            let verifier = code_verifier.ok_or_else(|| {
                OAuthError::InvalidGrant("code_verifier is required".to_string())
            })?;

            if !is_valid_code_verifier(verifier) {
                return Err(OAuthError::InvalidGrant(
                    "Malformed code_verifier".to_string(),
                ));
            }

            let method = CodeChallengeMethod::from_param(auth_code.code_challenge_method.as_deref())
                .ok_or_else(|| {
                    OAuthError::InvalidGrant("Unsupported code_challenge_method".to_string())
                })?;

            if !verify_challenge(verifier, challenge, method) {
                return Err(OAuthError::InvalidGrant(
                    "code_verifier does not match code_challenge".to_string(),
                ));
            }
        }

        // Claim the code; exactly one concurrent redemption wins. The
        // delete afterwards is the permanent invalidator.
        if !self.codes.mark_as_used(auth_code.id).await? {
            self.codes.delete(auth_code.id).await?;
            return Err(OAuthError::InvalidGrant(
                "Authorization code is expired or already used".to_string(),
            ));
        }
        self.codes.delete(auth_code.id).await?;

        self.issue_token_pair(auth_code.user_id, client.id, auth_code.scopes)
            .await
    }

    // ------------------------------------------------------------------
    // Client credentials grant (RFC 6749 §4.4)
    // ------------------------------------------------------------------

    pub async fn client_credentials_grant(
        &self,
        client_id: Uuid,
        client_secret: &str,
        requested_scopes: &[String],
    ) -> Result<Token, OAuthError> {
        let client = self
            .clients
            .authenticate_client(client_id, Some(client_secret))
            .await
            .map_err(internal)?
            .ok_or(OAuthError::InvalidClient)?;

        if !client.is_confidential || !client.allows_grant_type(GRANT_TYPE_CLIENT_CREDENTIALS) {
            return Err(OAuthError::UnauthorizedClient);
        }

        let scopes = resolve_scopes(&client, requested_scopes)?;

        // Self-owned token: the subject is the client itself and no
        // refresh token is issued.
        let (access_token, expires_at) = self
            .jwt
            .create_access_token(client.id, client.id, scopes.clone(), None)
            .map_err(internal)?;

        let token = Token::new(client.id, client.id, access_token, expires_at, scopes, None);
        Ok(self.tokens.create(token).await?)
    }

    // ------------------------------------------------------------------
    // Introspection (RFC 7662)
    // ------------------------------------------------------------------

    pub async fn introspect_token(&self, token: &str) -> Result<TokenIntrospection, OAuthError> {
        let cache_key = format!("{INTROSPECT_CACHE_PREFIX}{token}");

        // Cached entries exist only for currently valid tokens, so a hit
        // implies active without re-verification.
        if self.cache.get(&cache_key).await.is_some() {
            return Ok(TokenIntrospection::active_unverified());
        }

        let Ok(claims) = self.jwt.verify_token(token) else {
            return Ok(TokenIntrospection::inactive());
        };

        let Some(entity) = self.tokens.get_by_access_token(token).await? else {
            return Ok(TokenIntrospection::inactive());
        };

        let now = self.clock.now();
        if entity.expires_at <= now {
            return Ok(TokenIntrospection::inactive());
        }

        // The cache entry never outlives the token itself.
        let ttl = (entity.expires_at - now).num_seconds();
        if ttl > 0 {
            self.cache.set(&cache_key, "1", ttl as u64).await;
        }

        Ok(TokenIntrospection {
            active: true,
            scope: Some(claims.scopes.join(" ")),
            client_id: Some(claims.client_id.clone()),
            username: Some(claims.sub.clone()),
            token_type: Some("Bearer".to_string()),
            exp: Some(claims.exp),
            iat: Some(claims.iat),
            sub: Some(claims.sub),
        })
    }

    // ------------------------------------------------------------------
    // Revocation (RFC 7009)
    // ------------------------------------------------------------------

    /// Revoke a token presented as either its access or refresh form.
    /// Unknown tokens are a success per RFC 7009 §2.2.
    pub async fn revoke_token(
        &self,
        token: &str,
        token_type_hint: Option<&str>,
    ) -> Result<(), OAuthError> {
        let entity = match token_type_hint {
            Some("refresh_token") => match self.tokens.get_by_refresh_token(token).await? {
                Some(found) => Some(found),
                None => self.tokens.get_by_access_token(token).await?,
            },
            _ => match self.tokens.get_by_access_token(token).await? {
                Some(found) => Some(found),
                None => self.tokens.get_by_refresh_token(token).await?,
            },
        };

        let Some(entity) = entity else {
            return Ok(());
        };

        // Order matters: the row goes first, the cache entry second. A
        // crash in between leaves a stale cache entry bounded by its TTL.
        self.tokens.revoke(entity.id).await?;
        self.cache
            .delete(&format!("{INTROSPECT_CACHE_PREFIX}{}", entity.access_token))
            .await;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Purge expired authorization codes and tokens. Returns
    /// (codes_removed, tokens_removed).
    pub async fn cleanup_expired(&self) -> Result<(u64, u64), OAuthError> {
        let codes = self.codes.cleanup_expired().await?;
        let tokens = self.tokens.delete_expired().await?;
        Ok((codes, tokens))
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn issue_token_pair(
        &self,
        user_id: Uuid,
        client_id: Uuid,
        scopes: Vec<String>,
    ) -> Result<Token, OAuthError> {
        let (access_token, expires_at) = self
            .jwt
            .create_access_token(user_id, client_id, scopes.clone(), None)
            .map_err(internal)?;

        let refresh_token = self
            .jwt
            .create_refresh_token(user_id, client_id, scopes.clone())
            .map_err(internal)?;

        let token = Token::new(
            user_id,
            client_id,
            access_token,
            expires_at,
            scopes,
            Some(refresh_token),
        );

        Ok(self.tokens.create(token).await?)
    }
}

/// Narrow the requested scopes against the client's allowed set. An empty
/// request falls back to the client defaults; any scope outside the
/// allowed set rejects the whole request.
fn resolve_scopes(client: &Client, requested: &[String]) -> Result<Vec<String>, OAuthError> {
    if requested.is_empty() {
        return Ok(client.scopes.clone());
    }

    if let Some(disallowed) = requested.iter().find(|s| !client.scopes.contains(s)) {
        return Err(OAuthError::InvalidScope(format!(
            "Scope '{}' is not allowed for this client",
            disallowed
        )));
    }

    Ok(requested.to_vec())
}

fn internal(err: crate::error::AuthError) -> OAuthError {
    OAuthError::ServerError(err.to_string())
}
