use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Whether a token is usable as a bearer credential or only for refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// Claims carried by every token this service signs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: user id, or client id for client credentials tokens.
    pub sub: String,
    /// Client the token was issued to.
    pub client_id: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// Issuer string from configuration.
    pub iss: String,
    /// Expiration (Unix timestamp, seconds).
    pub exp: i64,
    /// Issued at (Unix timestamp, seconds).
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_use: TokenUse,
}

impl TokenClaims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Mints and verifies RS256-signed bearer tokens.
///
/// The private key never leaves this process; resource servers verify
/// statelessly with the public half.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    issuer: String,
    access_token_expiry_secs: i64,
    refresh_token_expiry_secs: i64,
}

impl JwtManager {
    pub fn new(
        private_key_pem: &str,
        public_key_pem: &str,
        issuer: &str,
        access_token_expiry_secs: i64,
        refresh_token_expiry_secs: i64,
    ) -> Result<Self, AuthError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| AuthError::InternalError(anyhow::anyhow!("Invalid private key: {}", e)))?;

        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| AuthError::InternalError(anyhow::anyhow!("Invalid public key: {}", e)))?;

        Ok(Self {
            encoding_key: Arc::new(encoding_key),
            decoding_key: Arc::new(decoding_key),
            issuer: issuer.to_string(),
            access_token_expiry_secs,
            refresh_token_expiry_secs,
        })
    }

    /// Mint an access token. Returns the token and its expiry instant;
    /// `expires_in` overrides the configured lifetime when given.
    pub fn create_access_token(
        &self,
        user_id: Uuid,
        client_id: Uuid,
        scopes: Vec<String>,
        expires_in: Option<i64>,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(expires_in.unwrap_or(self.access_token_expiry_secs));

        let claims = TokenClaims {
            sub: user_id.to_string(),
            client_id: client_id.to_string(),
            scopes,
            iss: self.issuer.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            token_use: TokenUse::Access,
        };

        let token = self.sign(&claims)?;
        Ok((token, expires_at))
    }

    /// Mint a refresh token over the same claim set with `type=refresh`.
    pub fn create_refresh_token(
        &self,
        user_id: Uuid,
        client_id: Uuid,
        scopes: Vec<String>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.refresh_token_expiry_secs);

        let claims = TokenClaims {
            sub: user_id.to_string(),
            client_id: client_id.to_string(),
            scopes,
            iss: self.issuer.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            token_use: TokenUse::Refresh,
        };

        self.sign(&claims)
    }

    /// Verify signature, issuer and expiry; returns the claim set.
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_aud = false;
        validation.leeway = 0;

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }

    /// Decode without the expiry check; signature and issuer are still
    /// enforced. Used for diagnostics on expired tokens.
    pub fn decode_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_aud = false;
        validation.validate_exp = false;

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        let header = Header::new(Algorithm::RS256);

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(anyhow::anyhow!("Token encoding failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_manager() -> JwtManager {
        JwtManager::new(
            Config::default_private_key(),
            Config::default_public_key(),
            "identity-service",
            1800,
            2_592_000,
        )
        .unwrap()
    }

    #[test]
    fn access_token_round_trips_all_claims() {
        let manager = test_manager();
        let user_id = Uuid::new_v4();
        let client_id = Uuid::new_v4();
        let scopes = vec!["read".to_string(), "write".to_string()];

        let (token, expires_at) = manager
            .create_access_token(user_id, client_id, scopes.clone(), None)
            .unwrap();
        let claims = manager.verify_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.client_id, client_id.to_string());
        assert_eq!(claims.scopes, scopes);
        assert_eq!(claims.iss, "identity-service");
        assert_eq!(claims.token_use, TokenUse::Access);
        assert_eq!(claims.exp, expires_at.timestamp());
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn refresh_token_carries_refresh_type() {
        let manager = test_manager();
        let user_id = Uuid::new_v4();
        let client_id = Uuid::new_v4();

        let token = manager
            .create_refresh_token(user_id, client_id, vec!["read".to_string()])
            .unwrap();
        let claims = manager.verify_token(&token).unwrap();

        assert_eq!(claims.token_use, TokenUse::Refresh);
        assert_eq!(claims.exp - claims.iat, 2_592_000);
    }

    #[test]
    fn explicit_expiry_overrides_default() {
        let manager = test_manager();

        let (token, _) = manager
            .create_access_token(Uuid::new_v4(), Uuid::new_v4(), vec![], Some(60))
            .unwrap();
        let claims = manager.verify_token(&token).unwrap();

        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = test_manager();

        let (token, _) = manager
            .create_access_token(Uuid::new_v4(), Uuid::new_v4(), vec![], Some(-10))
            .unwrap();

        assert!(matches!(
            manager.verify_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn decode_skips_expiry_but_keeps_signature() {
        let manager = test_manager();
        let user_id = Uuid::new_v4();

        let (token, _) = manager
            .create_access_token(user_id, Uuid::new_v4(), vec!["read".to_string()], Some(-10))
            .unwrap();

        let claims = manager.decode_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());

        assert!(manager.decode_token("not-a-jwt").is_err());
    }

    #[test]
    fn single_byte_tampering_is_detected() {
        let manager = test_manager();

        let (token, _) = manager
            .create_access_token(Uuid::new_v4(), Uuid::new_v4(), vec!["read".to_string()], None)
            .unwrap();

        // Flip one character in the payload segment.
        let mut bytes = token.into_bytes();
        let payload_start = bytes.iter().position(|&b| b == b'.').unwrap() + 1;
        bytes[payload_start] = if bytes[payload_start] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(matches!(
            manager.verify_token(&tampered),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn issuer_mismatch_is_rejected() {
        let manager = test_manager();
        let other_issuer = JwtManager::new(
            Config::default_private_key(),
            Config::default_public_key(),
            "someone-else",
            1800,
            2_592_000,
        )
        .unwrap();

        let (token, _) = other_issuer
            .create_access_token(Uuid::new_v4(), Uuid::new_v4(), vec![], None)
            .unwrap();

        assert!(matches!(
            manager.verify_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let manager = test_manager();

        assert!(matches!(
            manager.verify_token("invalid.token.here"),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            manager.verify_token("not-a-jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn token_header_uses_rs256() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

        let manager = test_manager();
        let (token, _) = manager
            .create_access_token(Uuid::new_v4(), Uuid::new_v4(), vec![], None)
            .unwrap();

        let header_segment = token.split('.').next().unwrap();
        let header_json = URL_SAFE_NO_PAD.decode(header_segment).unwrap();
        let header: serde_json::Value = serde_json::from_slice(&header_json).unwrap();

        assert_eq!(header["alg"], "RS256");
    }
}
