pub mod authorization_code;
pub mod client;
pub mod memory;
pub mod token;
pub mod user;

pub use authorization_code::PgAuthorizationCodeRepository;
pub use client::PgClientRepository;
pub use token::PgTokenRepository;
pub use user::PgUserRepository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{AuthorizationCode, Client, Token, User};

/// Storage failure surfaced by any repository implementation.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // 23505: Postgres unique_violation
            if db_err.code().as_deref() == Some("23505") {
                return RepositoryError::Conflict(db_err.message().to_string());
            }
        }
        RepositoryError::Database(err.to_string())
    }
}

/// Port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

/// Port for OAuth2 client persistence.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn create(&self, client: Client) -> Result<Client, RepositoryError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Client>, RepositoryError>;
    async fn update(&self, client: Client) -> Result<Client, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

/// Port for token persistence.
///
/// Lookups return `None` rather than an error when the token is absent.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn create(&self, token: Token) -> Result<Token, RepositoryError>;
    async fn get_by_access_token(&self, access_token: &str)
        -> Result<Option<Token>, RepositoryError>;
    async fn get_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Token>, RepositoryError>;

    /// Delete the token row. Returns `false` when the row was already
    /// gone, which lets refresh rotation detect a concurrent revocation.
    async fn revoke(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// Purge expired rows, returning how many were removed.
    async fn delete_expired(&self) -> Result<u64, RepositoryError>;
}

/// Port for authorization code persistence.
#[async_trait]
pub trait AuthorizationCodeRepository: Send + Sync {
    async fn create(&self, code: AuthorizationCode) -> Result<AuthorizationCode, RepositoryError>;
    async fn get_by_code(&self, code: &str) -> Result<Option<AuthorizationCode>, RepositoryError>;

    /// Flip `is_used` with an `is_used = false` guard. Returns `true` only
    /// for the caller that claimed the code, so concurrent redemptions of
    /// one code admit exactly one winner. Safe to call repeatedly.
    async fn mark_as_used(&self, id: Uuid) -> Result<bool, RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// Purge expired rows, returning how many were removed.
    async fn cleanup_expired(&self) -> Result<u64, RepositoryError>;
}
