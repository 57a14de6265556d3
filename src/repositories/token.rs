use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{RepositoryError, TokenRepository};
use crate::models::Token;

/// Postgres-backed token store.
#[derive(Clone)]
pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const TOKEN_COLUMNS: &str = "id, user_id, client_id, access_token, token_type, expires_at, \
                             scopes, refresh_token, created_at";

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn create(&self, token: Token) -> Result<Token, RepositoryError> {
        let created = sqlx::query_as::<_, Token>(&format!(
            r#"
            INSERT INTO tokens
            (id, user_id, client_id, access_token, token_type, expires_at, scopes,
             refresh_token, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {TOKEN_COLUMNS}
            "#,
        ))
        .bind(token.id)
        .bind(token.user_id)
        .bind(token.client_id)
        .bind(&token.access_token)
        .bind(&token.token_type)
        .bind(token.expires_at)
        .bind(&token.scopes)
        .bind(&token.refresh_token)
        .bind(token.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<Token>, RepositoryError> {
        let token = sqlx::query_as::<_, Token>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE access_token = $1"
        ))
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn get_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Token>, RepositoryError> {
        let token = sqlx::query_as::<_, Token>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE refresh_token = $1"
        ))
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn revoke(&self, id: Uuid) -> Result<bool, RepositoryError> {
        // Conditional delete: exactly one concurrent caller observes a
        // removed row, which serializes refresh-token rotation.
        let result = sqlx::query("DELETE FROM tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM tokens WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
