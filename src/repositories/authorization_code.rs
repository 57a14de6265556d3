use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AuthorizationCodeRepository, RepositoryError};
use crate::models::AuthorizationCode;

/// Postgres-backed authorization code store.
#[derive(Clone)]
pub struct PgAuthorizationCodeRepository {
    pool: PgPool,
}

impl PgAuthorizationCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CODE_COLUMNS: &str = "id, code, client_id, user_id, redirect_uri, scopes, code_challenge, \
                            code_challenge_method, state, expires_at, is_used, created_at";

#[async_trait]
impl AuthorizationCodeRepository for PgAuthorizationCodeRepository {
    async fn create(&self, code: AuthorizationCode) -> Result<AuthorizationCode, RepositoryError> {
        let created = sqlx::query_as::<_, AuthorizationCode>(&format!(
            r#"
            INSERT INTO authorization_codes
            (id, code, client_id, user_id, redirect_uri, scopes, code_challenge,
             code_challenge_method, state, expires_at, is_used, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {CODE_COLUMNS}
            "#,
        ))
        .bind(code.id)
        .bind(&code.code)
        .bind(code.client_id)
        .bind(code.user_id)
        .bind(&code.redirect_uri)
        .bind(&code.scopes)
        .bind(&code.code_challenge)
        .bind(&code.code_challenge_method)
        .bind(&code.state)
        .bind(code.expires_at)
        .bind(code.is_used)
        .bind(code.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<AuthorizationCode>, RepositoryError> {
        let found = sqlx::query_as::<_, AuthorizationCode>(&format!(
            "SELECT {CODE_COLUMNS} FROM authorization_codes WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found)
    }

    async fn mark_as_used(&self, id: Uuid) -> Result<bool, RepositoryError> {
        // The is_used guard makes this a single-winner claim under
        // concurrent redemption of the same code.
        let result = sqlx::query(
            "UPDATE authorization_codes SET is_used = TRUE WHERE id = $1 AND is_used = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM authorization_codes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn cleanup_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM authorization_codes WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
