use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ClientRepository, RepositoryError};
use crate::models::Client;

/// Postgres-backed client store.
#[derive(Clone)]
pub struct PgClientRepository {
    pool: PgPool,
}

impl PgClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CLIENT_COLUMNS: &str = "id, client_name, client_secret_hash, redirect_uris, grant_types, \
                              scopes, is_confidential, is_active, created_at, updated_at";

#[async_trait]
impl ClientRepository for PgClientRepository {
    async fn create(&self, client: Client) -> Result<Client, RepositoryError> {
        let created = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients
            (id, client_name, client_secret_hash, redirect_uris, grant_types, scopes,
             is_confidential, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {CLIENT_COLUMNS}
            "#,
        ))
        .bind(client.id)
        .bind(&client.client_name)
        .bind(&client.client_secret_hash)
        .bind(&client.redirect_uris)
        .bind(&client.grant_types)
        .bind(&client.scopes)
        .bind(client.is_confidential)
        .bind(client.is_active)
        .bind(client.created_at)
        .bind(client.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Client>, RepositoryError> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    async fn update(&self, client: Client) -> Result<Client, RepositoryError> {
        let updated = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET client_name = $2, client_secret_hash = $3, redirect_uris = $4,
                grant_types = $5, scopes = $6, is_confidential = $7, is_active = $8,
                updated_at = $9
            WHERE id = $1
            RETURNING {CLIENT_COLUMNS}
            "#,
        ))
        .bind(client.id)
        .bind(&client.client_name)
        .bind(&client.client_secret_hash)
        .bind(&client.redirect_uris)
        .bind(&client.grant_types)
        .bind(&client.scopes)
        .bind(client.is_confidential)
        .bind(client.is_active)
        .bind(client.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::Database(format!("client {} not found", client.id)))?;

        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
