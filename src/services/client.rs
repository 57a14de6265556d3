use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AdminError, AuthError};
use crate::models::{
    Client, GRANT_TYPE_AUTHORIZATION_CODE, GRANT_TYPE_CLIENT_CREDENTIALS, GRANT_TYPE_PASSWORD,
    GRANT_TYPE_REFRESH_TOKEN,
};
use crate::repositories::ClientRepository;
use crate::utils::password::{hash_secret, verify_secret};
use crate::utils::secret::generate_client_secret;

const KNOWN_GRANT_TYPES: [&str; 4] = [
    GRANT_TYPE_PASSWORD,
    GRANT_TYPE_REFRESH_TOKEN,
    GRANT_TYPE_AUTHORIZATION_CODE,
    GRANT_TYPE_CLIENT_CREDENTIALS,
];

/// Client lifecycle and authentication.
#[derive(Clone)]
pub struct ClientService {
    repo: Arc<dyn ClientRepository>,
}

impl ClientService {
    pub fn new(repo: Arc<dyn ClientRepository>) -> Self {
        Self { repo }
    }

    /// Register a client. Returns the stored client and the plain secret,
    /// which is shown to the caller exactly once.
    pub async fn create_client(
        &self,
        client_name: &str,
        redirect_uris: Vec<String>,
        grant_types: Vec<String>,
        scopes: Vec<String>,
        is_confidential: bool,
    ) -> Result<(Client, String), AdminError> {
        if client_name.is_empty() {
            return Err(AdminError::Validation(
                "client_name must not be empty".to_string(),
            ));
        }

        if redirect_uris.is_empty() {
            return Err(AdminError::Validation(
                "at least one redirect_uri is required".to_string(),
            ));
        }

        if grant_types.is_empty() {
            return Err(AdminError::Validation(
                "at least one grant_type is required".to_string(),
            ));
        }

        for grant_type in &grant_types {
            if !KNOWN_GRANT_TYPES.contains(&grant_type.as_str()) {
                return Err(AdminError::Validation(format!(
                    "unknown grant_type '{}'",
                    grant_type
                )));
            }
        }

        // Password and client_credentials require a client able to keep
        // its secret confidential.
        if !is_confidential {
            for restricted in [GRANT_TYPE_PASSWORD, GRANT_TYPE_CLIENT_CREDENTIALS] {
                if grant_types.iter().any(|g| g == restricted) {
                    return Err(AdminError::Validation(format!(
                        "grant_type '{}' requires a confidential client",
                        restricted
                    )));
                }
            }
        }

        let plain_secret = generate_client_secret();
        let secret_hash = {
            let secret = plain_secret.clone();
            tokio::task::spawn_blocking(move || hash_secret(&secret))
                .await
                .map_err(|e| AdminError::InternalError(anyhow::anyhow!("hash task failed: {e}")))?
                .map_err(|e| AdminError::InternalError(anyhow::anyhow!(e)))?
        };

        let client = Client::new(
            client_name.to_string(),
            secret_hash,
            redirect_uris,
            grant_types,
            scopes,
            is_confidential,
        );

        let created = self.repo.create(client).await?;
        Ok((created, plain_secret))
    }

    /// Authenticate a client. Confidential clients must present their
    /// secret; public clients may omit it, but a presented secret is still
    /// verified. Returns `None` for unknown, inactive, or mismatched
    /// credentials.
    pub async fn authenticate_client(
        &self,
        client_id: Uuid,
        client_secret: Option<&str>,
    ) -> Result<Option<Client>, AuthError> {
        let Some(client) = self.repo.get_by_id(client_id).await? else {
            return Ok(None);
        };

        if !client.is_active {
            return Ok(None);
        }

        let secret = match client_secret {
            Some(secret) => secret,
            None if !client.is_confidential => return Ok(Some(client)),
            None => return Ok(None),
        };

        let verified = {
            let secret = secret.to_string();
            let hash = client.client_secret_hash.clone();
            tokio::task::spawn_blocking(move || verify_secret(&secret, &hash))
                .await
                .map_err(|e| AuthError::InternalError(anyhow::anyhow!("hash task failed: {e}")))??
        };

        if !verified {
            return Ok(None);
        }

        Ok(Some(client))
    }

    pub async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AdminError> {
        Ok(self.repo.get_by_id(client_id).await?)
    }

    pub async fn deactivate_client(&self, client_id: Uuid) -> Result<Client, AdminError> {
        let mut client = self
            .repo
            .get_by_id(client_id)
            .await?
            .ok_or(AdminError::NotFound("client"))?;

        client.deactivate();
        Ok(self.repo.update(client).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::InMemoryClientRepository;

    fn service() -> ClientService {
        ClientService::new(Arc::new(InMemoryClientRepository::new()))
    }

    #[tokio::test]
    async fn create_and_authenticate_client() {
        let service = service();

        let (client, secret) = service
            .create_client(
                "Test Client",
                vec!["https://app.example.com/callback".to_string()],
                vec![GRANT_TYPE_PASSWORD.to_string()],
                vec!["read".to_string()],
                true,
            )
            .await
            .unwrap();

        let authenticated = service
            .authenticate_client(client.id, Some(&secret))
            .await
            .unwrap();
        assert_eq!(authenticated.unwrap().id, client.id);
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let service = service();
        let (client, _) = service
            .create_client(
                "Test Client",
                vec!["https://app.example.com/callback".to_string()],
                vec![GRANT_TYPE_PASSWORD.to_string()],
                vec![],
                true,
            )
            .await
            .unwrap();

        let result = service
            .authenticate_client(client.id, Some("wrong-secret"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn confidential_client_requires_secret() {
        let service = service();
        let (client, _) = service
            .create_client(
                "Test Client",
                vec!["https://app.example.com/callback".to_string()],
                vec![GRANT_TYPE_AUTHORIZATION_CODE.to_string()],
                vec![],
                true,
            )
            .await
            .unwrap();

        let result = service.authenticate_client(client.id, None).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn public_client_may_omit_secret() {
        let service = service();
        let (client, secret) = service
            .create_client(
                "SPA Client",
                vec!["https://spa.example.com/callback".to_string()],
                vec![GRANT_TYPE_AUTHORIZATION_CODE.to_string()],
                vec![],
                false,
            )
            .await
            .unwrap();

        // No secret: accepted.
        assert!(service
            .authenticate_client(client.id, None)
            .await
            .unwrap()
            .is_some());
        // A presented secret is still verified.
        assert!(service
            .authenticate_client(client.id, Some(&secret))
            .await
            .unwrap()
            .is_some());
        assert!(service
            .authenticate_client(client.id, Some("wrong"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn inactive_client_cannot_authenticate() {
        let service = service();
        let (client, secret) = service
            .create_client(
                "Test Client",
                vec!["https://app.example.com/callback".to_string()],
                vec![GRANT_TYPE_PASSWORD.to_string()],
                vec![],
                true,
            )
            .await
            .unwrap();

        service.deactivate_client(client.id).await.unwrap();

        let result = service
            .authenticate_client(client.id, Some(&secret))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn public_clients_cannot_hold_restricted_grants() {
        let service = service();

        for restricted in [GRANT_TYPE_PASSWORD, GRANT_TYPE_CLIENT_CREDENTIALS] {
            let result = service
                .create_client(
                    "SPA Client",
                    vec!["https://spa.example.com/callback".to_string()],
                    vec![restricted.to_string()],
                    vec![],
                    false,
                )
                .await;
            assert!(matches!(result, Err(AdminError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn structural_validation_applies() {
        let service = service();

        let no_redirects = service
            .create_client("C", vec![], vec![GRANT_TYPE_PASSWORD.to_string()], vec![], true)
            .await;
        assert!(matches!(no_redirects, Err(AdminError::Validation(_))));

        let no_grants = service
            .create_client(
                "C",
                vec!["https://app.example.com/cb".to_string()],
                vec![],
                vec![],
                true,
            )
            .await;
        assert!(matches!(no_grants, Err(AdminError::Validation(_))));

        let unknown_grant = service
            .create_client(
                "C",
                vec!["https://app.example.com/cb".to_string()],
                vec!["implicit".to_string()],
                vec![],
                true,
            )
            .await;
        assert!(matches!(unknown_grant, Err(AdminError::Validation(_))));
    }
}
