//! HashMap-backed repository implementations.
//!
//! These back the service-level tests and small deployments that do not
//! need durable storage. Behavior mirrors the Postgres adapters, including
//! the conditional claim semantics of `mark_as_used` and `revoke`.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{
    AuthorizationCodeRepository, ClientRepository, RepositoryError, TokenRepository, UserRepository,
};
use crate::models::{AuthorizationCode, Client, Token, User};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().unwrap();
        if users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(RepositoryError::Conflict(
                "username or email already exists".to_string(),
            ));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().unwrap().get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().unwrap();
        if !users.contains_key(&user.id) {
            return Err(RepositoryError::Database(format!(
                "user {} not found",
                user.id
            )));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.users.write().unwrap().remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryClientRepository {
    clients: RwLock<HashMap<Uuid, Client>>,
}

impl InMemoryClientRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn create(&self, client: Client) -> Result<Client, RepositoryError> {
        self.clients
            .write()
            .unwrap()
            .insert(client.id, client.clone());
        Ok(client)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Client>, RepositoryError> {
        Ok(self.clients.read().unwrap().get(&id).cloned())
    }

    async fn update(&self, client: Client) -> Result<Client, RepositoryError> {
        let mut clients = self.clients.write().unwrap();
        if !clients.contains_key(&client.id) {
            return Err(RepositoryError::Database(format!(
                "client {} not found",
                client.id
            )));
        }
        clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.clients.write().unwrap().remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryTokenRepository {
    tokens: RwLock<HashMap<Uuid, Token>>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn create(&self, token: Token) -> Result<Token, RepositoryError> {
        let mut tokens = self.tokens.write().unwrap();
        let duplicate = tokens.values().any(|t| {
            t.access_token == token.access_token
                || (token.refresh_token.is_some() && t.refresh_token == token.refresh_token)
        });
        if duplicate {
            return Err(RepositoryError::Conflict("token already exists".to_string()));
        }
        tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn get_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<Token>, RepositoryError> {
        Ok(self
            .tokens
            .read()
            .unwrap()
            .values()
            .find(|t| t.access_token == access_token)
            .cloned())
    }

    async fn get_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Token>, RepositoryError> {
        Ok(self
            .tokens
            .read()
            .unwrap()
            .values()
            .find(|t| t.refresh_token.as_deref() == Some(refresh_token))
            .cloned())
    }

    async fn revoke(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.tokens.write().unwrap().remove(&id).is_some())
    }

    async fn delete_expired(&self) -> Result<u64, RepositoryError> {
        let now = Utc::now();
        let mut tokens = self.tokens.write().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at >= now);
        Ok((before - tokens.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryAuthorizationCodeRepository {
    codes: RwLock<HashMap<Uuid, AuthorizationCode>>,
}

impl InMemoryAuthorizationCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorizationCodeRepository for InMemoryAuthorizationCodeRepository {
    async fn create(&self, code: AuthorizationCode) -> Result<AuthorizationCode, RepositoryError> {
        self.codes.write().unwrap().insert(code.id, code.clone());
        Ok(code)
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<AuthorizationCode>, RepositoryError> {
        Ok(self
            .codes
            .read()
            .unwrap()
            .values()
            .find(|c| c.code == code)
            .cloned())
    }

    async fn mark_as_used(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut codes = self.codes.write().unwrap();
        match codes.get_mut(&id) {
            Some(code) if !code.is_used => {
                code.is_used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.codes.write().unwrap().remove(&id).is_some())
    }

    async fn cleanup_expired(&self) -> Result<u64, RepositoryError> {
        let now = Utc::now();
        let mut codes = self.codes.write().unwrap();
        let before = codes.len();
        codes.retain(|_, c| c.expires_at >= now);
        Ok((before - codes.len()) as u64)
    }
}
