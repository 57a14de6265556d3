use std::sync::{Arc, OnceLock};

use regex::Regex;
use uuid::Uuid;

use crate::error::{AdminError, AuthError};
use crate::models::User;
use crate::repositories::UserRepository;
use crate::utils::password::{hash_password, verify_password};

const USERNAME_MIN_LENGTH: usize = 3;
const USERNAME_MAX_LENGTH: usize = 100;
const PASSWORD_MIN_LENGTH: usize = 8;

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

/// User lifecycle and authentication.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Create a user after validating username, email and password, and
    /// rejecting duplicates.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AdminError> {
        let username_len = username.chars().count();
        if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&username_len) {
            return Err(AdminError::Validation(format!(
                "username must be between {} and {} characters",
                USERNAME_MIN_LENGTH, USERNAME_MAX_LENGTH
            )));
        }

        if !email_regex().is_match(email) {
            return Err(AdminError::Validation("invalid email address".to_string()));
        }

        if password.chars().count() < PASSWORD_MIN_LENGTH {
            return Err(AdminError::Validation(format!(
                "password must be at least {} characters",
                PASSWORD_MIN_LENGTH
            )));
        }

        if self.repo.get_by_username(username).await?.is_some() {
            return Err(AdminError::Conflict(format!(
                "username '{}' already exists",
                username
            )));
        }

        if self.repo.get_by_email(email).await?.is_some() {
            return Err(AdminError::Conflict(format!(
                "email '{}' already exists",
                email
            )));
        }

        let hashed = {
            let password = password.to_string();
            tokio::task::spawn_blocking(move || hash_password(&password))
                .await
                .map_err(|e| AdminError::InternalError(anyhow::anyhow!("hash task failed: {e}")))?
                .map_err(|e| AdminError::InternalError(anyhow::anyhow!(e)))?
        };

        let user = User::new(username.to_string(), email.to_string(), hashed);
        Ok(self.repo.create(user).await?)
    }

    /// Authenticate by username/password. Returns `None` for unknown user,
    /// bad password, or an inactive account; callers cannot distinguish.
    pub async fn authenticate_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        let Some(user) = self.repo.get_by_username(username).await? else {
            return Ok(None);
        };

        let verified = {
            let password = password.to_string();
            let hash = user.hashed_password.clone();
            tokio::task::spawn_blocking(move || verify_password(&password, &hash))
                .await
                .map_err(|e| AuthError::InternalError(anyhow::anyhow!("hash task failed: {e}")))??
        };

        if !verified || !user.is_active {
            return Ok(None);
        }

        Ok(Some(user))
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AdminError> {
        Ok(self.repo.get_by_id(user_id).await?)
    }

    pub async fn deactivate_user(&self, user_id: Uuid) -> Result<User, AdminError> {
        let mut user = self
            .repo
            .get_by_id(user_id)
            .await?
            .ok_or(AdminError::NotFound("user"))?;

        user.deactivate();
        Ok(self.repo.update(user).await?)
    }

    pub async fn activate_user(&self, user_id: Uuid) -> Result<User, AdminError> {
        let mut user = self
            .repo
            .get_by_id(user_id)
            .await?
            .ok_or(AdminError::NotFound("user"))?;

        user.activate();
        Ok(self.repo.update(user).await?)
    }

    pub async fn update_user_password(
        &self,
        user_id: Uuid,
        new_password: &str,
    ) -> Result<User, AdminError> {
        let mut user = self
            .repo
            .get_by_id(user_id)
            .await?
            .ok_or(AdminError::NotFound("user"))?;

        let hashed = {
            let password = new_password.to_string();
            tokio::task::spawn_blocking(move || hash_password(&password))
                .await
                .map_err(|e| AdminError::InternalError(anyhow::anyhow!("hash task failed: {e}")))?
                .map_err(|e| AdminError::InternalError(anyhow::anyhow!(e)))?
        };

        user.update_password(hashed);
        Ok(self.repo.update(user).await?)
    }
}
