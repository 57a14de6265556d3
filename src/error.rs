use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Protocol-level OAuth2 error per RFC 6749 Section 5.2.
///
/// The grant engine returns one of these for every failure; the handlers
/// surface them as `{error, error_description?}` JSON bodies with the
/// matching HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Client authentication failed")]
    InvalidClient,

    #[error("{0}")]
    InvalidGrant(String),

    #[error("Client not authorized for this grant type")]
    UnauthorizedClient,

    #[error("Grant type not supported")]
    UnsupportedGrantType,

    #[error("Response type not supported")]
    UnsupportedResponseType,

    #[error("{0}")]
    InvalidScope(String),

    #[error("Access denied")]
    AccessDenied,

    #[error("{0}")]
    ServerError(String),
}

impl OAuthError {
    /// RFC 6749 error code for this variant, used in JSON bodies and
    /// redirect query strings.
    pub fn code(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::InvalidClient => "invalid_client",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::UnauthorizedClient => "unauthorized_client",
            OAuthError::UnsupportedGrantType => "unsupported_grant_type",
            OAuthError::UnsupportedResponseType => "unsupported_response_type",
            OAuthError::InvalidScope(_) => "invalid_scope",
            OAuthError::AccessDenied => "access_denied",
            OAuthError::ServerError(_) => "server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            OAuthError::InvalidClient => StatusCode::UNAUTHORIZED,
            OAuthError::AccessDenied => StatusCode::FORBIDDEN,
            OAuthError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<crate::repositories::RepositoryError> for OAuthError {
    fn from(err: crate::repositories::RepositoryError) -> Self {
        OAuthError::ServerError(err.to_string())
    }
}

/// RFC 6749 error body.
#[derive(Debug, Clone, Serialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

impl From<&OAuthError> for OAuthErrorBody {
    fn from(err: &OAuthError) -> Self {
        // Internal details stay in the logs, not in the response body.
        let description = match err {
            OAuthError::ServerError(detail) => {
                tracing::error!(detail = %detail, "internal error surfaced as server_error");
                "The server encountered an unexpected error".to_string()
            }
            other => other.to_string(),
        };

        Self {
            error: err.code().to_string(),
            error_description: Some(description),
            error_uri: None,
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let body = OAuthErrorBody::from(&self);
        (self.status(), Json(body)).into_response()
    }
}

/// Errors raised below the protocol boundary: signing, hashing, key
/// loading. The grant engine maps these into `OAuthError` variants before
/// they reach a handler.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Admin-surface errors for the user/client management endpoints.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct AdminErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AdminError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AdminError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AdminError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AdminError::InternalError(err) => {
                tracing::error!(error = %err, "admin endpoint internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let body = Json(AdminErrorBody {
            error: error.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<crate::repositories::RepositoryError> for AdminError {
    fn from(err: crate::repositories::RepositoryError) -> Self {
        match err {
            crate::repositories::RepositoryError::Conflict(msg) => AdminError::Conflict(msg),
            other => AdminError::InternalError(anyhow::anyhow!(other)),
        }
    }
}

impl From<crate::repositories::RepositoryError> for AuthError {
    fn from(err: crate::repositories::RepositoryError) -> Self {
        AuthError::InternalError(anyhow::anyhow!(err))
    }
}
