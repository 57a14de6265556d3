//! Client management endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::config::AppState;
use crate::dto::{ClientResponse, ClientWithSecretResponse, CreateClientRequest};
use crate::error::AdminError;

/// POST /clients
///
/// The response carries the plain client secret; it is not retrievable
/// afterwards.
pub async fn create_client_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ClientWithSecretResponse>), AdminError> {
    let (client, client_secret) = state
        .clients
        .create_client(
            &req.client_name,
            req.redirect_uris,
            req.grant_types,
            req.scopes,
            req.is_confidential,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ClientWithSecretResponse {
            client: client.into(),
            client_secret,
        }),
    ))
}

/// GET /clients/:client_id
pub async fn get_client_handler(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<ClientResponse>, AdminError> {
    let client = state
        .clients
        .get_client(client_id)
        .await?
        .ok_or(AdminError::NotFound("client"))?;

    Ok(Json(client.into()))
}

/// POST /clients/:client_id/deactivate
pub async fn deactivate_client_handler(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<ClientResponse>, AdminError> {
    let client = state.clients.deactivate_client(client_id).await?;
    Ok(Json(client.into()))
}
