//! HTTP handlers for the OAuth2 protocol endpoints:
//!
//! - GET  /oauth2/authorize         - authorization request (consent payload)
//! - POST /oauth2/authorize/approve - consent approval, 302 with code
//! - POST /oauth2/authorize/deny    - consent denial, 302 with access_denied
//! - POST /oauth2/token             - token endpoint (all four grants)
//! - POST /oauth2/introspect        - RFC 7662 introspection
//! - POST /oauth2/revoke            - RFC 7009 revocation

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use uuid::Uuid;

use crate::config::AppState;
use crate::dto::{
    ApproveParams, AuthorizeParams, ConsentPayload, DenyParams, IntrospectParams, RevokeParams,
    TokenRequestParams, TokenResponse,
};
use crate::error::OAuthError;
use crate::services::TokenIntrospection;

/// GET /oauth2/authorize
///
/// Validates the authorization request and returns the payload the
/// front-end needs to render the consent screen. End-user authentication
/// happens upstream; the decision comes back through the approve/deny
/// endpoints.
pub async fn authorize_handler(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Json<ConsentPayload>, OAuthError> {
    let client_id = parse_client_id(&params.client_id)?;

    let ctx = state
        .oauth
        .validate_authorization_request(
            &params.response_type,
            client_id,
            &params.redirect_uri,
            &params.scopes(),
            params.code_challenge.as_deref(),
            params.code_challenge_method.as_deref(),
        )
        .await?;

    Ok(Json(ConsentPayload {
        client_id: ctx.client.id.to_string(),
        client_name: ctx.client.client_name,
        redirect_uri: params.redirect_uri,
        scopes: ctx.scopes,
        state: params.state,
        code_challenge: params.code_challenge,
        code_challenge_method: params.code_challenge_method,
    }))
}

/// POST /oauth2/authorize/approve
///
/// Issues an authorization code after user consent and redirects back to
/// the client with `code` (and `state` when present).
pub async fn approve_handler(
    State(state): State<AppState>,
    Form(params): Form<ApproveParams>,
) -> Response {
    let client_id = match parse_client_id(&params.client_id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let user_id = match Uuid::parse_str(&params.user_id) {
        Ok(id) => id,
        Err(_) => {
            return OAuthError::InvalidRequest("Invalid user_id format".to_string())
                .into_response()
        }
    };

    // Client, redirect URI, grant type, PKCE parameters and scopes are
    // re-validated here; the consent form round-trip is untrusted input.
    let ctx = match state
        .oauth
        .validate_authorization_request(
            "code",
            client_id,
            &params.redirect_uri,
            &params.scopes(),
            params.code_challenge.as_deref(),
            params.code_challenge_method.as_deref(),
        )
        .await
    {
        Ok(ctx) => ctx,
        // Scope problems surface after the redirect URI has been checked
        // against the registration, so redirecting is safe. Everything
        // else stays a direct JSON error to avoid an open redirect.
        Err(err @ (OAuthError::InvalidScope(_) | OAuthError::ServerError(_))) => {
            return error_redirect(&params.redirect_uri, &err, params.state.as_deref());
        }
        Err(err) => return err.into_response(),
    };

    let code = match state
        .oauth
        .create_authorization_code(
            ctx.client.id,
            user_id,
            &params.redirect_uri,
            ctx.scopes,
            params.state.clone(),
            params.code_challenge.clone(),
            params.code_challenge_method.clone(),
        )
        .await
    {
        Ok(code) => code,
        Err(err) => return error_redirect(&params.redirect_uri, &err, params.state.as_deref()),
    };

    let mut url = format!(
        "{}{}code={}",
        params.redirect_uri,
        query_separator(&params.redirect_uri),
        urlencoding::encode(&code.code)
    );
    if let Some(state_param) = &params.state {
        url.push_str(&format!("&state={}", urlencoding::encode(state_param)));
    }

    found_redirect(&url)
}

/// POST /oauth2/authorize/deny
///
/// Redirects back to the client with `error=access_denied`.
pub async fn deny_handler(Form(params): Form<DenyParams>) -> Response {
    error_redirect(
        &params.redirect_uri,
        &OAuthError::AccessDenied,
        params.state.as_deref(),
    )
}

/// POST /oauth2/token
pub async fn token_handler(
    State(state): State<AppState>,
    Form(params): Form<TokenRequestParams>,
) -> Result<Json<TokenResponse>, OAuthError> {
    let token = match params.grant_type.as_str() {
        "password" => {
            let username = require(&params.username, "username")?;
            let password = require(&params.password, "password")?;
            let client_id = parse_client_id(require(&params.client_id, "client_id")?)?;
            let client_secret = require(&params.client_secret, "client_secret")?;

            state
                .oauth
                .password_grant(username, password, client_id, client_secret, &params.scopes())
                .await?
        }
        "refresh_token" => {
            let refresh_token = require(&params.refresh_token, "refresh_token")?;
            let client_id = parse_client_id(require(&params.client_id, "client_id")?)?;

            state
                .oauth
                .refresh_token_grant(refresh_token, client_id, params.client_secret.as_deref())
                .await?
        }
        "authorization_code" => {
            let code = require(&params.code, "code")?;
            let redirect_uri = require(&params.redirect_uri, "redirect_uri")?;
            let client_id = parse_client_id(require(&params.client_id, "client_id")?)?;

            state
                .oauth
                .authorization_code_grant(
                    code,
                    client_id,
                    params.client_secret.as_deref(),
                    redirect_uri,
                    params.code_verifier.as_deref(),
                )
                .await?
        }
        "client_credentials" => {
            let client_id = parse_client_id(require(&params.client_id, "client_id")?)?;
            let client_secret = require(&params.client_secret, "client_secret")?;

            state
                .oauth
                .client_credentials_grant(client_id, client_secret, &params.scopes())
                .await?
        }
        _ => return Err(OAuthError::UnsupportedGrantType),
    };

    Ok(Json(token.into()))
}

/// POST /oauth2/introspect
pub async fn introspect_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(params): Form<IntrospectParams>,
) -> Result<Json<TokenIntrospection>, OAuthError> {
    authenticate_request_client(
        &state,
        &headers,
        params.client_id.as_deref(),
        params.client_secret.as_deref(),
    )
    .await?;

    let introspection = state.oauth.introspect_token(&params.token).await?;
    Ok(Json(introspection))
}

/// POST /oauth2/revoke
///
/// Always 200 with an empty body on success paths, including unknown
/// tokens, per RFC 7009 §2.2.
pub async fn revoke_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(params): Form<RevokeParams>,
) -> Result<StatusCode, OAuthError> {
    authenticate_request_client(
        &state,
        &headers,
        params.client_id.as_deref(),
        params.client_secret.as_deref(),
    )
    .await?;

    state
        .oauth
        .revoke_token(&params.token, params.token_type_hint.as_deref())
        .await?;

    Ok(StatusCode::OK)
}

// ----------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------

fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, OAuthError> {
    value
        .as_deref()
        .ok_or_else(|| OAuthError::InvalidRequest(format!("{name} is required")))
}

fn parse_client_id(raw: &str) -> Result<Uuid, OAuthError> {
    Uuid::parse_str(raw)
        .map_err(|_| OAuthError::InvalidRequest("Invalid client_id format".to_string()))
}

/// Verify client credentials presented via HTTP Basic or form fields.
/// Requests without credentials proceed; presented credentials must be
/// valid.
async fn authenticate_request_client(
    state: &AppState,
    headers: &HeaderMap,
    form_client_id: Option<&str>,
    form_client_secret: Option<&str>,
) -> Result<(), OAuthError> {
    let basic = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(decode_basic_credentials);

    let (client_id, client_secret) = match &basic {
        Some((id, secret)) => (Some(id.as_str()), Some(secret.as_str())),
        None => (form_client_id, form_client_secret),
    };

    let Some(client_id) = client_id else {
        return Ok(());
    };

    let client_id = Uuid::parse_str(client_id).map_err(|_| OAuthError::InvalidClient)?;

    state
        .oauth
        .clients()
        .authenticate_client(client_id, client_secret)
        .await
        .map_err(|e| OAuthError::ServerError(e.to_string()))?
        .ok_or(OAuthError::InvalidClient)?;

    Ok(())
}

fn decode_basic_credentials(encoded: &str) -> Option<(String, String)> {
    let decoded = BASE64_STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

fn query_separator(url: &str) -> &'static str {
    if url.contains('?') {
        "&"
    } else {
        "?"
    }
}

/// 302 Found redirect; RFC 6749 redirects use this status.
fn found_redirect(url: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}

/// Redirect-based error delivery for a validated redirect URI.
fn error_redirect(redirect_uri: &str, error: &OAuthError, state: Option<&str>) -> Response {
    let mut url = format!(
        "{}{}error={}",
        redirect_uri,
        query_separator(redirect_uri),
        urlencoding::encode(error.code())
    );
    if let Some(state) = state {
        url.push_str(&format!("&state={}", urlencoding::encode(state)));
    }

    found_redirect(&url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_credentials_decode() {
        let encoded = BASE64_STANDARD.encode("client-id:s3cret");
        assert_eq!(
            decode_basic_credentials(&encoded),
            Some(("client-id".to_string(), "s3cret".to_string()))
        );

        assert!(decode_basic_credentials("!!!not-base64!!!").is_none());
        assert!(decode_basic_credentials(&BASE64_STANDARD.encode("no-colon")).is_none());
    }

    #[test]
    fn redirect_urls_append_with_correct_separator() {
        let plain = error_redirect(
            "https://app.example.com/cb",
            &OAuthError::AccessDenied,
            Some("xyz"),
        );
        let location = plain.headers().get(header::LOCATION).unwrap().to_str().unwrap();
        assert_eq!(
            location,
            "https://app.example.com/cb?error=access_denied&state=xyz"
        );

        let with_query = error_redirect(
            "https://app.example.com/cb?keep=1",
            &OAuthError::AccessDenied,
            None,
        );
        let location = with_query
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(
            location,
            "https://app.example.com/cb?keep=1&error=access_denied"
        );
    }

    #[test]
    fn redirects_use_302() {
        let response = error_redirect("https://app.example.com/cb", &OAuthError::AccessDenied, None);
        assert_eq!(response.status(), StatusCode::FOUND);
    }
}
