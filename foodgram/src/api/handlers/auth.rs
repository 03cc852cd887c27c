//! Token login and logout.

use crate::{
    AppState,
    api::extract::Json,
    api::models::{
        auth::{TokenLoginRequest, TokenResponse},
        users::CurrentUser,
    },
    auth::{password, tokens},
    db::handlers::{AuthTokens, Users},
    errors::{Error, FieldErrors, Result},
};
use axum::{extract::State, http::StatusCode};

fn invalid_credentials() -> Error {
    let mut errors = FieldErrors::new();
    errors.add("non_field_errors", "Unable to log in with provided credentials.");
    Error::Validation(errors)
}

/// Exchange email and password for an API token
#[utoipa::path(
    post,
    path = "/auth/token/login/",
    tag = "authentication",
    summary = "Obtain token",
    request_body = TokenLoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<TokenLoginRequest>) -> Result<Json<TokenResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let user = Users::new(&mut conn)
        .get_user_by_email(request.email.trim())
        .await?
        .ok_or_else(invalid_credentials)?;

    let password_hash = user.password_hash.ok_or_else(invalid_credentials)?;
    if !password::verify_password_blocking(request.password, password_hash).await? {
        return Err(invalid_credentials());
    }

    let token = tokens::generate_token();
    AuthTokens::new(&mut conn).issue(user.id, &tokens::token_digest(&token)).await?;

    tracing::info!(user_id = user.id, "Issued auth token");
    Ok(Json(TokenResponse { auth_token: token }))
}

/// Revoke the caller's token
#[utoipa::path(
    post,
    path = "/auth/token/logout/",
    tag = "authentication",
    summary = "Revoke token",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    AuthTokens::new(&mut conn).revoke(current_user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
