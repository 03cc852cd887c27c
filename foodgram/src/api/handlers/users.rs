//! HTTP handlers for the user directory and subscriptions.

use crate::{
    AppState,
    api::extract::{Json, Query},
    api::models::{
        pagination::{PaginatedResponse, Pagination},
        recipes::RecipeSummary,
        users::{CurrentUser, RecipesLimitQuery, SetPasswordRequest, SubscriptionResponse, UserCreate, UserResponse},
    },
    auth::password::{self, Argon2Params},
    db::{
        errors::DbError,
        handlers::{Recipes, Repository, Subscriptions, Users, subscriptions::SUBSCRIPTION_UNIQUE_CONSTRAINT, users::UserFilter},
        models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
    errors::{Error, FieldErrors, Result},
    types::UserId,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use sqlx::PgConnection;
use std::collections::HashSet;
use validator::Validate;

fn user_not_found(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

/// Profiles in input order, with `is_subscribed` resolved for `viewer`.
async fn user_responses(conn: &mut PgConnection, users: Vec<UserDBResponse>, viewer: Option<&CurrentUser>) -> Result<Vec<UserResponse>> {
    let subscribed: HashSet<UserId> = match viewer {
        Some(viewer) => {
            let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
            Subscriptions::new(conn).subscribed_among(viewer.id, &ids).await?
        }
        None => HashSet::new(),
    };

    Ok(users
        .into_iter()
        .map(|u| {
            let is_subscribed = subscribed.contains(&u.id);
            UserResponse::new(u, is_subscribed)
        })
        .collect())
}

/// Subscription views for `authors`, all of whom the caller follows.
async fn subscription_responses(
    state: &AppState,
    conn: &mut PgConnection,
    authors: Vec<UserDBResponse>,
    recipes_limit: i64,
) -> Result<Vec<SubscriptionResponse>> {
    let author_ids: Vec<UserId> = authors.iter().map(|a| a.id).collect();
    let mut previews = Recipes::new(conn).preview_for_authors(&author_ids, recipes_limit).await?;
    let counts = Recipes::new(conn).count_by_authors(&author_ids).await?;

    Ok(authors
        .into_iter()
        .map(|author| {
            let recipes = previews
                .remove(&author.id)
                .unwrap_or_default()
                .into_iter()
                .map(|r| RecipeSummary {
                    id: r.id,
                    name: r.name,
                    image: state.storage.url_for(&r.image),
                    cooking_time: r.cooking_time,
                })
                .collect();
            SubscriptionResponse {
                recipes_count: counts.get(&author.id).copied().unwrap_or(0),
                author: UserResponse::new(author, true),
                recipes,
            }
        })
        .collect())
}

fn recipes_limit(query: &RecipesLimitQuery, state: &AppState) -> i64 {
    query
        .recipes_limit
        .unwrap_or(state.config.subscriptions.default_recipes_limit)
        .max(0)
}

/// List users
#[utoipa::path(
    get,
    path = "/users/",
    tag = "users",
    summary = "List users",
    params(Pagination),
    responses(
        (status = 200, description = "Paginated list of users", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Invalid token"),
    ),
    security((), ("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    viewer: Option<CurrentUser>,
) -> Result<Json<PaginatedResponse<UserResponse>>> {
    let (skip, limit) = pagination.params(&state.config.pagination);
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let total_count = Users::new(&mut conn).count().await?;
    let users = Users::new(&mut conn).list(&UserFilter::new(skip, limit)).await?;
    let data = user_responses(&mut conn, users, viewer.as_ref()).await?;

    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/users/",
    tag = "users",
    summary = "Register",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid fields, or email/username already taken"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register_user(State(state): State<AppState>, Json(request): Json<UserCreate>) -> Result<(StatusCode, Json<UserResponse>)> {
    let mut errors = match request.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => FieldErrors::from(e),
    };
    if let Some(message) = password::check_length(&request.password, &state.config.auth.password) {
        errors.add("password", message);
    }
    errors.into_result()?;

    let password_hash =
        password::hash_password_blocking(request.password.clone(), Argon2Params::from(&state.config.auth.password)).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: request.email.trim().to_string(),
            username: request.username,
            first_name: request.first_name,
            last_name: request.last_name,
            password_hash: Some(password_hash),
            is_staff: false,
        })
        .await?;

    tracing::info!(user_id = user.id, "Registered user");
    Ok((StatusCode::CREATED, Json(UserResponse::new(user, false))))
}

/// Get a user's public profile
#[utoipa::path(
    get,
    path = "/users/{id}/",
    tag = "users",
    summary = "Get user",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found"),
    ),
    security((), ("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<UserId>, viewer: Option<CurrentUser>) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).get_by_id(id).await?.ok_or_else(|| user_not_found(id))?;

    let mut responses = user_responses(&mut conn, vec![user], viewer.as_ref()).await?;
    responses.pop().map(Json).ok_or_else(|| user_not_found(id))
}

/// Get the caller's own profile
#[utoipa::path(
    get,
    path = "/users/me/",
    tag = "users",
    summary = "Current user",
    responses(
        (status = 200, description = "Own profile", body = UserResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_current_user(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| user_not_found(current_user.id))?;

    Ok(Json(UserResponse::new(user, false)))
}

/// Change the caller's password
#[utoipa::path(
    post,
    path = "/users/set_password/",
    tag = "users",
    summary = "Set password",
    request_body = SetPasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Wrong current password or invalid new password"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn set_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<SetPasswordRequest>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| user_not_found(current_user.id))?;

    let mut errors = FieldErrors::new();
    let current_ok = match user.password_hash {
        Some(hash) => password::verify_password_blocking(request.current_password, hash).await?,
        None => false,
    };
    if !current_ok {
        errors.add("current_password", "Invalid password.");
    }
    if let Some(message) = password::check_length(&request.new_password, &state.config.auth.password) {
        errors.add("new_password", message);
    }
    errors.into_result()?;

    let password_hash = password::hash_password_blocking(request.new_password, Argon2Params::from(&state.config.auth.password)).await?;
    Users::new(&mut conn)
        .update(
            current_user.id,
            &UserUpdateDBRequest {
                password_hash: Some(password_hash),
                ..Default::default()
            },
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Authors the caller follows
#[utoipa::path(
    get,
    path = "/users/subscriptions/",
    tag = "subscriptions",
    summary = "List subscriptions",
    params(Pagination, RecipesLimitQuery),
    responses(
        (status = 200, description = "Followed authors with recipe previews", body = PaginatedResponse<SubscriptionResponse>),
        (status = 401, description = "Not authenticated"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
    Query(query): Query<RecipesLimitQuery>,
) -> Result<Json<PaginatedResponse<SubscriptionResponse>>> {
    let (skip, limit) = pagination.params(&state.config.pagination);
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let total_count = Subscriptions::new(&mut conn).count_authors(current_user.id).await?;
    let author_ids = Subscriptions::new(&mut conn).list_authors(current_user.id, skip, limit).await?;

    let mut by_id = Users::new(&mut conn).get_bulk(author_ids.clone()).await?;
    let authors: Vec<UserDBResponse> = author_ids.into_iter().filter_map(|id| by_id.remove(&id)).collect();

    let data = subscription_responses(&state, &mut conn, authors, recipes_limit(&query, &state)).await?;
    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Follow an author
#[utoipa::path(
    post,
    path = "/users/{id}/subscribe/",
    tag = "subscriptions",
    summary = "Subscribe",
    params(("id" = i64, Path, description = "Author ID"), RecipesLimitQuery),
    responses(
        (status = 201, description = "Subscribed", body = SubscriptionResponse),
        (status = 400, description = "Self-subscription or already subscribed"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Author not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn subscribe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(author_id): Path<UserId>,
    Query(query): Query<RecipesLimitQuery>,
) -> Result<(StatusCode, Json<SubscriptionResponse>)> {
    if author_id == current_user.id {
        return Err(Error::SelfReference {
            message: "You cannot subscribe to yourself.".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let author = Users::new(&mut conn)
        .get_by_id(author_id)
        .await?
        .ok_or_else(|| user_not_found(author_id))?;

    match Subscriptions::new(&mut conn).subscribe(current_user.id, author_id).await {
        Ok(()) => {}
        Err(e) if e.is_unique_violation_of(SUBSCRIPTION_UNIQUE_CONSTRAINT) => {
            return Err(Error::AlreadyExists {
                message: "You are already subscribed to this user.".to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    }

    let mut responses = subscription_responses(&state, &mut conn, vec![author], recipes_limit(&query, &state)).await?;
    let response = responses.pop().ok_or_else(|| user_not_found(author_id))?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Stop following an author
#[utoipa::path(
    delete,
    path = "/users/{id}/subscribe/",
    tag = "subscriptions",
    summary = "Unsubscribe",
    params(("id" = i64, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 400, description = "Self-reference or not subscribed"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Author not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn unsubscribe(State(state): State<AppState>, current_user: CurrentUser, Path(author_id): Path<UserId>) -> Result<StatusCode> {
    if author_id == current_user.id {
        return Err(Error::SelfReference {
            message: "You cannot unsubscribe from yourself.".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if Users::new(&mut conn).get_by_id(author_id).await?.is_none() {
        return Err(user_not_found(author_id));
    }

    match Subscriptions::new(&mut conn).unsubscribe(current_user.id, author_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(DbError::NotFound) => Err(Error::RelationNotFound {
            message: "You are not subscribed to this user.".to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}
