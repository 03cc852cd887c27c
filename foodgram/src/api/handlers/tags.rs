//! HTTP handlers for tags. Reads are public, writes are staff-only.

use crate::{
    AppState,
    api::extract::Json,
    api::models::tags::{TagCreate, TagResponse, TagUpdate},
    auth::permissions::StaffUser,
    db::{
        errors::DbError,
        handlers::{Repository, Tags},
        models::tags::{TagCreateDBRequest, TagUpdateDBRequest},
    },
    errors::{Error, Result},
    types::TagId,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

fn tag_not_found(id: TagId) -> Error {
    Error::NotFound {
        resource: "Tag".to_string(),
        id: id.to_string(),
    }
}

/// List all tags
#[utoipa::path(
    get,
    path = "/tags/",
    tag = "tags",
    summary = "List tags",
    responses((status = 200, description = "All tags, ordered by name", body = [TagResponse]))
)]
#[tracing::instrument(skip_all)]
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let tags = Tags::new(&mut conn).list(&()).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

/// Get a tag
#[utoipa::path(
    get,
    path = "/tags/{id}/",
    tag = "tags",
    summary = "Get tag",
    params(("id" = i64, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Tag", body = TagResponse),
        (status = 404, description = "Tag not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_tag(State(state): State<AppState>, Path(id): Path<TagId>) -> Result<Json<TagResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let tag = Tags::new(&mut conn).get_by_id(id).await?.ok_or_else(|| tag_not_found(id))?;
    Ok(Json(TagResponse::from(tag)))
}

/// Create a tag
#[utoipa::path(
    post,
    path = "/tags/",
    tag = "tags",
    summary = "Create tag",
    request_body = TagCreate,
    responses(
        (status = 201, description = "Tag created", body = TagResponse),
        (status = 400, description = "Invalid fields or duplicate name/slug"),
        (status = 403, description = "Staff only"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_tag(
    State(state): State<AppState>,
    _staff: StaffUser,
    Json(request): Json<TagCreate>,
) -> Result<(StatusCode, Json<TagResponse>)> {
    request.validate()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let tag = Tags::new(&mut conn).create(&TagCreateDBRequest::from(request)).await?;
    Ok((StatusCode::CREATED, Json(TagResponse::from(tag))))
}

/// Update a tag
#[utoipa::path(
    patch,
    path = "/tags/{id}/",
    tag = "tags",
    summary = "Update tag",
    params(("id" = i64, Path, description = "Tag ID")),
    request_body = TagUpdate,
    responses(
        (status = 200, description = "Tag updated", body = TagResponse),
        (status = 400, description = "Invalid fields or duplicate name/slug"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Tag not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_tag(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<TagId>,
    Json(request): Json<TagUpdate>,
) -> Result<Json<TagResponse>> {
    request.validate()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    match Tags::new(&mut conn).update(id, &TagUpdateDBRequest::from(request)).await {
        Ok(tag) => Ok(Json(TagResponse::from(tag))),
        Err(DbError::NotFound) => Err(tag_not_found(id)),
        Err(e) => Err(e.into()),
    }
}

/// Delete a tag
#[utoipa::path(
    delete,
    path = "/tags/{id}/",
    tag = "tags",
    summary = "Delete tag",
    params(("id" = i64, Path, description = "Tag ID")),
    responses(
        (status = 204, description = "Tag deleted"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Tag not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_tag(State(state): State<AppState>, _staff: StaffUser, Path(id): Path<TagId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if Tags::new(&mut conn).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(tag_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::tags::TagResponse;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_staff_creates_tag_with_default_color(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let (_, token) = create_authed_user(&pool, true).await;
        let (name, value) = auth_header(&token);

        let response = app
            .post("/api/tags/")
            .add_header(name, value)
            .json(&json!({"name": "Breakfast", "slug": "breakfast"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let tag: TagResponse = response.json();
        assert_eq!(tag.color, "#FF0000");

        let tags: Vec<TagResponse> = app.get("/api/tags/").await.json();
        assert_eq!(tags, vec![tag]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_regular_user_cannot_write(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let (_, token) = create_authed_user(&pool, false).await;
        let (name, value) = auth_header(&token);

        let response = app
            .post("/api/tags/")
            .add_header(name, value)
            .json(&json!({"name": "Lunch", "slug": "lunch"}))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        app.post("/api/tags/")
            .json(&json!({"name": "Lunch", "slug": "lunch"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_slug_is_field_error(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let (_, token) = create_authed_user(&pool, true).await;
        create_test_tag(&pool, "dinner").await;
        let (name, value) = auth_header(&token);

        let response = app
            .post("/api/tags/")
            .add_header(name, value)
            .json(&json!({"name": "Supper", "slug": "dinner"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["errors"]["slug"].is_array());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_and_delete(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let (_, token) = create_authed_user(&pool, true).await;
        let tag = create_test_tag(&pool, "snack").await;
        let (name, value) = auth_header(&token);

        let updated: TagResponse = app
            .patch(&format!("/api/tags/{}/", tag.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"color": "#00AA00"}))
            .await
            .json();
        assert_eq!(updated.color, "#00AA00");
        assert_eq!(updated.slug, "snack");

        app.delete(&format!("/api/tags/{}/", tag.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);
        app.get(&format!("/api/tags/{}/", tag.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        app.patch(&format!("/api/tags/{}/", tag.id))
            .add_header(name, value)
            .json(&json!({"name": "Gone"}))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
