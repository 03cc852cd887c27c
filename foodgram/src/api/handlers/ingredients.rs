//! HTTP handlers for ingredients. Reads are public, writes are staff-only.

use crate::{
    AppState,
    api::extract::{Json, Query},
    api::models::ingredients::{IngredientCreate, IngredientResponse, IngredientUpdate, ListIngredientsQuery},
    auth::permissions::StaffUser,
    db::{
        errors::DbError,
        handlers::{Ingredients, Repository, ingredients::IngredientFilter},
        models::ingredients::{IngredientCreateDBRequest, IngredientUpdateDBRequest},
    },
    errors::{Error, Result},
    types::IngredientId,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

fn ingredient_not_found(id: IngredientId) -> Error {
    Error::NotFound {
        resource: "Ingredient".to_string(),
        id: id.to_string(),
    }
}

/// List ingredients, optionally filtered by name
#[utoipa::path(
    get,
    path = "/ingredients/",
    tag = "ingredients",
    summary = "List ingredients",
    params(ListIngredientsQuery),
    responses((status = 200, description = "Matching ingredients, prefix matches first", body = [IngredientResponse]))
)]
#[tracing::instrument(skip_all)]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<ListIngredientsQuery>,
) -> Result<Json<Vec<IngredientResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let ingredients = Ingredients::new(&mut conn).list(&IngredientFilter { name: query.name }).await?;
    Ok(Json(ingredients.into_iter().map(IngredientResponse::from).collect()))
}

/// Get an ingredient
#[utoipa::path(
    get,
    path = "/ingredients/{id}/",
    tag = "ingredients",
    summary = "Get ingredient",
    params(("id" = i64, Path, description = "Ingredient ID")),
    responses(
        (status = 200, description = "Ingredient", body = IngredientResponse),
        (status = 404, description = "Ingredient not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_ingredient(State(state): State<AppState>, Path(id): Path<IngredientId>) -> Result<Json<IngredientResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let ingredient = Ingredients::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or_else(|| ingredient_not_found(id))?;
    Ok(Json(IngredientResponse::from(ingredient)))
}

/// Create an ingredient
#[utoipa::path(
    post,
    path = "/ingredients/",
    tag = "ingredients",
    summary = "Create ingredient",
    request_body = IngredientCreate,
    responses(
        (status = 201, description = "Ingredient created", body = IngredientResponse),
        (status = 400, description = "Invalid fields"),
        (status = 403, description = "Staff only"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_ingredient(
    State(state): State<AppState>,
    _staff: StaffUser,
    Json(request): Json<IngredientCreate>,
) -> Result<(StatusCode, Json<IngredientResponse>)> {
    request.validate()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let ingredient = Ingredients::new(&mut conn)
        .create(&IngredientCreateDBRequest::from(request))
        .await?;
    Ok((StatusCode::CREATED, Json(IngredientResponse::from(ingredient))))
}

/// Update an ingredient
#[utoipa::path(
    patch,
    path = "/ingredients/{id}/",
    tag = "ingredients",
    summary = "Update ingredient",
    params(("id" = i64, Path, description = "Ingredient ID")),
    request_body = IngredientUpdate,
    responses(
        (status = 200, description = "Ingredient updated", body = IngredientResponse),
        (status = 400, description = "Invalid fields"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Ingredient not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_ingredient(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<IngredientId>,
    Json(request): Json<IngredientUpdate>,
) -> Result<Json<IngredientResponse>> {
    request.validate()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    match Ingredients::new(&mut conn).update(id, &IngredientUpdateDBRequest::from(request)).await {
        Ok(ingredient) => Ok(Json(IngredientResponse::from(ingredient))),
        Err(DbError::NotFound) => Err(ingredient_not_found(id)),
        Err(e) => Err(e.into()),
    }
}

/// Delete an ingredient
#[utoipa::path(
    delete,
    path = "/ingredients/{id}/",
    tag = "ingredients",
    summary = "Delete ingredient",
    params(("id" = i64, Path, description = "Ingredient ID")),
    responses(
        (status = 204, description = "Ingredient deleted"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Ingredient not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_ingredient(State(state): State<AppState>, _staff: StaffUser, Path(id): Path<IngredientId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if Ingredients::new(&mut conn).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ingredient_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::ingredients::IngredientResponse;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_name_search_prefix_first(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        create_test_ingredient(&pool, "brown sugar", "g").await;
        create_test_ingredient(&pool, "sugar", "g").await;
        create_test_ingredient(&pool, "salt", "g").await;

        let found: Vec<IngredientResponse> = app.get("/api/ingredients/?name=SUG").await.json();
        let names: Vec<_> = found.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["sugar", "brown sugar"]);

        let all: Vec<IngredientResponse> = app.get("/api/ingredients/").await.json();
        assert_eq!(all.len(), 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_staff_crud(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let (_, token) = create_authed_user(&pool, true).await;
        let (name, value) = auth_header(&token);

        let response = app
            .post("/api/ingredients/")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "milk", "measurement_unit": "ml"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let milk: IngredientResponse = response.json();

        let updated: IngredientResponse = app
            .patch(&format!("/api/ingredients/{}/", milk.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"measurement_unit": "l"}))
            .await
            .json();
        assert_eq!(updated.measurement_unit, "l");

        app.delete(&format!("/api/ingredients/{}/", milk.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        app.get(&format!("/api/ingredients/{}/", milk.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_blank_name_rejected(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let (_, token) = create_authed_user(&pool, true).await;
        let (name, value) = auth_header(&token);

        app.post("/api/ingredients/")
            .add_header(name, value)
            .json(&json!({"name": "", "measurement_unit": "g"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
