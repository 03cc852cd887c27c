//! HTTP handlers for recipes, favorites, the shopping cart and the shopping-list download.
//!
//! Recipe responses are assembled in bulk by [`recipe_responses`]: one query each for tags,
//! ingredient lines, authors and the viewer's subscription/favorite/cart membership, however
//! many recipes are on the page.

use crate::{
    AppState,
    api::extract::{Json, MultiQuery, Query},
    api::models::{
        pagination::{PaginatedResponse, Pagination},
        recipes::{
            CartAddQuery, ListRecipesQuery, RecipeCreate, RecipeIngredientInput, RecipeIngredientResponse, RecipeResponse, RecipeSummary,
            RecipeUpdate, flag_enabled,
        },
        tags::TagResponse,
        users::{CurrentUser, UserResponse},
    },
    auth::permissions::ensure_owner_or_staff,
    db::{
        errors::DbError,
        handlers::{
            Favorites, Ingredients, Recipes, Repository, ShoppingCart, Subscriptions, Tags, Users, favorites::FAVORITE_UNIQUE_CONSTRAINT,
            recipes::RecipeFilter, shopping_cart::CART_UNIQUE_CONSTRAINT,
        },
        models::recipes::{RecipeCreateDBRequest, RecipeDBResponse, RecipeIngredientLine, RecipeUpdateDBRequest},
    },
    errors::{Error, FieldErrors, Result},
    shopping_list,
    storage::{DecodedImage, decode_data_url},
    types::{IngredientId, Operation, RecipeId, TagId, UserId},
};
use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use std::collections::HashSet;
use validator::Validate;

const IMAGE_FOLDER: &str = "recipes";

fn recipe_not_found(id: RecipeId) -> Error {
    Error::NotFound {
        resource: "Recipe".to_string(),
        id: id.to_string(),
    }
}

async fn load_recipe(conn: &mut PgConnection, id: RecipeId) -> Result<RecipeDBResponse> {
    Recipes::new(conn).get_by_id(id).await?.ok_or_else(|| recipe_not_found(id))
}

/// Full views for `recipes`, in input order, from `viewer`'s perspective.
pub(crate) async fn recipe_responses(
    state: &AppState,
    conn: &mut PgConnection,
    recipes: Vec<RecipeDBResponse>,
    viewer: Option<&CurrentUser>,
) -> Result<Vec<RecipeResponse>> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }

    let recipe_ids: Vec<RecipeId> = recipes.iter().map(|r| r.id).collect();
    let author_ids: Vec<UserId> = recipes.iter().map(|r| r.author_id).collect::<HashSet<_>>().into_iter().collect();

    let mut tags = Tags::new(conn).get_for_recipes(&recipe_ids).await?;
    let mut lines = Recipes::new(conn).ingredients_for(&recipe_ids).await?;
    let authors = Users::new(conn).get_bulk(author_ids.clone()).await?;

    let (subscribed, favorited, in_cart) = match viewer {
        Some(viewer) => (
            Subscriptions::new(conn).subscribed_among(viewer.id, &author_ids).await?,
            Favorites::new(conn).favorited_among(viewer.id, &recipe_ids).await?,
            ShoppingCart::new(conn).in_cart_among(viewer.id, &recipe_ids).await?,
        ),
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors.get(&recipe.author_id).cloned().ok_or_else(|| Error::Internal {
                operation: format!("load author {} of recipe {}", recipe.author_id, recipe.id),
            })?;

            Ok(RecipeResponse {
                id: recipe.id,
                tags: tags
                    .remove(&recipe.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(TagResponse::from)
                    .collect(),
                author: UserResponse::new(author, subscribed.contains(&recipe.author_id)),
                ingredients: lines
                    .remove(&recipe.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|l| RecipeIngredientResponse {
                        id: l.ingredient_id,
                        name: l.name,
                        measurement_unit: l.measurement_unit,
                        amount: l.amount,
                    })
                    .collect(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                image: state.storage.url_for(&recipe.image),
                name: recipe.name,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
                pub_date: recipe.pub_date,
            })
        })
        .collect()
}

async fn single_response(state: &AppState, conn: &mut PgConnection, recipe: RecipeDBResponse, viewer: &CurrentUser) -> Result<RecipeResponse> {
    let id = recipe.id;
    recipe_responses(state, conn, vec![recipe], Some(viewer))
        .await?
        .pop()
        .ok_or_else(|| recipe_not_found(id))
}

fn summary(state: &AppState, recipe: RecipeDBResponse) -> RecipeSummary {
    RecipeSummary {
        id: recipe.id,
        image: state.storage.url_for(&recipe.image),
        name: recipe.name,
        cooking_time: recipe.cooking_time,
    }
}

/// Duplicate and existence checks for tag ids.
async fn check_tags(conn: &mut PgConnection, tags: &[TagId], errors: &mut FieldErrors) -> Result<()> {
    let mut seen = HashSet::new();
    for id in tags {
        if !seen.insert(*id) {
            errors.add("tags", format!("Duplicate tag {id}."));
        }
    }

    let existing = Tags::new(conn).existing_ids(tags).await?;
    let mut missing: Vec<TagId> = seen.difference(&existing).copied().collect();
    missing.sort_unstable();
    for id in missing {
        errors.add("tags", format!("Tag {id} does not exist."));
    }
    Ok(())
}

/// Duplicate, amount and existence checks for ingredient lines.
async fn check_ingredients(conn: &mut PgConnection, ingredients: &[RecipeIngredientInput], errors: &mut FieldErrors) -> Result<()> {
    let mut seen = HashSet::new();
    for line in ingredients {
        if !seen.insert(line.id) {
            errors.add("ingredients", format!("Duplicate ingredient {}.", line.id));
        }
        if line.amount < 1 {
            errors.add("ingredients", format!("Amount of ingredient {} must be at least 1.", line.id));
        }
    }

    let ids: Vec<IngredientId> = seen.iter().copied().collect();
    let existing = Ingredients::new(conn).existing_ids(&ids).await?;
    let mut missing: Vec<IngredientId> = seen.difference(&existing).copied().collect();
    missing.sort_unstable();
    for id in missing {
        errors.add("ingredients", format!("Ingredient {id} does not exist."));
    }
    Ok(())
}

fn check_image(state: &AppState, image: &str, errors: &mut FieldErrors) -> Option<DecodedImage> {
    match decode_data_url(image, state.config.media.max_image_bytes) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            errors.add("image", e.to_string());
            None
        }
    }
}

fn ingredient_lines(ingredients: &[RecipeIngredientInput]) -> Vec<RecipeIngredientLine> {
    ingredients
        .iter()
        .map(|l| RecipeIngredientLine {
            ingredient_id: l.id,
            amount: l.amount,
        })
        .collect()
}

/// Remove a stored image without failing the request.
async fn discard_image(state: &AppState, storage_key: &str) {
    if let Err(e) = state.storage.delete(storage_key).await {
        tracing::warn!(storage_key = %storage_key, "Failed to delete image: {:#}", e);
    }
}

/// List recipes
#[utoipa::path(
    get,
    path = "/recipes/",
    tag = "recipes",
    summary = "List recipes",
    description = "Newest first. `tags` may repeat; a recipe matches any of them. `is_favorited` and `is_in_shopping_cart` only apply to authenticated callers.",
    params(Pagination, ListRecipesQuery),
    responses(
        (status = 200, description = "Paginated list of recipes", body = PaginatedResponse<RecipeResponse>),
        (status = 401, description = "Invalid token"),
    ),
    security((), ("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    MultiQuery(query): MultiQuery<ListRecipesQuery>,
    viewer: Option<CurrentUser>,
) -> Result<Json<PaginatedResponse<RecipeResponse>>> {
    let (skip, limit) = pagination.params(&state.config.pagination);

    let mut filter = RecipeFilter::new(skip, limit);
    filter.tags = query.tags.into_iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect();
    filter.author = query.author;
    if let Some(viewer) = &viewer {
        if flag_enabled(query.is_favorited.as_deref()) {
            filter.favorited_by = Some(viewer.id);
        }
        if flag_enabled(query.is_in_shopping_cart.as_deref()) {
            filter.in_cart_of = Some(viewer.id);
        }
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let total_count = Recipes::new(&mut conn).count(&filter).await?;
    let recipes = Recipes::new(&mut conn).list(&filter).await?;
    let data = recipe_responses(&state, &mut conn, recipes, viewer.as_ref()).await?;

    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Get a recipe
#[utoipa::path(
    get,
    path = "/recipes/{id}/",
    tag = "recipes",
    summary = "Get recipe",
    params(("id" = i64, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe", body = RecipeResponse),
        (status = 404, description = "Recipe not found"),
    ),
    security((), ("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_recipe(State(state): State<AppState>, Path(id): Path<RecipeId>, viewer: Option<CurrentUser>) -> Result<Json<RecipeResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let recipe = load_recipe(&mut conn, id).await?;

    recipe_responses(&state, &mut conn, vec![recipe], viewer.as_ref())
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| recipe_not_found(id))
}

/// Create a recipe
#[utoipa::path(
    post,
    path = "/recipes/",
    tag = "recipes",
    summary = "Create recipe",
    request_body = RecipeCreate,
    responses(
        (status = 201, description = "Recipe created", body = RecipeResponse),
        (status = 400, description = "Validation errors, keyed by field"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<RecipeCreate>,
) -> Result<(StatusCode, Json<RecipeResponse>)> {
    let mut errors = match request.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => FieldErrors::from(e),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    check_tags(&mut conn, &request.tags, &mut errors).await?;
    check_ingredients(&mut conn, &request.ingredients, &mut errors).await?;
    let image = check_image(&state, &request.image, &mut errors);
    errors.into_result()?;

    let image = image.ok_or_else(|| Error::Internal {
        operation: "decode validated image".to_string(),
    })?;
    let storage_key = state.storage.store(IMAGE_FOLDER, &image).await?;

    let created = Recipes::new(&mut conn)
        .create(&RecipeCreateDBRequest {
            author_id: current_user.id,
            name: request.name,
            image: storage_key.clone(),
            text: request.text,
            cooking_time: request.cooking_time,
            tags: request.tags,
            ingredients: ingredient_lines(&request.ingredients),
        })
        .await;

    let recipe = match created {
        Ok(recipe) => recipe,
        Err(e) => {
            discard_image(&state, &storage_key).await;
            return Err(e.into());
        }
    };

    tracing::info!(recipe_id = recipe.id, author_id = current_user.id, "Created recipe");
    let response = single_response(&state, &mut conn, recipe, &current_user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Update a recipe (author or staff)
#[utoipa::path(
    patch,
    path = "/recipes/{id}/",
    tag = "recipes",
    summary = "Update recipe",
    description = "Absent fields keep their values. `tags` and `ingredients`, when present, replace the existing sets.",
    params(("id" = i64, Path, description = "Recipe ID")),
    request_body = RecipeUpdate,
    responses(
        (status = 200, description = "Recipe updated", body = RecipeResponse),
        (status = 400, description = "Validation errors, keyed by field"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Recipe not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<RecipeId>,
    Json(request): Json<RecipeUpdate>,
) -> Result<Json<RecipeResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let existing = load_recipe(&mut conn, id).await?;
    ensure_owner_or_staff(&current_user, existing.author_id, Operation::Update, "recipe")?;

    let mut errors = match request.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => FieldErrors::from(e),
    };
    if let Some(tags) = &request.tags {
        check_tags(&mut conn, tags, &mut errors).await?;
    }
    if let Some(ingredients) = &request.ingredients {
        check_ingredients(&mut conn, ingredients, &mut errors).await?;
    }
    let image = match &request.image {
        Some(image) => check_image(&state, image, &mut errors),
        None => None,
    };
    errors.into_result()?;

    let new_key = match &image {
        Some(image) => Some(state.storage.store(IMAGE_FOLDER, image).await?),
        None => None,
    };

    let updated = Recipes::new(&mut conn)
        .update(
            id,
            &RecipeUpdateDBRequest {
                name: request.name,
                image: new_key.clone(),
                text: request.text,
                cooking_time: request.cooking_time,
                tags: request.tags,
                ingredients: request.ingredients.as_deref().map(ingredient_lines),
            },
        )
        .await;

    let recipe = match updated {
        Ok(recipe) => recipe,
        Err(e) => {
            if let Some(key) = &new_key {
                discard_image(&state, key).await;
            }
            return Err(match e {
                DbError::NotFound => recipe_not_found(id),
                other => other.into(),
            });
        }
    };

    if new_key.is_some() {
        discard_image(&state, &existing.image).await;
    }

    Ok(Json(single_response(&state, &mut conn, recipe, &current_user).await?))
}

/// Delete a recipe (author or staff)
#[utoipa::path(
    delete,
    path = "/recipes/{id}/",
    tag = "recipes",
    summary = "Delete recipe",
    params(("id" = i64, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Recipe not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_recipe(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<RecipeId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let existing = load_recipe(&mut conn, id).await?;
    ensure_owner_or_staff(&current_user, existing.author_id, Operation::Delete, "recipe")?;

    if !Recipes::new(&mut conn).delete(id).await? {
        return Err(recipe_not_found(id));
    }
    discard_image(&state, &existing.image).await;

    tracing::info!(recipe_id = id, deleted_by = current_user.id, "Deleted recipe");
    Ok(StatusCode::NO_CONTENT)
}

/// Add a recipe to favorites
#[utoipa::path(
    post,
    path = "/recipes/{id}/favorite/",
    tag = "favorites",
    summary = "Favorite",
    params(("id" = i64, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Added", body = RecipeSummary),
        (status = 400, description = "Already a favorite"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Recipe not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn add_favorite(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<RecipeId>,
) -> Result<(StatusCode, Json<RecipeSummary>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let recipe = load_recipe(&mut conn, id).await?;

    match Favorites::new(&mut conn).add(current_user.id, id).await {
        Ok(()) => Ok((StatusCode::CREATED, Json(summary(&state, recipe)))),
        Err(e) if e.is_unique_violation_of(FAVORITE_UNIQUE_CONSTRAINT) => Err(Error::AlreadyExists {
            message: "Recipe is already in favorites.".to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Remove a recipe from favorites
#[utoipa::path(
    delete,
    path = "/recipes/{id}/favorite/",
    tag = "favorites",
    summary = "Unfavorite",
    params(("id" = i64, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 400, description = "Not a favorite"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Recipe not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn remove_favorite(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<RecipeId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    load_recipe(&mut conn, id).await?;

    match Favorites::new(&mut conn).remove(current_user.id, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(DbError::NotFound) => Err(Error::RelationNotFound {
            message: "Recipe is not in favorites.".to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Largest quantity that fits `NUMERIC(10, 2)`.
fn max_cart_quantity() -> Decimal {
    Decimal::new(99_999_999_99, 2)
}

/// Add a recipe to the shopping cart
#[utoipa::path(
    post,
    path = "/recipes/{id}/shopping_cart/",
    tag = "shopping-cart",
    summary = "Add to cart",
    params(("id" = i64, Path, description = "Recipe ID"), CartAddQuery),
    responses(
        (status = 201, description = "Added", body = RecipeSummary),
        (status = 400, description = "Already in cart or invalid quantity"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Recipe not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<RecipeId>,
    Query(query): Query<CartAddQuery>,
) -> Result<(StatusCode, Json<RecipeSummary>)> {
    let quantity = query.quantity.unwrap_or(Decimal::ONE).round_dp(2);
    if quantity <= Decimal::ZERO || quantity > max_cart_quantity() {
        let mut errors = FieldErrors::new();
        errors.add("quantity", "Quantity must be greater than 0.");
        return Err(Error::Validation(errors));
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let recipe = load_recipe(&mut conn, id).await?;

    match ShoppingCart::new(&mut conn).add(current_user.id, id, quantity).await {
        Ok(()) => Ok((StatusCode::CREATED, Json(summary(&state, recipe)))),
        Err(e) if e.is_unique_violation_of(CART_UNIQUE_CONSTRAINT) => Err(Error::AlreadyExists {
            message: "Recipe is already in the shopping cart.".to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Remove a recipe from the shopping cart
#[utoipa::path(
    delete,
    path = "/recipes/{id}/shopping_cart/",
    tag = "shopping-cart",
    summary = "Remove from cart",
    params(("id" = i64, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 400, description = "Not in cart"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Recipe not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn remove_from_cart(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<RecipeId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    load_recipe(&mut conn, id).await?;

    match ShoppingCart::new(&mut conn).remove(current_user.id, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(DbError::NotFound) => Err(Error::RelationNotFound {
            message: "Recipe is not in the shopping cart.".to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Download the aggregated shopping list
#[utoipa::path(
    get,
    path = "/recipes/download_shopping_cart/",
    tag = "shopping-cart",
    summary = "Download shopping list",
    responses(
        (status = 200, description = "Plain-text shopping list", body = String, content_type = "text/plain"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn download_shopping_cart(State(state): State<AppState>, current_user: CurrentUser) -> Result<impl IntoResponse> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let rows = ShoppingCart::new(&mut conn).ingredient_rows(current_user.id).await?;
    let body = shopping_list::render(&shopping_list::aggregate(&rows));

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", shopping_list::FILENAME),
            ),
        ],
        body,
    ))
}
