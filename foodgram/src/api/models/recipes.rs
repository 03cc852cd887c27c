//! API request/response models for recipes, favorites and the shopping cart.

use crate::api::models::tags::TagResponse;
use crate::api::models::users::UserResponse;
use crate::types::{IngredientId, RecipeId, TagId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// One ingredient line of a recipe payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecipeIngredientInput {
    /// Ingredient id
    pub id: IngredientId,
    pub amount: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecipeCreate {
    #[validate(length(min = 1, message = "At least one ingredient is required."))]
    pub ingredients: Vec<RecipeIngredientInput>,
    #[validate(length(min = 1, message = "At least one tag is required."))]
    pub tags: Vec<TagId>,
    /// `data:image/<ext>;base64,<data>`
    pub image: String,
    #[validate(length(min = 1, max = 200, message = "Must be between 1 and 200 characters."))]
    pub name: String,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: String,
    #[validate(range(min = 1, message = "Cooking time must be at least 1 minute."))]
    pub cooking_time: i32,
}

/// Partial update. Present `ingredients`/`tags` replace the existing sets.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct RecipeUpdate {
    #[validate(length(min = 1, message = "At least one ingredient is required."))]
    pub ingredients: Option<Vec<RecipeIngredientInput>>,
    #[validate(length(min = 1, message = "At least one tag is required."))]
    pub tags: Option<Vec<TagId>>,
    pub image: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Must be between 1 and 200 characters."))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: Option<String>,
    #[validate(range(min = 1, message = "Cooking time must be at least 1 minute."))]
    pub cooking_time: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecipeIngredientResponse {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeResponse {
    pub id: RecipeId,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    /// Public URL of the stored image
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

/// Short form returned by favorite/cart toggles and subscription previews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

/// Filters for the recipe listing. Parsed with `axum_extra::extract::Query` so `tags` can repeat.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListRecipesQuery {
    /// Tag slugs; a recipe matches if it has any of them
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: Option<UserId>,
    /// `1`/`true` keeps only the caller's favorites
    pub is_favorited: Option<String>,
    /// `1`/`true` keeps only recipes in the caller's cart
    pub is_in_shopping_cart: Option<String>,
}

/// Truthy query flag: `1` or `true` (any case). Everything else means "no filter".
pub fn flag_enabled(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some(v) if v == "1" || v.eq_ignore_ascii_case("true"))
}

#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CartAddQuery {
    /// Multiplier applied to this recipe's ingredients in the shopping list (default 1)
    #[param(value_type = Option<String>)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub quantity: Option<Decimal>,
}
