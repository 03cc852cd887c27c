//! Database models for recipes and their ingredient lines.

use crate::types::{IngredientId, RecipeId, TagId, UserId};
use chrono::{DateTime, Utc};

/// One `(ingredient, amount)` line to store against a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeIngredientLine {
    pub ingredient_id: IngredientId,
    pub amount: i32,
}

/// Database request for creating a recipe. `image` is the storage key, not the upload.
#[derive(Debug, Clone)]
pub struct RecipeCreateDBRequest {
    pub author_id: UserId,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<RecipeIngredientLine>,
}

/// Partial update. `Some` collections replace the stored ones.
#[derive(Debug, Clone, Default)]
pub struct RecipeUpdateDBRequest {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub tags: Option<Vec<TagId>>,
    pub ingredients: Option<Vec<RecipeIngredientLine>>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RecipeDBResponse {
    pub id: RecipeId,
    pub author_id: UserId,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

/// An ingredient line joined with its ingredient.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RecipeIngredientDBResponse {
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}
