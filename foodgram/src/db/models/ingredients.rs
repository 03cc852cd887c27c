//! Database models for ingredients.

use crate::api::models::ingredients::{IngredientCreate, IngredientUpdate};
use crate::types::IngredientId;

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct IngredientCreateDBRequest {
    pub name: String,
    pub measurement_unit: String,
}

impl From<IngredientCreate> for IngredientCreateDBRequest {
    fn from(api: IngredientCreate) -> Self {
        Self {
            name: api.name,
            measurement_unit: api.measurement_unit,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngredientUpdateDBRequest {
    pub name: Option<String>,
    pub measurement_unit: Option<String>,
}

impl From<IngredientUpdate> for IngredientUpdateDBRequest {
    fn from(api: IngredientUpdate) -> Self {
        Self {
            name: api.name,
            measurement_unit: api.measurement_unit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct IngredientDBResponse {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}
