//! API request/response models for ingredients.

use crate::db::models::ingredients::IngredientDBResponse;
use crate::types::IngredientId;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct IngredientCreate {
    #[validate(length(min = 1, max = 200, message = "Must be between 1 and 200 characters."))]
    pub name: String,
    #[validate(length(min = 1, max = 200, message = "Must be between 1 and 200 characters."))]
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct IngredientUpdate {
    #[validate(length(min = 1, max = 200, message = "Must be between 1 and 200 characters."))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Must be between 1 and 200 characters."))]
    pub measurement_unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IngredientResponse {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

impl From<IngredientDBResponse> for IngredientResponse {
    fn from(db: IngredientDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            measurement_unit: db.measurement_unit,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListIngredientsQuery {
    /// Case-insensitive substring of the ingredient name
    pub name: Option<String>,
}
