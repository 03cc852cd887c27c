//! API request/response models for users and subscriptions.

use crate::api::models::recipes::RecipeSummary;
use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use std::sync::LazyLock;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub(crate) static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

/// The authenticated caller, resolved from the `Authorization` header.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub is_staff: bool,
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            username: db.username,
            is_staff: db.is_staff,
        }
    }
}

/// Registration payload.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UserCreate {
    #[validate(email(message = "Enter a valid email address."), length(max = 254))]
    pub email: String,
    #[validate(
        length(min = 1, max = 150, message = "Must be between 1 and 150 characters."),
        regex(path = *USERNAME_RE, message = "Letters, digits and @/./+/-/_ only.")
    )]
    pub username: String,
    #[validate(length(min = 1, max = 150, message = "Must be between 1 and 150 characters."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150, message = "Must be between 1 and 150 characters."))]
    pub last_name: String,
    /// Length bounds come from `auth.password` in the config
    pub password: String,
}

/// Public profile, with `is_subscribed` relative to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserResponse {
    pub fn new(db: UserDBResponse, is_subscribed: bool) -> Self {
        Self {
            id: db.id,
            email: db.email,
            username: db.username,
            first_name: db.first_name,
            last_name: db.last_name,
            is_subscribed,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetPasswordRequest {
    pub new_password: String,
    pub current_password: String,
}

/// A followed author together with a preview of their recipes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub author: UserResponse,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

/// Query parameters for the subscription endpoints.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RecipesLimitQuery {
    /// Number of recipes previewed per author
    #[param(minimum = 0)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub recipes_limit: Option<i64>,
}
