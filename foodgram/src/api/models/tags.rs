//! API request/response models for tags.

use crate::db::models::tags::TagDBResponse;
use crate::types::TagId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use utoipa::ToSchema;
use validator::Validate;

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());
static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());

pub const DEFAULT_TAG_COLOR: &str = "#FF0000";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TagCreate {
    #[validate(length(min = 1, max = 200, message = "Must be between 1 and 200 characters."))]
    pub name: String,
    /// `#RRGGBB`, defaults to red
    #[validate(regex(path = *COLOR_RE, message = "Color must look like #RRGGBB."))]
    pub color: Option<String>,
    #[validate(
        length(min = 1, max = 200, message = "Must be between 1 and 200 characters."),
        regex(path = *SLUG_RE, message = "Letters, digits, hyphens and underscores only.")
    )]
    pub slug: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct TagUpdate {
    #[validate(length(min = 1, max = 200, message = "Must be between 1 and 200 characters."))]
    pub name: Option<String>,
    #[validate(regex(path = *COLOR_RE, message = "Color must look like #RRGGBB."))]
    pub color: Option<String>,
    #[validate(
        length(min = 1, max = 200, message = "Must be between 1 and 200 characters."),
        regex(path = *SLUG_RE, message = "Letters, digits, hyphens and underscores only.")
    )]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TagResponse {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<TagDBResponse> for TagResponse {
    fn from(db: TagDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            color: db.color,
            slug: db.slug,
        }
    }
}
