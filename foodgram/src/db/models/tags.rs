//! Database models for tags.

use crate::api::models::tags::{DEFAULT_TAG_COLOR, TagCreate, TagUpdate};
use crate::types::TagId;

#[derive(Debug, Clone)]
pub struct TagCreateDBRequest {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<TagCreate> for TagCreateDBRequest {
    fn from(api: TagCreate) -> Self {
        Self {
            name: api.name,
            color: api.color.unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string()),
            slug: api.slug,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagUpdateDBRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub slug: Option<String>,
}

impl From<TagUpdate> for TagUpdateDBRequest {
    fn from(api: TagUpdate) -> Self {
        Self {
            name: api.name,
            color: api.color,
            slug: api.slug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TagDBResponse {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub slug: String,
}
