//! Token login/logout payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TokenLoginRequest {
    pub email: String,
    pub password: String,
}

/// The raw key is only ever returned here; the database keeps its digest.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub auth_token: String,
}
