//! API layer for HTTP request handling and data models.
//!
//! - **[`extract`]**: `Json`/`Query` extractors that reject with the API error body
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! Everything lives under `/api`:
//!
//! - **Authentication** (`/api/auth/token/*`): token login and logout
//! - **Users** (`/api/users/*`): registration, profiles, passwords and subscriptions
//! - **Catalog** (`/api/tags/*`, `/api/ingredients/*`): read by anyone, written by staff
//! - **Recipes** (`/api/recipes/*`): recipes, favorites, the shopping cart and its download
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa` annotations. The interactive reference is served
//! at `/api/docs` and the raw document at `/api/openapi.json`.

pub mod extract;
pub mod handlers;
pub mod models;
