//! Database layer: SQLx repositories over PostgreSQL.
//!
//! ```text
//! API handlers -> db::handlers (repositories) -> db::models -> PostgreSQL
//! ```
//!
//! - [`handlers`]: repository implementations
//! - [`models`]: row and request structures
//! - [`errors`]: [`errors::DbError`], built from `sqlx::Error`
//!
//! Migrations live in `migrations/` and are exposed through [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
