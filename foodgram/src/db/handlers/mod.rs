//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection` (a pooled connection or an open transaction),
//! binds its own queries and returns models from [`crate::db::models`]. Table-backed entities
//! implement [`Repository`]; pure relationship tables (subscriptions, favorites, cart, tokens)
//! expose only the operations they need.
//!
//! # Available Repositories
//!
//! - [`Users`]: accounts and credentials
//! - [`Subscriptions`]: follower -> author pairs
//! - [`AuthTokens`]: opaque API token digests
//! - [`Tags`], [`Ingredients`]: the catalog
//! - [`Recipes`]: recipes with their tag links and ingredient lines
//! - [`Favorites`], [`ShoppingCart`]: per-user recipe sets
//!
//! ```ignore
//! use foodgram::db::handlers::{Recipes, Repository};
//!
//! let mut tx = pool.begin().await?;
//! let recipe = Recipes::new(&mut tx).get_by_id(id).await?;
//! tx.commit().await?;
//! ```

pub mod auth_tokens;
pub mod favorites;
pub mod ingredients;
pub mod recipes;
pub mod repository;
pub mod shopping_cart;
pub mod subscriptions;
pub mod tags;
pub mod users;

pub use auth_tokens::AuthTokens;
pub use favorites::Favorites;
pub use ingredients::Ingredients;
pub use recipes::Recipes;
pub use repository::Repository;
pub use shopping_cart::ShoppingCart;
pub use subscriptions::Subscriptions;
pub use tags::Tags;
pub use users::Users;
