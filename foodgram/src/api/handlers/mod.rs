//! HTTP request handlers for all API endpoints.
//!
//! Each handler validates its input, checks the caller through the extractors in
//! [`crate::auth`], talks to the repositories in [`crate::db::handlers`] and maps the result
//! to a response.
//!
//! # Handler Modules
//!
//! - [`auth`]: token login and logout
//! - [`ingredients`]: ingredient catalog with prefix-first name search
//! - [`recipes`]: recipe CRUD, favorites, the shopping cart and the shopping-list download
//! - [`tags`]: tag catalog
//! - [`users`]: registration, profiles, password change and subscriptions
//!
//! # Authentication
//!
//! Handlers that take `CurrentUser` reject anonymous callers with 401. Handlers that take
//! `Option<CurrentUser>` serve anonymous callers too, but still reject an invalid token.

pub mod auth;
pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod users;
