//! Request and response types for the HTTP API.

pub mod auth;
pub mod ingredients;
pub mod pagination;
pub mod recipes;
pub mod tags;
pub mod users;
