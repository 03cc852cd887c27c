//! Database record types passed between repositories and API handlers.

pub mod ingredients;
pub mod recipes;
pub mod shopping_cart;
pub mod tags;
pub mod users;
