//! Common type definitions.
//!
//! # ID Types
//!
//! All entity IDs are `BIGSERIAL` primary keys wrapped in type aliases:
//!
//! - [`UserId`]: User account identifier
//! - [`TagId`]: Tag identifier
//! - [`IngredientId`]: Ingredient identifier
//! - [`RecipeId`]: Recipe identifier
//!
//! # Operations
//!
//! [`Operation`] names the action being attempted on a resource, used when reporting
//! ownership failures.

use std::fmt;

// Type aliases for IDs
pub type UserId = i64;
pub type TagId = i64;
pub type IngredientId = i64;
pub type RecipeId = i64;

// Operations that can be performed on resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}
