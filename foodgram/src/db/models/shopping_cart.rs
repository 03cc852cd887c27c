//! Database models for the shopping cart.

use rust_decimal::Decimal;

/// An ingredient line of a recipe in someone's cart, with that cart entry's multiplier.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CartIngredientRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
    pub quantity: Decimal,
}
