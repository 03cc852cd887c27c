//! Recipes a user intends to cook, each with a quantity multiplier.

use crate::db::errors::{DbError, Result};
use crate::db::models::shopping_cart::CartIngredientRow;
use crate::types::{RecipeId, UserId};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use std::collections::HashSet;
use tracing::instrument;

pub const CART_UNIQUE_CONSTRAINT: &str = "shopping_cart_user_recipe_unique";

pub struct ShoppingCart<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ShoppingCart<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Fails with a unique violation on [`CART_UNIQUE_CONSTRAINT`] when already present.
    #[instrument(skip(self), err)]
    pub async fn add(&mut self, user_id: UserId, recipe_id: RecipeId, quantity: Decimal) -> Result<()> {
        sqlx::query("INSERT INTO shopping_cart (user_id, recipe_id, quantity) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(recipe_id)
            .bind(quantity)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    /// Returns `DbError::NotFound` when the recipe is not in the cart.
    #[instrument(skip(self), err)]
    pub async fn remove(&mut self, user_id: UserId, recipe_id: RecipeId) -> Result<()> {
        let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&mut *self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Which of `recipe_ids` are in the user's cart.
    #[instrument(skip(self, recipe_ids), fields(count = recipe_ids.len()), err)]
    pub async fn in_cart_among(&mut self, user_id: UserId, recipe_ids: &[RecipeId]) -> Result<HashSet<RecipeId>> {
        if recipe_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<(RecipeId,)> =
            sqlx::query_as("SELECT recipe_id FROM shopping_cart WHERE user_id = $1 AND recipe_id = ANY($2)")
                .bind(user_id)
                .bind(recipe_ids)
                .fetch_all(&mut *self.db)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Every ingredient line of every recipe in the user's cart, with that entry's quantity.
    #[instrument(skip(self), err)]
    pub async fn ingredient_rows(&mut self, user_id: UserId) -> Result<Vec<CartIngredientRow>> {
        let rows = sqlx::query_as::<_, CartIngredientRow>(
            r#"
            SELECT i.name, i.measurement_unit, ri.amount, sc.quantity
            FROM shopping_cart sc
            INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE sc.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Recipes;
    use crate::db::handlers::Repository;
    use crate::db::models::recipes::{RecipeCreateDBRequest, RecipeIngredientLine};
    use crate::test_utils::{create_test_ingredient, create_test_user};
    use sqlx::PgPool;

    async fn recipe_with(pool: &PgPool, author: UserId, lines: Vec<RecipeIngredientLine>) -> RecipeId {
        let mut conn = pool.acquire().await.unwrap();
        Recipes::new(&mut conn)
            .create(&RecipeCreateDBRequest {
                author_id: author,
                name: "Dish".to_string(),
                image: "recipes/dish.png".to_string(),
                text: "Cook it.".to_string(),
                cooking_time: 5,
                tags: vec![],
                ingredients: lines,
            })
            .await
            .unwrap()
            .id
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_ingredient_rows_carry_quantity(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let salt = create_test_ingredient(&pool, "salt", "g").await;
        let a = recipe_with(
            &pool,
            user.id,
            vec![RecipeIngredientLine {
                ingredient_id: salt.id,
                amount: 2,
            }],
        )
        .await;
        let b = recipe_with(
            &pool,
            user.id,
            vec![RecipeIngredientLine {
                ingredient_id: salt.id,
                amount: 3,
            }],
        )
        .await;

        let mut conn = pool.acquire().await.unwrap();
        let mut cart = ShoppingCart::new(&mut conn);
        cart.add(user.id, a, Decimal::from(2)).await.unwrap();
        cart.add(user.id, b, Decimal::ONE).await.unwrap();

        let mut rows = cart.ingredient_rows(user.id).await.unwrap();
        rows.sort_by_key(|r| r.amount);
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].amount, rows[0].quantity), (2, Decimal::from(2)));
        assert_eq!((rows[1].amount, rows[1].quantity), (3, Decimal::ONE));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_non_positive_quantity_is_check_violation(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let recipe = recipe_with(&pool, user.id, vec![]).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut cart = ShoppingCart::new(&mut conn);

        let err = cart.add(user.id, recipe, Decimal::ZERO).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_add_remove_membership(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let recipe = recipe_with(&pool, user.id, vec![]).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut cart = ShoppingCart::new(&mut conn);

        cart.add(user.id, recipe, Decimal::ONE).await.unwrap();
        assert!(cart.add(user.id, recipe, Decimal::ONE).await.unwrap_err().is_unique_violation_of(CART_UNIQUE_CONSTRAINT));
        assert!(cart.in_cart_among(user.id, &[recipe]).await.unwrap().contains(&recipe));

        cart.remove(user.id, recipe).await.unwrap();
        assert!(matches!(cart.remove(user.id, recipe).await, Err(DbError::NotFound)));
    }
}
