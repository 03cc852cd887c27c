//! User -> recipe bookmarks.

use crate::db::errors::{DbError, Result};
use crate::types::{RecipeId, UserId};
use sqlx::PgConnection;
use std::collections::HashSet;
use tracing::instrument;

pub const FAVORITE_UNIQUE_CONSTRAINT: &str = "favorites_user_recipe_unique";

pub struct Favorites<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Favorites<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Fails with a unique violation on [`FAVORITE_UNIQUE_CONSTRAINT`] when already present.
    #[instrument(skip(self), err)]
    pub async fn add(&mut self, user_id: UserId, recipe_id: RecipeId) -> Result<()> {
        sqlx::query("INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    /// Returns `DbError::NotFound` when the recipe is not a favorite.
    #[instrument(skip(self), err)]
    pub async fn remove(&mut self, user_id: UserId, recipe_id: RecipeId) -> Result<()> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&mut *self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Which of `recipe_ids` the user has favorited.
    #[instrument(skip(self, recipe_ids), fields(count = recipe_ids.len()), err)]
    pub async fn favorited_among(&mut self, user_id: UserId, recipe_ids: &[RecipeId]) -> Result<HashSet<RecipeId>> {
        if recipe_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<(RecipeId,)> = sqlx::query_as("SELECT recipe_id FROM favorites WHERE user_id = $1 AND recipe_id = ANY($2)")
            .bind(user_id)
            .bind(recipe_ids)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Recipes, Repository};
    use crate::test_utils::{create_test_recipe, create_test_user};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_add_twice_is_unique_violation(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let recipe = create_test_recipe(&pool, user.id).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Favorites::new(&mut conn);

        repo.add(user.id, recipe.id).await.unwrap();
        let err = repo.add(user.id, recipe.id).await.unwrap_err();
        assert!(err.is_unique_violation_of(FAVORITE_UNIQUE_CONSTRAINT));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_remove_missing_is_not_found(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let recipe = create_test_recipe(&pool, user.id).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Favorites::new(&mut conn);

        assert!(matches!(repo.remove(user.id, recipe.id).await, Err(DbError::NotFound)));
        repo.add(user.id, recipe.id).await.unwrap();
        repo.remove(user.id, recipe.id).await.unwrap();
        assert!(repo.favorited_among(user.id, &[recipe.id]).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_recipe_delete_cascades(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let recipe = create_test_recipe(&pool, user.id).await;
        let mut conn = pool.acquire().await.unwrap();

        Favorites::new(&mut conn).add(user.id, recipe.id).await.unwrap();
        assert!(Recipes::new(&mut conn).delete(recipe.id).await.unwrap());

        let left = Favorites::new(&mut conn).favorited_among(user.id, &[recipe.id]).await.unwrap();
        assert!(left.is_empty());
    }
}
