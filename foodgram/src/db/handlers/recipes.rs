//! Database repository for recipes, including their tag links and ingredient lines.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::recipes::{RecipeCreateDBRequest, RecipeDBResponse, RecipeIngredientDBResponse, RecipeIngredientLine, RecipeUpdateDBRequest},
};
use crate::types::{RecipeId, TagId, UserId};
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;

/// Filter for listing recipes
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub skip: i64,
    pub limit: i64,
    /// Tag slugs; a recipe matches if it carries any of them
    pub tags: Vec<String>,
    pub author: Option<UserId>,
    pub favorited_by: Option<UserId>,
    pub in_cart_of: Option<UserId>,
}

impl RecipeFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    /// Appends `WHERE` conditions for this filter. EXISTS keeps multi-tag matches from duplicating rows.
    fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        query.push(" WHERE 1=1");

        if !self.tags.is_empty() {
            query.push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            );
            query.push_bind(self.tags.clone());
            query.push("))");
        }

        if let Some(author) = self.author {
            query.push(" AND r.author_id = ");
            query.push_bind(author);
        }

        if let Some(user_id) = self.favorited_by {
            query.push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ");
            query.push_bind(user_id);
            query.push(")");
        }

        if let Some(user_id) = self.in_cart_of {
            query.push(" AND EXISTS (SELECT 1 FROM shopping_cart sc WHERE sc.recipe_id = r.id AND sc.user_id = ");
            query.push_bind(user_id);
            query.push(")");
        }
    }
}

pub struct Recipes<'c> {
    db: &'c mut PgConnection,
}

async fn insert_tags(conn: &mut PgConnection, recipe_id: RecipeId, tags: &[TagId]) -> Result<()> {
    if tags.is_empty() {
        return Ok(());
    }
    sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) SELECT $1, UNNEST($2::BIGINT[])")
        .bind(recipe_id)
        .bind(tags)
        .execute(conn)
        .await?;
    Ok(())
}

async fn insert_ingredients(conn: &mut PgConnection, recipe_id: RecipeId, lines: &[RecipeIngredientLine]) -> Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    let ingredient_ids: Vec<i64> = lines.iter().map(|l| l.ingredient_id).collect();
    let amounts: Vec<i32> = lines.iter().map(|l| l.amount).collect();

    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, ingredient_id, amount FROM UNNEST($2::BIGINT[], $3::INTEGER[]) AS t(ingredient_id, amount)
        "#,
    )
    .bind(recipe_id)
    .bind(&ingredient_ids)
    .bind(&amounts)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl<'c> Repository for Recipes<'c> {
    type CreateRequest = RecipeCreateDBRequest;
    type UpdateRequest = RecipeUpdateDBRequest;
    type Response = RecipeDBResponse;
    type Id = RecipeId;
    type Filter = RecipeFilter;

    #[instrument(skip(self, request), fields(author_id = request.author_id, name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let recipe = sqlx::query_as::<_, RecipeDBResponse>(
            r#"
            INSERT INTO recipes (author_id, name, image, text, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, author_id, name, image, text, cooking_time, pub_date
            "#,
        )
        .bind(request.author_id)
        .bind(&request.name)
        .bind(&request.image)
        .bind(&request.text)
        .bind(request.cooking_time)
        .fetch_one(&mut *tx)
        .await?;

        insert_tags(&mut tx, recipe.id, &request.tags).await?;
        insert_ingredients(&mut tx, recipe.id, &request.ingredients).await?;

        tx.commit().await?;
        Ok(recipe)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let recipe = sqlx::query_as::<_, RecipeDBResponse>(
            "SELECT id, author_id, name, image, text, cooking_time, pub_date FROM recipes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(recipe)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<RecipeId>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, RecipeDBResponse>(
            "SELECT id, author_id, name, image, text, cooking_time, pub_date FROM recipes WHERE id = ANY($1)",
        )
        .bind(ids.as_slice())
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows.into_iter().map(|r| (r.id, r)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date FROM recipes r");
        filter.push_conditions(&mut query);

        query.push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let recipes = query.build_query_as::<RecipeDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(recipes)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let recipe = sqlx::query_as::<_, RecipeDBResponse>(
            r#"
            UPDATE recipes SET
                name = COALESCE($2, name),
                image = COALESCE($3, image),
                text = COALESCE($4, text),
                cooking_time = COALESCE($5, cooking_time)
            WHERE id = $1
            RETURNING id, author_id, name, image, text, cooking_time, pub_date
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.image)
        .bind(&request.text)
        .bind(request.cooking_time)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if let Some(tags) = &request.tags {
            sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_tags(&mut tx, id, tags).await?;
        }

        if let Some(ingredients) = &request.ingredients {
            sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_ingredients(&mut tx, id, ingredients).await?;
        }

        tx.commit().await?;
        Ok(recipe)
    }
}

impl<'c> Recipes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Count recipes matching the filter, ignoring skip/limit
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &RecipeFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
        filter.push_conditions(&mut query);

        let count: (i64,) = query.build_query_as().fetch_one(&mut *self.db).await?;
        Ok(count.0)
    }

    /// Ingredient lines of each recipe, ordered by ingredient name.
    #[instrument(skip(self, recipe_ids), fields(count = recipe_ids.len()), err)]
    pub async fn ingredients_for(&mut self, recipe_ids: &[RecipeId]) -> Result<HashMap<RecipeId, Vec<RecipeIngredientDBResponse>>> {
        if recipe_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, RecipeIngredientDBResponse>(
            r#"
            SELECT ri.recipe_id, ri.ingredient_id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY i.name, ri.id
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(&mut *self.db)
        .await?;

        let mut result: HashMap<RecipeId, Vec<RecipeIngredientDBResponse>> = HashMap::new();
        for row in rows {
            result.entry(row.recipe_id).or_default().push(row);
        }
        Ok(result)
    }

    /// Newest recipes of each author, at most `limit` per author.
    #[instrument(skip(self, author_ids), fields(count = author_ids.len()), err)]
    pub async fn preview_for_authors(&mut self, author_ids: &[UserId], limit: i64) -> Result<HashMap<UserId, Vec<RecipeDBResponse>>> {
        if author_ids.is_empty() || limit <= 0 {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, RecipeDBResponse>(
            r#"
            SELECT id, author_id, name, image, text, cooking_time, pub_date FROM (
                SELECT r.*, ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.pub_date DESC, r.id DESC) AS rn
                FROM recipes r
                WHERE r.author_id = ANY($1)
            ) ranked
            WHERE rn <= $2
            ORDER BY author_id, pub_date DESC, id DESC
            "#,
        )
        .bind(author_ids)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        let mut result: HashMap<UserId, Vec<RecipeDBResponse>> = HashMap::new();
        for row in rows {
            result.entry(row.author_id).or_default().push(row);
        }
        Ok(result)
    }

    /// Total recipe count per author. Authors without recipes are absent from the map.
    #[instrument(skip(self, author_ids), fields(count = author_ids.len()), err)]
    pub async fn count_by_authors(&mut self, author_ids: &[UserId]) -> Result<HashMap<UserId, i64>> {
        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(UserId, i64)> =
            sqlx::query_as("SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id")
                .bind(author_ids)
                .fetch_all(&mut *self.db)
                .await?;
        Ok(rows.into_iter().collect())
    }
}
