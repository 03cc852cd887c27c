//! Database repository for tags.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::tags::{TagCreateDBRequest, TagDBResponse, TagUpdateDBRequest},
};
use crate::types::{RecipeId, TagId};
use sqlx::{FromRow, PgConnection};
use std::collections::{HashMap, HashSet};
use tracing::instrument;

#[derive(Debug, FromRow)]
struct RecipeTag {
    recipe_id: RecipeId,
    id: TagId,
    name: String,
    color: String,
    slug: String,
}

pub struct Tags<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Tags<'c> {
    type CreateRequest = TagCreateDBRequest;
    type UpdateRequest = TagUpdateDBRequest;
    type Response = TagDBResponse;
    type Id = TagId;
    type Filter = ();

    #[instrument(skip(self, request), fields(slug = %request.slug), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let tag = sqlx::query_as::<_, TagDBResponse>("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *")
            .bind(&request.name)
            .bind(&request.color)
            .bind(&request.slug)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(tag)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let tag = sqlx::query_as::<_, TagDBResponse>("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(tag)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<TagId>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let tags = sqlx::query_as::<_, TagDBResponse>("SELECT * FROM tags WHERE id = ANY($1)")
            .bind(ids.as_slice())
            .fetch_all(&mut *self.db)
            .await?;
        Ok(tags.into_iter().map(|t| (t.id, t)).collect())
    }

    #[instrument(skip(self, _filter), err)]
    async fn list(&mut self, _filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let tags = sqlx::query_as::<_, TagDBResponse>("SELECT * FROM tags ORDER BY name")
            .fetch_all(&mut *self.db)
            .await?;
        Ok(tags)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let tag = sqlx::query_as::<_, TagDBResponse>(
            r#"
            UPDATE tags SET
                name = COALESCE($2, name),
                color = COALESCE($3, color),
                slug = COALESCE($4, slug)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.color)
        .bind(&request.slug)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(tag)
    }
}

impl<'c> Tags<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// The subset of `ids` that exist.
    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    pub async fn existing_ids(&mut self, ids: &[TagId]) -> Result<HashSet<TagId>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<(TagId,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Tags of each recipe, ordered by tag name.
    #[instrument(skip(self, recipe_ids), fields(count = recipe_ids.len()), err)]
    pub async fn get_for_recipes(&mut self, recipe_ids: &[RecipeId]) -> Result<HashMap<RecipeId, Vec<TagDBResponse>>> {
        if recipe_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, RecipeTag>(
            r#"
            SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
            FROM recipe_tags rt
            INNER JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(&mut *self.db)
        .await?;

        let mut result: HashMap<RecipeId, Vec<TagDBResponse>> = HashMap::new();
        for row in rows {
            result.entry(row.recipe_id).or_default().push(TagDBResponse {
                id: row.id,
                name: row.name,
                color: row.color,
                slug: row.slug,
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    fn request(name: &str, slug: &str) -> TagCreateDBRequest {
        TagCreateDBRequest {
            name: name.to_string(),
            color: "#00FF00".to_string(),
            slug: slug.to_string(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_list_update(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Tags::new(&mut conn);

        let dinner = repo.create(&request("Dinner", "dinner")).await.unwrap();
        repo.create(&request("Breakfast", "breakfast")).await.unwrap();

        let names: Vec<_> = repo.list(&()).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Breakfast", "Dinner"]);

        let updated = repo
            .update(
                dinner.id,
                &TagUpdateDBRequest {
                    color: Some("#123456".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.color, "#123456");
        assert_eq!(updated.slug, "dinner");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_slug(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Tags::new(&mut conn);

        repo.create(&request("Lunch", "lunch")).await.unwrap();
        let err = repo.create(&request("Lunch 2", "lunch")).await.unwrap_err();
        assert!(err.is_unique_violation_of("tags_slug_unique"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_existing_ids(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Tags::new(&mut conn);
        let tag = repo.create(&request("Soup", "soup")).await.unwrap();

        let existing = repo.existing_ids(&[tag.id, tag.id + 50]).await.unwrap();
        assert_eq!(existing, HashSet::from([tag.id]));
    }
}
