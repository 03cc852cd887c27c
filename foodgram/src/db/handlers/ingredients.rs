//! Database repository for ingredients.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::ingredients::{IngredientCreateDBRequest, IngredientDBResponse, IngredientUpdateDBRequest},
};
use crate::types::IngredientId;
use sqlx::{PgConnection, QueryBuilder};
use std::collections::{HashMap, HashSet};
use tracing::instrument;

/// Filter for listing ingredients
#[derive(Debug, Clone, Default)]
pub struct IngredientFilter {
    /// Case-insensitive substring match on name; prefix matches sort first
    pub name: Option<String>,
}

/// Escape `%`, `_` and `\` so user input matches literally inside `LIKE`.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub struct Ingredients<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Ingredients<'c> {
    type CreateRequest = IngredientCreateDBRequest;
    type UpdateRequest = IngredientUpdateDBRequest;
    type Response = IngredientDBResponse;
    type Id = IngredientId;
    type Filter = IngredientFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let ingredient = sqlx::query_as::<_, IngredientDBResponse>(
            "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
        )
        .bind(&request.name)
        .bind(&request.measurement_unit)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(ingredient)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let ingredient = sqlx::query_as::<_, IngredientDBResponse>("SELECT * FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(ingredient)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<IngredientId>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, IngredientDBResponse>("SELECT * FROM ingredients WHERE id = ANY($1)")
            .bind(ids.as_slice())
            .fetch_all(&mut *self.db)
            .await?;
        Ok(rows.into_iter().map(|i| (i.id, i)).collect())
    }

    #[instrument(skip(self, filter), fields(name = ?filter.name), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM ingredients");

        match filter.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => {
                let escaped = escape_like(&name.to_lowercase());
                query.push(" WHERE LOWER(name) LIKE ");
                query.push_bind(format!("%{escaped}%"));
                query.push(" ORDER BY (LOWER(name) LIKE ");
                query.push_bind(format!("{escaped}%"));
                query.push(") DESC, name, id");
            }
            None => {
                query.push(" ORDER BY name, id");
            }
        }

        let rows = query.build_query_as::<IngredientDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(rows)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let ingredient = sqlx::query_as::<_, IngredientDBResponse>(
            r#"
            UPDATE ingredients SET
                name = COALESCE($2, name),
                measurement_unit = COALESCE($3, measurement_unit)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.measurement_unit)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(ingredient)
    }
}

impl<'c> Ingredients<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// The subset of `ids` that exist.
    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    pub async fn existing_ids(&mut self, ids: &[IngredientId]) -> Result<HashSet<IngredientId>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<(IngredientId,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Insert unless an ingredient with the same name and unit exists. Returns true if inserted.
    #[instrument(skip(self, request), fields(name = %request.name), err)]
    pub async fn create_if_missing(&mut self, request: &IngredientCreateDBRequest) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO ingredients (name, measurement_unit)
            SELECT $1, $2
            WHERE NOT EXISTS (SELECT 1 FROM ingredients WHERE name = $1 AND measurement_unit = $2)
            "#,
        )
        .bind(&request.name)
        .bind(&request.measurement_unit)
        .execute(&mut *self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    fn request(name: &str, unit: &str) -> IngredientCreateDBRequest {
        IngredientCreateDBRequest {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        }
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("salt"), "salt");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_name_filter_prefix_first(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ingredients::new(&mut conn);

        repo.create(&request("Sea salt", "g")).await.unwrap();
        repo.create(&request("Salt", "g")).await.unwrap();
        repo.create(&request("Pepper", "g")).await.unwrap();
        repo.create(&request("salted butter", "g")).await.unwrap();

        let names: Vec<_> = repo
            .list(&IngredientFilter {
                name: Some("SAL".to_string()),
            })
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();

        assert_eq!(names, vec!["Salt", "salted butter", "Sea salt"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_without_filter(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ingredients::new(&mut conn);
        repo.create(&request("b", "g")).await.unwrap();
        repo.create(&request("a", "g")).await.unwrap();

        let all = repo.list(&IngredientFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "a");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_if_missing(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ingredients::new(&mut conn);

        assert!(repo.create_if_missing(&request("flour", "g")).await.unwrap());
        assert!(!repo.create_if_missing(&request("flour", "g")).await.unwrap());
        assert!(repo.create_if_missing(&request("flour", "cup")).await.unwrap());
    }
}
