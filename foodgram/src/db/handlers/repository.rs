//! The CRUD surface shared by the users, tags, ingredients and recipes tables.

use std::collections::HashMap;

use crate::db::errors::Result;

/// CRUD over one entity table and the join rows it owns (a recipe owns its tag links and
/// ingredient lines).
///
/// Implementations borrow a `&mut PgConnection`, so the same repository works on a pooled
/// connection or inside a transaction opened by the caller.
#[async_trait::async_trait]
pub trait Repository {
    type CreateRequest;
    type UpdateRequest;
    type Response;
    type Id: Send + Sync;
    /// Query parameters for [`Repository::list`]; `()` for tables listed in full
    type Filter: Send + Sync;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// `Ok(None)` when no row has this id.
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// Fetch several rows at once. Unknown ids are silently absent from the map.
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>>;

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Returns whether a row was deleted; dependent rows go with it via `ON DELETE CASCADE`.
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;

    /// Applies the fields present in the request. [`DbError::NotFound`](crate::db::errors::DbError::NotFound)
    /// when the id does not exist.
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}
