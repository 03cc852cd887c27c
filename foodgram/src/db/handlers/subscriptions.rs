//! Follower -> author relationships.
//!
//! Duplicate pairs are rejected by `subscriptions_follower_author_unique`; callers map that
//! violation to their own "already subscribed" error. Self-follows are not checked here.

use crate::db::errors::{DbError, Result};
use crate::types::UserId;
use sqlx::PgConnection;
use std::collections::HashSet;
use tracing::instrument;

pub const SUBSCRIPTION_UNIQUE_CONSTRAINT: &str = "subscriptions_follower_author_unique";

pub struct Subscriptions<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Subscriptions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn subscribe(&mut self, follower_id: UserId, author_id: UserId) -> Result<()> {
        sqlx::query("INSERT INTO subscriptions (follower_id, author_id) VALUES ($1, $2)")
            .bind(follower_id)
            .bind(author_id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    /// Returns `DbError::NotFound` when the pair does not exist.
    #[instrument(skip(self), err)]
    pub async fn unsubscribe(&mut self, follower_id: UserId, author_id: UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE follower_id = $1 AND author_id = $2")
            .bind(follower_id)
            .bind(author_id)
            .execute(&mut *self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Authors followed by `follower_id`, most recently followed first.
    #[instrument(skip(self), err)]
    pub async fn list_authors(&mut self, follower_id: UserId, skip: i64, limit: i64) -> Result<Vec<UserId>> {
        let rows: Vec<(UserId,)> = sqlx::query_as(
            "SELECT author_id FROM subscriptions WHERE follower_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(follower_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    #[instrument(skip(self), err)]
    pub async fn count_authors(&mut self, follower_id: UserId) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE follower_id = $1")
            .bind(follower_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count.0)
    }

    /// Which of `author_ids` the follower is subscribed to.
    #[instrument(skip(self, author_ids), fields(count = author_ids.len()), err)]
    pub async fn subscribed_among(&mut self, follower_id: UserId, author_ids: &[UserId]) -> Result<HashSet<UserId>> {
        if author_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows: Vec<(UserId,)> = sqlx::query_as("SELECT author_id FROM subscriptions WHERE follower_id = $1 AND author_id = ANY($2)")
            .bind(follower_id)
            .bind(author_ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
