//! Opaque API tokens. Only the sha256 digest of a key is stored.

use crate::db::errors::Result;
use crate::types::UserId;
use sqlx::PgConnection;
use tracing::instrument;

pub struct AuthTokens<'c> {
    db: &'c mut PgConnection,
}

impl<'c> AuthTokens<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Store `token_hash` as the user's token, replacing any previous one.
    #[instrument(skip(self, token_hash), err)]
    pub async fn issue(&mut self, user_id: UserId, token_hash: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (user_id, token_hash)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET token_hash = EXCLUDED.token_hash, created_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .execute(&mut *self.db)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, token_hash), err)]
    pub async fn find_user(&mut self, token_hash: &str) -> Result<Option<UserId>> {
        let row: Option<(UserId,)> = sqlx::query_as("SELECT user_id FROM auth_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(row.map(|(id,)| id))
    }

    #[instrument(skip(self), err)]
    pub async fn revoke(&mut self, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
