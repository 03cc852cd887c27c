//! Errors raised by the repositories.
//!
//! Postgres constraint failures are surfaced as typed variants so handlers can turn a duplicate
//! favorite or a taken username into a 400 instead of a 500. Everything else collapses into
//! [`DbError::Other`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// No row matched the lookup (or the relation to remove did not exist)
    #[error("Entity not found")]
    NotFound,

    #[error("Unique constraint violation: {message}")]
    UniqueViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// A referenced tag, ingredient, user or recipe does not exist
    #[error("Foreign key constraint violation: {message}")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// e.g. `cooking_time >= 1`, `amount >= 1`, cart `quantity > 0`
    #[error("Check constraint violation: {message}")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DbError {
    /// Name of the violated constraint, if this error came from one.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            DbError::UniqueViolation { constraint, .. }
            | DbError::ForeignKeyViolation { constraint, .. }
            | DbError::CheckViolation { constraint, .. } => constraint.as_deref(),
            DbError::NotFound | DbError::Other(_) => None,
        }
    }

    /// True when this is a unique violation on the named constraint.
    pub fn is_unique_violation_of(&self, name: &str) -> bool {
        matches!(self, DbError::UniqueViolation { .. }) && self.constraint() == Some(name)
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let db_err = match &err {
            sqlx::Error::RowNotFound => return DbError::NotFound,
            sqlx::Error::Database(db_err) => db_err,
            _ => return DbError::Other(err.into()),
        };

        let constraint = db_err.constraint().map(str::to_owned);
        let table = db_err.table().map(str::to_owned);
        let message = db_err.message().to_owned();

        if db_err.is_unique_violation() {
            DbError::UniqueViolation { constraint, table, message }
        } else if db_err.is_foreign_key_violation() {
            DbError::ForeignKeyViolation { constraint, table, message }
        } else if db_err.is_check_violation() {
            DbError::CheckViolation { constraint, table, message }
        } else {
            DbError::Other(err.into())
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn unique(constraint: Option<&str>) -> DbError {
        DbError::UniqueViolation {
            constraint: constraint.map(str::to_owned),
            table: Some("favorites".to_string()),
            message: "duplicate key value".to_string(),
        }
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(DbError::from(sqlx::Error::RowNotFound), DbError::NotFound));
    }

    #[test]
    fn test_non_database_errors_are_other() {
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::Other(_)));
    }

    #[test]
    fn test_unique_violation_matching() {
        assert!(unique(Some("favorites_user_recipe_unique")).is_unique_violation_of("favorites_user_recipe_unique"));
        assert!(!unique(Some("favorites_user_recipe_unique")).is_unique_violation_of("users_email_unique"));
        assert!(!unique(None).is_unique_violation_of("favorites_user_recipe_unique"));

        let check = DbError::CheckViolation {
            constraint: Some("favorites_user_recipe_unique".to_string()),
            table: None,
            message: String::new(),
        };
        assert!(!check.is_unique_violation_of("favorites_user_recipe_unique"));
        assert_eq!(check.constraint(), Some("favorites_user_recipe_unique"));
        assert_eq!(DbError::NotFound.constraint(), None);
    }
}
