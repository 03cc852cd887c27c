use crate::db::errors::DbError;
use crate::types::Operation;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

/// Field name to list of messages, the body of a 400 validation response.
///
/// Non-field problems are reported under `non_field_errors`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was collected, otherwise a validation error carrying every message.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() { Ok(()) } else { Err(Error::Validation(self)) }
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            for e in errs {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", e.code));
                out.add(field.to_string(), message);
            }
        }
        out
    }
}

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Caller is neither the owner nor staff
    #[error("Not allowed to {action} {resource}")]
    Forbidden { action: Operation, resource: String },

    /// One or more request fields failed validation
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    /// A user tried to follow themselves
    #[error("{message}")]
    SelfReference { message: String },

    /// Duplicate favorite, cart entry or subscription
    #[error("{message}")]
    AlreadyExists { message: String },

    /// Removing a favorite, cart entry or subscription that is not there
    #[error("{message}")]
    RelationNotFound { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.into())
    }
}

const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Place a serde deserialization message under the field it names.
///
/// `ingredients[0].amount: invalid type ...` goes under `ingredients`, a root-level
/// ``missing field `x` `` under `x`, anything else under `non_field_errors`.
fn deserialize_errors(detail: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let (path, message) = match detail.split_once(": ") {
        Some((path, rest)) if is_field_path(path) => (Some(path), rest),
        _ => (None, detail),
    };

    match path {
        Some(path) => {
            let field = path.split(['.', '[']).next().unwrap_or(path);
            let message = if field == path { message.to_string() } else { format!("{path}: {message}") };
            errors.add(field, message);
        }
        None => match message.strip_prefix("missing field `").and_then(|rest| rest.split_once('`')) {
            Some((field, _)) => errors.add(field, "This field is required."),
            None => errors.add(NON_FIELD_ERRORS, message),
        },
    }
    errors
}

fn is_field_path(path: &str) -> bool {
    path.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && path.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

/// Drop axum's "Failed to deserialize ...: " lead-in.
fn rejection_detail(body_text: &str) -> &str {
    body_text.split_once(": ").map_or(body_text, |(_, detail)| detail)
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        let body_text = rejection.body_text();
        let errors = match rejection {
            JsonRejection::JsonDataError(_) => deserialize_errors(rejection_detail(&body_text)),
            _ => {
                let mut errors = FieldErrors::new();
                errors.add(NON_FIELD_ERRORS, body_text);
                errors
            }
        };
        Error::Validation(errors)
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::Validation(deserialize_errors(rejection_detail(&rejection.body_text())))
    }
}

impl From<axum_extra::extract::QueryRejection> for Error {
    fn from(rejection: axum_extra::extract::QueryRejection) -> Self {
        Error::Validation(deserialize_errors(rejection_detail(&rejection.body_text())))
    }
}

/// Field and message for unique constraints a client can trip over.
fn unique_violation_field(constraint: Option<&str>) -> Option<(&'static str, &'static str)> {
    match constraint? {
        "users_email_unique" => Some(("email", "A user with this email already exists.")),
        "users_username_unique" => Some(("username", "A user with this username already exists.")),
        "tags_name_unique" => Some(("name", "A tag with this name already exists.")),
        "tags_slug_unique" => Some(("slug", "A tag with this slug already exists.")),
        _ => None,
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::Validation(_)
            | Error::SelfReference { .. }
            | Error::AlreadyExists { .. }
            | Error::RelationNotFound { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message
                .clone()
                .unwrap_or_else(|| "Authentication credentials were not provided.".to_string()),
            Error::Forbidden { action, resource } => {
                format!("You do not have permission to {action} this {resource}.")
            }
            Error::Validation(_) => "Invalid input.".to_string(),
            Error::SelfReference { message }
            | Error::AlreadyExists { message }
            | Error::RelationNotFound { message } => message.clone(),
            Error::NotFound { resource, id } => {
                format!("{resource} with ID {id} not found")
            }
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Not found.".to_string(),
                DbError::UniqueViolation { constraint, .. } => unique_violation_field(constraint.as_deref())
                    .map(|(_, message)| message.to_string())
                    .unwrap_or_else(|| "Resource already exists".to_string()),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Internal server error".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::Forbidden { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            _ => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        let body = match &self {
            Error::Validation(fields) => json!({ "errors": fields }),
            Error::Database(DbError::UniqueViolation { constraint, .. }) => match unique_violation_field(constraint.as_deref()) {
                Some((field, message)) => json!({ "errors": { field: [message] } }),
                None => json!({ "errors": self.user_message() }),
            },
            _ if status == StatusCode::BAD_REQUEST => json!({ "errors": self.user_message() }),
            _ => json!({ "detail": self.user_message() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(error: Error) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_field_errors_collects_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("cooking_time", "Must be at least 1");
        errors.add("tags", "Tag 9 does not exist");
        errors.add("tags", "Duplicate tag 2");

        assert_eq!(errors.get("tags").unwrap().len(), 2);
        assert!(errors.get("name").is_none());
        assert!(matches!(errors.into_result(), Err(Error::Validation(_))));
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_deserialize_errors_by_field() {
        let nested = deserialize_errors("ingredients[0].amount: invalid type: string \"two\", expected i32 at line 1 column 40");
        assert_eq!(
            nested.get("ingredients").unwrap(),
            ["ingredients[0].amount: invalid type: string \"two\", expected i32 at line 1 column 40"]
        );

        let missing = deserialize_errors("missing field `cooking_time` at line 1 column 120");
        assert_eq!(missing.get("cooking_time").unwrap(), ["This field is required."]);

        let query = deserialize_errors("quantity: Invalid decimal: unknown character");
        assert_eq!(query.get("quantity").unwrap(), ["Invalid decimal: unknown character"]);

        let root = deserialize_errors("invalid type: sequence, expected struct RecipeCreate at line 1 column 1");
        assert_eq!(
            root.get("non_field_errors").unwrap(),
            ["invalid type: sequence, expected struct RecipeCreate at line 1 column 1"]
        );
    }

    #[test]
    fn test_rejection_detail_strips_lead_in() {
        assert_eq!(
            rejection_detail("Failed to deserialize query string: quantity: Invalid decimal"),
            "quantity: Invalid decimal"
        );
        assert_eq!(rejection_detail("no lead-in"), "no lead-in");
    }

    #[tokio::test]
    async fn test_validation_body_is_field_map() {
        let mut errors = FieldErrors::new();
        errors.add("amount", "Must be at least 1");
        let (status, body) = body_json(Error::Validation(errors)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["amount"][0], "Must be at least 1");
    }

    #[tokio::test]
    async fn test_relationship_errors_are_bad_request() {
        for error in [
            Error::SelfReference { message: "self".into() },
            Error::AlreadyExists { message: "dup".into() },
            Error::RelationNotFound { message: "gone".into() },
        ] {
            let (status, body) = body_json(error).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["errors"].is_string());
        }
    }

    #[tokio::test]
    async fn test_unique_violation_maps_to_field() {
        let error = Error::Database(DbError::UniqueViolation {
            constraint: Some("users_email_unique".into()),
            table: Some("users".into()),
            message: "duplicate key".into(),
        });
        let (status, body) = body_json(error).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["email"][0], "A user with this email already exists.");
    }

    #[tokio::test]
    async fn test_forbidden_and_not_found_use_detail() {
        let (status, body) = body_json(Error::Forbidden {
            action: Operation::Update,
            resource: "recipe".into(),
        })
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"], "You do not have permission to update this recipe.");

        let (status, body) = body_json(Error::NotFound {
            resource: "Recipe".into(),
            id: "7".into(),
        })
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Recipe with ID 7 not found");
    }

    #[tokio::test]
    async fn test_internal_errors_do_not_leak() {
        let (status, body) = body_json(Error::Other(anyhow::anyhow!("connection refused on 10.0.0.3"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
    }
}
