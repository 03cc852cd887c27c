//! Extractors for the authenticated caller.
//!
//! `CurrentUser` rejects requests without valid credentials. `Option<CurrentUser>` lets
//! anonymous requests through but still rejects a header carrying an unknown token.

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::tokens::token_digest,
    db::{
        errors::DbError,
        handlers::{AuthTokens, Repository, Users},
    },
    errors::{Error, Result},
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use sqlx::PgPool;
use tracing::{debug, instrument, trace};

const TOKEN_PREFIXES: &[&str] = &["Token ", "Bearer "];

fn invalid_token() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid token.".to_string()),
    }
}

/// Resolve the user from an `Authorization: Token <key>` (or `Bearer <key>`) header.
/// Returns:
/// - None: no token header present
/// - Some(Ok(user)): token matched a user
/// - Some(Err(error)): a token was presented but is malformed or unknown
#[instrument(skip(parts, db))]
async fn try_token_auth(parts: &Parts, db: &PgPool) -> Option<Result<CurrentUser>> {
    let auth_header = parts.headers.get(axum::http::header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::Unauthenticated {
                message: Some(format!("Invalid authorization header: {e}")),
            }));
        }
    };

    let key = TOKEN_PREFIXES.iter().find_map(|prefix| auth_str.strip_prefix(prefix))?.trim();
    if key.is_empty() {
        return Some(Err(invalid_token()));
    }

    let mut conn = match db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };

    let user_id = match AuthTokens::new(&mut conn).find_user(&token_digest(key)).await {
        Ok(Some(id)) => id,
        Ok(None) => return Some(Err(invalid_token())),
        Err(e) => return Some(Err(e.into())),
    };

    match Users::new(&mut conn).get_by_id(user_id).await {
        Ok(Some(user)) => Some(Ok(CurrentUser::from(user))),
        Ok(None) => Some(Err(invalid_token())),
        Err(e) => Some(Err(e.into())),
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match try_token_auth(parts, &state.db).await {
            Some(Ok(user)) => {
                debug!("Authenticated user {}", user.id);
                Ok(user)
            }
            Some(Err(e)) => {
                trace!("Token authentication failed: {:?}", e);
                Err(e)
            }
            None => {
                trace!("No authentication credentials found in request");
                Err(Error::Unauthenticated { message: None })
            }
        }
    }
}

impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Option<Self>> {
        try_token_auth(parts, &state.db).await.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_state, create_test_user, issue_test_token};
    use axum::http::Request;
    use sqlx::PgPool;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/users/me/");
        if let Some(value) = value {
            builder = builder.header("authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_token_and_bearer_prefixes(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let token = issue_test_token(&pool, user.id).await;
        let state = create_test_state(pool);

        for header in [format!("Token {token}"), format!("Bearer {token}")] {
            let mut parts = parts_with_auth(Some(&header));
            let current = <CurrentUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &state)
                .await
                .unwrap();
            assert_eq!(current.id, user.id);
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_missing_header_is_unauthenticated(pool: PgPool) {
        let state = create_test_state(pool);
        let mut parts = parts_with_auth(None);

        let result = <CurrentUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(Error::Unauthenticated { message: None })));

        let optional = <CurrentUser as OptionalFromRequestParts<AppState>>::from_request_parts(&mut parts, &state).await;
        assert!(matches!(optional, Ok(None)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_token_rejected_even_when_optional(pool: PgPool) {
        let state = create_test_state(pool);
        let mut parts = parts_with_auth(Some("Token not-a-real-token"));

        let optional = <CurrentUser as OptionalFromRequestParts<AppState>>::from_request_parts(&mut parts, &state).await;
        assert!(matches!(optional, Err(Error::Unauthenticated { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_other_schemes_are_ignored(pool: PgPool) {
        let state = create_test_state(pool);
        let mut parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));

        let optional = <CurrentUser as OptionalFromRequestParts<AppState>>::from_request_parts(&mut parts, &state).await;
        assert!(matches!(optional, Ok(None)));
    }
}
