//! Access rules.
//!
//! Catalog writes (tags, ingredients) need a staff account. Recipes may be changed by their
//! author or by staff.

use crate::{
    AppState,
    api::models::users::CurrentUser,
    errors::{Error, Result},
    types::{Operation, UserId},
};
use axum::{extract::FromRequestParts, http::request::Parts};

/// An authenticated caller with `is_staff` set.
#[derive(Debug, Clone)]
pub struct StaffUser(pub CurrentUser);

impl FromRequestParts<AppState> for StaffUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = <CurrentUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await?;
        if !user.is_staff {
            let action = match parts.method {
                axum::http::Method::POST => Operation::Create,
                axum::http::Method::DELETE => Operation::Delete,
                _ => Operation::Update,
            };
            return Err(Error::Forbidden {
                action,
                resource: "resource".to_string(),
            });
        }
        Ok(StaffUser(user))
    }
}

/// `Forbidden` unless `user` owns the resource or is staff.
pub fn ensure_owner_or_staff(user: &CurrentUser, owner_id: UserId, action: Operation, resource: &str) -> Result<()> {
    if user.is_staff || user.id == owner_id {
        Ok(())
    } else {
        Err(Error::Forbidden {
            action,
            resource: resource.to_string(),
        })
    }
}
