//! Body and query extractors whose rejections go through [`Error`].
//!
//! axum's own `Json` and `Query` answer a malformed request with a plain-text 400/422. These
//! wrappers deserialize the same way but reject with [`Error::Validation`], so clients always get
//! the `{"errors": {...}}` body.

use crate::errors::Error;
use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// JSON request body. Also usable as a response, like `axum::Json`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct Query<T>(pub T);

/// Query string where a key may repeat (`?tags=a&tags=b`).
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum_extra::extract::Query), rejection(Error))]
pub struct MultiQuery<T>(pub T);
