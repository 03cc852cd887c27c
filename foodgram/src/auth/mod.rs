//! Authentication and authorization.
//!
//! Clients log in with email and password at `/api/auth/token/login/` and receive an opaque
//! token, sent back as `Authorization: Token <key>`. Each user holds at most one token; logging
//! in again rotates it and logging out deletes it.
//!
//! - [`current_user`]: `CurrentUser` / `Option<CurrentUser>` extractors
//! - [`password`]: Argon2id hashing
//! - [`permissions`]: staff and ownership checks
//! - [`tokens`]: token generation and digests

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod tokens;
