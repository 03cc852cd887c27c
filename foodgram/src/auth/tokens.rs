//! Opaque API tokens.
//!
//! A token is 32 random bytes, base64url encoded, handed to the client once. The database
//! stores only its sha256 digest, so a leaked table does not leak usable tokens.

use base64::{Engine as _, engine::general_purpose};
use rand::prelude::RngExt;
use rand::rng;
use sha2::{Digest, Sha256};

/// Generate a fresh token key.
pub fn generate_token() -> String {
    let mut key_bytes = [0u8; 32];
    rng().fill(&mut key_bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(key_bytes)
}

/// Digest stored in `auth_tokens.token_hash`.
pub fn token_digest(token: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token() {
        let token1 = generate_token();
        let token2 = generate_token();

        assert_ne!(token1, token2);
        assert_eq!(token1.len(), 43);
        assert!(token1.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_digest_is_stable_and_distinct() {
        assert_eq!(token_digest("abc"), token_digest("abc"));
        assert_ne!(token_digest("abc"), token_digest("abd"));
        assert_ne!(token_digest("abc"), "abc");
    }
}
