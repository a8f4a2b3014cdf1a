//! Opaque API tokens.
//!
//! A token is a 26-character plaintext handed to the client once; only its
//! SHA-256 hash is kept at rest. Each token carries a scope and an expiry.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::validator::Validator;

/// What a token is good for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    Activation,
    Authentication,
}

/// Alphabet used for plaintext generation (Crockford base32: no I, L, O, U).
const TOKEN_ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Length of every generated plaintext.
pub const TOKEN_LENGTH: usize = 26;

/// A freshly issued token. The plaintext exists only in this value and in
/// the response that delivers it; stores keep the hash.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip_serializing)]
    pub hash: [u8; 32],
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub scope: TokenScope,
}

impl Token {
    /// Generate a new random token for `user_id`, valid for `ttl`.
    pub fn generate(user_id: i64, ttl: Duration, scope: TokenScope) -> Self {
        let mut rng = rand::thread_rng();
        let plaintext: String = (0..TOKEN_LENGTH)
            .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
            .collect();
        Self {
            hash: hash_plaintext(&plaintext),
            plaintext,
            user_id,
            expiry: Utc::now() + ttl,
            scope,
        }
    }
}

/// Hash a plaintext the way stores index tokens.
pub fn hash_plaintext(plaintext: &str) -> [u8; 32] {
    Sha256::digest(plaintext.as_bytes()).into()
}

/// Structural check applied before any store lookup: a credential that is
/// not 26 characters from the generation alphabet cannot be a token.
pub fn plaintext_is_well_formed(plaintext: &str) -> bool {
    plaintext.len() == TOKEN_LENGTH
        && plaintext.bytes().all(|b| TOKEN_ALPHABET.contains(&b))
}

/// Validator-style variant used by handlers that receive a token in a body.
pub fn validate_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "token", "must be provided");
    v.check(
        plaintext.len() == TOKEN_LENGTH,
        "token",
        "must be 26 bytes long",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_plaintext_is_well_formed() {
        let token = Token::generate(1, Duration::hours(24), TokenScope::Authentication);
        assert!(plaintext_is_well_formed(&token.plaintext));
        assert_eq!(token.hash, hash_plaintext(&token.plaintext));
    }

    #[test]
    fn generated_plaintexts_differ() {
        let a = Token::generate(1, Duration::hours(1), TokenScope::Activation);
        let b = Token::generate(1, Duration::hours(1), TokenScope::Activation);
        assert_ne!(a.plaintext, b.plaintext);
    }

    #[test]
    fn malformed_plaintexts_are_rejected() {
        assert!(!plaintext_is_well_formed(""));
        assert!(!plaintext_is_well_formed("short"));
        // Right length, excluded letter.
        assert!(!plaintext_is_well_formed(&"I".repeat(TOKEN_LENGTH)));
        // Right length, lowercase.
        assert!(!plaintext_is_well_formed(&"a".repeat(TOKEN_LENGTH)));
    }

    #[test]
    fn serialization_exposes_plaintext_and_expiry_only() {
        let token = Token::generate(7, Duration::hours(1), TokenScope::Authentication);
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["token"], token.plaintext);
        assert!(value.get("expiry").is_some());
        assert!(value.get("hash").is_none());
        assert!(value.get("user_id").is_none());
    }

    #[test]
    fn body_validation_reports_length() {
        let mut v = Validator::new();
        validate_plaintext(&mut v, "abc");
        let errors = v.into_errors();
        assert_eq!(errors.get("token").map(String::as_str), Some("must be 26 bytes long"));
    }
}
