//! User accounts and credential handling.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::validator::{looks_like_email, Validator};

/// A registered account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: PasswordHash,
    pub activated: bool,
    #[serde(skip_serializing)]
    pub version: i32,
}

impl User {
    /// A not-yet-stored account; the store assigns id, timestamps, version.
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: 0,
            created_at: Utc::now(),
            name,
            email,
            password: PasswordHash::default(),
            activated: false,
            version: 0,
        }
    }
}

/// Salted digest of an account password.
///
/// The hashing scheme is a seam: the pipeline only ever calls
/// `set`/`matches`, so swapping the algorithm stays local to this type.
#[derive(Debug, Clone, Default)]
pub struct PasswordHash {
    salt: [u8; 16],
    digest: [u8; 32],
}

impl PasswordHash {
    pub fn set(&mut self, plaintext: &str) {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        self.salt = salt;
        self.digest = Self::digest_with_salt(&salt, plaintext);
    }

    pub fn matches(&self, plaintext: &str) -> bool {
        Self::digest_with_salt(&self.salt, plaintext) == self.digest
    }

    fn digest_with_salt(salt: &[u8; 16], plaintext: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(plaintext.as_bytes());
        hasher.finalize().into()
    }
}

pub fn validate_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(looks_like_email(email), "email", "must be a valid email address");
}

pub fn validate_password_plaintext(v: &mut Validator, password: &str) {
    v.check(!password.is_empty(), "password", "must be provided");
    v.check(password.len() >= 8, "password", "must be at least 8 bytes long");
    v.check(
        password.len() <= 72,
        "password",
        "must not be more than 72 bytes long",
    );
}

pub fn validate_user(v: &mut Validator, user: &User) {
    v.check(!user.name.is_empty(), "name", "must be provided");
    v.check(
        user.name.len() <= 500,
        "name",
        "must not be more than 500 bytes long",
    );
    validate_email(v, &user.email);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let mut hash = PasswordHash::default();
        hash.set("correct horse battery");
        assert!(hash.matches("correct horse battery"));
        assert!(!hash.matches("correct horse batteries"));
    }

    #[test]
    fn identical_passwords_get_distinct_salts() {
        let mut a = PasswordHash::default();
        let mut b = PasswordHash::default();
        a.set("pa55word!");
        b.set("pa55word!");
        assert_ne!(a.salt, b.salt);
    }

    #[test]
    fn user_serialization_hides_credentials() {
        let mut user = User::new("Grace".to_string(), "grace@example.com".to_string());
        user.password.set("pa55word!");
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password").is_none());
        assert!(value.get("version").is_none());
        assert_eq!(value["email"], "grace@example.com");
        assert_eq!(value["activated"], false);
    }

    #[test]
    fn password_rules() {
        let mut v = Validator::new();
        validate_password_plaintext(&mut v, "short");
        assert!(!v.is_valid());

        let mut v = Validator::new();
        validate_password_plaintext(&mut v, &"x".repeat(73));
        assert!(!v.is_valid());

        let mut v = Validator::new();
        validate_password_plaintext(&mut v, "long enough");
        assert!(v.is_valid());
    }
}
