//! Credentials
//!
//! Username/password pair guarding feed writes.

use std::fmt;

/// Credentials a client must present to post
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Check a presented pair; both fields are always compared
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let username_matches = constant_time_eq(self.username.as_bytes(), username.as_bytes());
        let password_matches = constant_time_eq(self.password.as_bytes(), password.as_bytes());
        username_matches & password_matches
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Compare without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
