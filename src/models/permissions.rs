//! Capability codes granted to accounts.

use serde::Serialize;

/// The set of capability codes held by one account.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PermissionSet(Vec<String>);

impl PermissionSet {
    pub fn new(codes: Vec<String>) -> Self {
        Self(codes)
    }

    /// Membership test used by the authorization gate.
    pub fn includes(&self, code: &str) -> bool {
        self.0.iter().any(|c| c == code)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
