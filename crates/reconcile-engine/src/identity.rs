//! Supplier identity passed to every reconciliation entry point.

/// The authenticated supplier a reconciliation pass runs for.
///
/// One explicit parameter struct for all entry points; construction
/// normalizes the email so every query and write converges on the
/// same canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierIdentity {
    pub user_id: String,
    pub email: String,
}

impl SupplierIdentity {
    /// Builds an identity, trimming and lowercasing the email.
    pub fn new(user_id: impl Into<String>, email: &str) -> Self {
        Self {
            user_id: user_id.into(),
            email: normalize_email(email),
        }
    }
}

/// Canonical email form used for matching across tables.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
