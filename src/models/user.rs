//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// Role stored on a user record.
///
/// Records written before roles were introduced deserialize as `Patient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Patient,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Email address (also used as document ID)
    pub email: String,
    /// Display name from the sign-in provider
    pub display_name: Option<String>,
    /// Stored role; absent field reads as patient
    #[serde(default)]
    pub role: Role,
    /// When the user first signed in (ISO 8601)
    pub created_at: String,
}
