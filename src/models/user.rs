use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored user record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// System-generated identifier
    pub id: Uuid,
    /// Unique login name (case-sensitive)
    pub username: String,
    /// bcrypt hash, never the clear-text password
    pub password_hash: String,
    /// Role labels, always at least one
    pub roles: Vec<String>,
    /// Whether the account is active
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Internal revision counter, bumped on every update
    pub version: u64,
}

impl User {
    /// New users start active with both timestamps equal.
    pub fn new(username: String, password_hash: String, roles: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            roles,
            active: true,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// A copy with the mutable fields replaced, `updated_at` refreshed and
    /// the revision counter bumped. Identity and `created_at` never change.
    pub fn with_update(
        &self,
        username: String,
        password_hash: String,
        roles: Vec<String>,
        active: bool,
    ) -> Self {
        Self {
            id: self.id,
            username,
            password_hash,
            roles,
            active,
            created_at: self.created_at,
            updated_at: Utc::now(),
            version: self.version + 1,
        }
    }
}

/// Wire projection of a user: the password hash and the revision counter
/// stay internal.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub roles: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            roles: user.roles.clone(),
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
