use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ROLE_READ: &str = "read";
pub const ROLE_WRITE: &str = "write";

/// Site account. The password never leaves the server: serialization skips
/// it, so a `User` can be returned from a handler as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: &str, password: &str, role: &str) -> Self {
        let now = Utc::now();
        User {
            id: 0,
            username: username.to_string(),
            password: password.to_string(),
            role: role.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_write_access(&self) -> bool {
        self.role == ROLE_WRITE
    }
}

pub fn is_valid_role(role: &str) -> bool {
    role == ROLE_READ || role == ROLE_WRITE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_never_serializes() {
        let user = User::new("chefe", "s3cret", ROLE_WRITE);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(!json.contains("password"));
        assert!(json.contains("\"username\":\"chefe\""));
    }

    #[test]
    fn role_validation() {
        assert!(is_valid_role(ROLE_READ));
        assert!(is_valid_role(ROLE_WRITE));
        assert!(!is_valid_role("admin"));
        assert!(!is_valid_role(""));

        assert!(User::new("a", "b", ROLE_WRITE).has_write_access());
        assert!(!User::new("a", "b", ROLE_READ).has_write_access());
    }
}
