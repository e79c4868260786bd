use serde::{Deserialize, Serialize};

/// Profile returned by `GET /users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl UserProfile {
    /// Short label for status lines, e.g. `admin (superuser)`
    pub fn display_name(&self) -> String {
        if self.is_superuser {
            format!("{} (superuser)", self.username)
        } else {
            self.username.clone()
        }
    }
}
