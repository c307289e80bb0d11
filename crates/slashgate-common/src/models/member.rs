//! Guild member as delivered inside interactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::permissions::Permissions;
use crate::snowflake::Snowflake;
use crate::models::user::User;

/// A user's membership in a guild. `user` is absent on members inside
/// resolved data, where the user lives in the sibling `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
    /// Effective permissions in the invoking channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

impl Member {
    pub fn has_role(&self, role: Snowflake) -> bool {
        self.roles.contains(&role)
    }
}
