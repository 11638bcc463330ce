use crate::types::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Unique mention handle, without the leading `@`.
    pub handle: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}
