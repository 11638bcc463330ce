use crate::types::ids::{PullId, RepoId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pull {
    pub id: PullId,
    pub repo_id: RepoId,
    pub index: i64,
    pub author: UserId,
    pub title: String,
    pub base_ref: String,
    pub head_ref: String,
    /// Merge base of `base_ref` and `head_ref`, resolved at registration.
    pub merge_base: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
