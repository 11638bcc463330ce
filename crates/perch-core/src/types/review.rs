use crate::types::enums::ReviewKind;
use crate::types::ids::{PullId, ReviewId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub pull_id: PullId,
    pub reviewer: UserId,
    pub kind: ReviewKind,
    /// Head commit the reviewer evaluated. Empty until known.
    pub commit_id: String,
    pub content: String,
    pub official: bool,
    pub dismissed: bool,
    pub stale: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
