use crate::types::enums::CommentKind;
use crate::types::ids::{CommentId, PullId, ReviewId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub pull_id: PullId,
    pub author: UserId,
    pub kind: CommentKind,
    pub tree_path: String,
    /// Positive = added/context side, negative = removed side, 0 = no line.
    pub line: i64,
    /// Commit that owns the commented line at comment time. Empty when blame
    /// degraded.
    pub commit_sha: String,
    /// Bounded unified-diff snippet around the commented line.
    pub patch: String,
    /// Set once the underlying diff line no longer exists after a rebase.
    pub invalidated: bool,
    pub review_id: Option<ReviewId>,
    pub content: String,
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// The 1-based line number stripped of its diff-side sign.
    pub fn unsigned_line(&self) -> u32 {
        u32::try_from(self.line.unsigned_abs()).unwrap_or(u32::MAX)
    }

    pub fn is_removed_side(&self) -> bool {
        self.line < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::enums::CommentKind;
    use chrono::Utc;

    fn comment(line: i64) -> Comment {
        Comment {
            id: CommentId::generate(),
            pull_id: PullId::generate(),
            author: UserId::generate(),
            kind: CommentKind::Code,
            tree_path: "src/lib.rs".to_string(),
            line,
            commit_sha: String::new(),
            patch: String::new(),
            invalidated: false,
            review_id: None,
            content: String::new(),
            attachments: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_unsigned_line_strips_sign() {
        assert_eq!(comment(10).unsigned_line(), 10);
        assert_eq!(comment(-10).unsigned_line(), 10);
        assert!(!comment(10).is_removed_side());
        assert!(comment(-10).is_removed_side());
    }
}
