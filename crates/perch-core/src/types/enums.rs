use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ReviewKind {
    Pending,
    Comment,
    Approve,
    Reject,
    RequestChanges,
}

impl ReviewKind {
    /// Terminal kinds are reached exactly once, via submission.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Only verdict reviews can go stale or be dismissed.
    pub fn is_verdict(self) -> bool {
        matches!(self, Self::Approve | Self::Reject)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CommentKind {
    Code,
    Review,
    DismissReview,
}
