use crate::types::enums::{CommentKind, ReviewKind};
use crate::types::ids::{PullId, RepoId, ReviewId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPullInput {
    pub repo_id: RepoId,
    pub index: i64,
    pub author: UserId,
    pub title: String,
    pub base_ref: String,
    pub head_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub handle: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCodeCommentInput {
    pub actor: UserId,
    pub pull_id: PullId,
    pub tree_path: String,
    /// Signed diff line: positive = added/context side, negative = removed.
    pub line: i64,
    pub content: String,
    /// True while the comment is one of a batch that will be submitted as a
    /// review later; suppresses auto-submit and notification.
    pub part_of_batch: bool,
    /// Review a standalone reply attaches to, when the commented line already
    /// carries a submitted review comment.
    pub reply_to: Option<ReviewId>,
    /// Head tip the commenting client was looking at; recorded as the anchor
    /// of a freshly created pending review.
    pub latest_commit_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub pull_id: PullId,
    pub author: UserId,
    pub kind: CommentKind,
    pub tree_path: String,
    pub line: i64,
    pub commit_sha: String,
    pub patch: String,
    pub invalidated: bool,
    pub review_id: Option<ReviewId>,
    pub content: String,
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommentFilter {
    pub pull_id: Option<PullId>,
    pub review_id: Option<ReviewId>,
    pub kind: Option<CommentKind>,
    pub tree_path: Option<String>,
    pub line: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReviewInput {
    pub actor: UserId,
    pub pull_id: PullId,
    pub kind: ReviewKind,
    pub content: String,
    /// Head commit the reviewer evaluated; staleness is judged against the
    /// current tip at submission time.
    pub commit_id: String,
    pub official: bool,
    pub attachments: Vec<String>,
    /// Pending review to finalize. When absent the actor's pending review is
    /// looked up, and submission creates the review directly if none exists.
    pub review_id: Option<ReviewId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismissReviewInput {
    pub review_id: ReviewId,
    /// Guard against cross-repository id confusion.
    pub expected_repo_id: RepoId,
    pub message: String,
    pub actor: UserId,
    pub dismiss: bool,
    pub cascade_priors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReviewFilter {
    pub pull_id: Option<PullId>,
    pub reviewer: Option<UserId>,
    pub kind: Option<ReviewKind>,
    pub dismissed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeReviewInput {
    pub kind: ReviewKind,
    pub content: String,
    pub commit_id: String,
    pub official: bool,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSubmittedReviewInput {
    pub pull_id: PullId,
    pub reviewer: UserId,
    pub kind: ReviewKind,
    pub content: String,
    pub commit_id: String,
    pub official: bool,
    pub stale: bool,
}
