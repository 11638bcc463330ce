use crate::error::CommentError;
use crate::types::{Comment, CommentFilter, CreateCommentInput, PullId, ReviewId};

pub trait CommentRepository {
    fn create(&self, input: CreateCommentInput) -> Result<Comment, CommentError>;

    fn list(&self, filter: CommentFilter) -> Result<Vec<Comment>, CommentError>;

    /// Oldest comment at (review, path, line); its anchor triple is reused by
    /// every later comment on the same spot.
    fn first_at_anchor(
        &self,
        review_id: &ReviewId,
        tree_path: &str,
        line: i64,
    ) -> Result<Option<Comment>, CommentError>;

    /// Whether any comment of an already-submitted review sits at the given
    /// file and line of the pull. Decides reply vs new-review placement.
    fn exists_on_submitted_review(
        &self,
        pull_id: &PullId,
        tree_path: &str,
        line: i64,
    ) -> Result<bool, CommentError>;
}
