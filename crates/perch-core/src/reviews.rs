use crate::error::ReviewError;
use crate::types::{
    CreateSubmittedReviewInput, FinalizeReviewInput, PullId, Review, ReviewFilter, ReviewId, UserId,
};

pub trait ReviewRepository {
    fn get(&self, id: &ReviewId) -> Result<Option<Review>, ReviewError>;

    /// The reviewer's open pending review on the pull, if any.
    fn get_pending(&self, pull_id: &PullId, reviewer: &UserId)
        -> Result<Option<Review>, ReviewError>;

    /// Find-or-create under the one-pending-per-(pull, reviewer) uniqueness
    /// constraint. A fresh review records `commit_id` as its anchor; an
    /// existing one is returned untouched.
    fn get_or_create_pending(
        &self,
        pull_id: &PullId,
        reviewer: &UserId,
        commit_id: &str,
    ) -> Result<Review, ReviewError>;

    fn list(&self, filter: ReviewFilter) -> Result<Vec<Review>, ReviewError>;

    /// Transition a pending review into its terminal kind. Exactly-once: a
    /// review that is already terminal fails with `AlreadyTerminal` and is
    /// left unchanged.
    fn finalize(&self, id: &ReviewId, input: FinalizeReviewInput) -> Result<Review, ReviewError>;

    /// Create a review directly in a terminal kind, for submissions with no
    /// prior pending review.
    fn create_submitted(&self, input: CreateSubmittedReviewInput) -> Result<Review, ReviewError>;

    fn set_dismissed(&self, id: &ReviewId, dismissed: bool) -> Result<Review, ReviewError>;
}
