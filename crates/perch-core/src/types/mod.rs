pub mod comment;
pub mod enums;
pub mod event;
pub mod ids;
pub mod io;
pub mod pull;
pub mod review;
pub mod user;

pub use comment::Comment;
pub use enums::{CommentKind, ReviewKind};
pub use event::EventBody;
pub use ids::{CommentId, IdError, PullId, RepoId, ReviewId, UserId};
pub use io::{
    CommentFilter, CreateCodeCommentInput, CreateCommentInput, CreateSubmittedReviewInput,
    CreateUserInput, DismissReviewInput, FinalizeReviewInput, RegisterPullInput, ReviewFilter,
    SubmitReviewInput,
};
pub use pull::Pull;
pub use review::Review;
pub use user::User;
