use crate::types::enums::ReviewKind;
use perch_git::GitError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PullError {
    #[error("pull not found")]
    PullNotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    UserNotFound,
    #[error("handle already taken: {handle}")]
    HandleTaken { handle: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("review not found")]
    ReviewNotFound,
    #[error("review is not a verdict: {kind:?}")]
    InvalidReviewKind { kind: ReviewKind },
    #[error("review belongs to another repository")]
    RepositoryMismatch,
    #[error("review already submitted")]
    AlreadyTerminal,
    #[error("review needs a body or at least one code comment")]
    ContentEmpty,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("comment not found")]
    CommentNotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

#[derive(Debug, Error)]
pub enum MentionError {
    #[error("mention lookup failed: {message}")]
    LookupFailed { message: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config read failed: {message}")]
    ReadFailed { message: String },
    #[error("config parse failed: {message}")]
    ParseFailed { message: String },
}

#[derive(Debug, Error)]
pub enum PerchError {
    #[error(transparent)]
    Pull(#[from] PullError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Comment(#[from] CommentError),
    #[error(transparent)]
    Mention(#[from] MentionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("internal error: {message}")]
    Internal { message: String },
}
