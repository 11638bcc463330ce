use crate::types::comment::Comment;
use crate::types::pull::Pull;
use crate::types::review::Review;
use crate::types::ids::UserId;
use crate::types::user::User;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventBody {
    PullRegistered {
        pull: Pull,
    },
    UserCreated {
        user: User,
    },

    /// A standalone reply became visible.
    CommentCreated {
        comment: Comment,
        mentions: Vec<User>,
    },
    /// A code comment became visible, at review submission time.
    CodeCommentCreated {
        comment: Comment,
        mentions: Vec<User>,
    },
    ReviewSubmitted {
        review: Review,
        summary: Comment,
        mentions: Vec<User>,
    },
    ReviewDismissed {
        actor: UserId,
        review: Review,
        comment: Comment,
    },
}
