use crate::comments::CommentRepository;
use crate::events::EventRepository;
use crate::pulls::PullRepository;
use crate::reviews::ReviewRepository;
use crate::users::UserRepository;
use crate::PerchError;

pub trait Store {
    type Pulls<'a>: PullRepository
    where
        Self: 'a;
    type Users<'a>: UserRepository
    where
        Self: 'a;
    type Reviews<'a>: ReviewRepository
    where
        Self: 'a;
    type Comments<'a>: CommentRepository
    where
        Self: 'a;
    type Events<'a>: EventRepository
    where
        Self: 'a;

    fn pulls(&self) -> Self::Pulls<'_>;
    fn users(&self) -> Self::Users<'_>;
    fn reviews(&self) -> Self::Reviews<'_>;
    fn comments(&self) -> Self::Comments<'_>;
    fn events(&self) -> Self::Events<'_>;

    fn with_tx<F, T>(&self, f: F) -> Result<T, PerchError>
    where
        F: FnOnce(&Self) -> Result<T, PerchError>;
}
