use crate::error::UserError;
use crate::types::{CreateUserInput, User, UserId};

pub trait UserRepository {
    fn create(&self, input: CreateUserInput) -> Result<User, UserError>;
    fn get(&self, id: &UserId) -> Result<Option<User>, UserError>;
    fn get_by_handle(&self, handle: &str) -> Result<Option<User>, UserError>;
}
