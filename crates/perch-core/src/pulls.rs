use crate::error::PullError;
use crate::types::{Pull, PullId};

pub trait PullRepository {
    fn create(&self, pull: Pull) -> Result<Pull, PullError>;
    fn get(&self, id: &PullId) -> Result<Option<Pull>, PullError>;
    fn list(&self) -> Result<Vec<Pull>, PullError>;
}
