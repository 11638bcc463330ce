pub mod comment_repo;
pub mod event_repo;
pub mod pull_repo;
pub mod review_repo;
pub mod schema;
pub mod store;
pub mod user_repo;
pub mod util;

pub use crate::store::DbStore;
