pub mod comments;
pub mod config;
pub mod error;
pub mod events;
pub mod mentions;
pub mod perch;
pub mod pulls;
pub mod reviews;
pub mod store;
pub mod users;

pub mod types;

pub use crate::config::Config;
pub use crate::error::PerchError;
pub use crate::perch::{Perch, RequestContext};
pub use crate::store::Store;
