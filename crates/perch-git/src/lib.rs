pub mod backend;
pub mod blame;
pub mod git;
pub mod pipe;
pub mod window;

pub use crate::backend::{DiffContext, GitError};
pub use crate::git::GixContext;

#[cfg(test)]
pub(crate) mod testutil;
