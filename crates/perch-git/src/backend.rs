use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("repo not found")]
    RepoNotFound,
    #[error("path not found: {path}")]
    PathNotFound { path: String },
    #[error("file {path} has only {lines} lines")]
    InsufficientLines { path: String, lines: u32 },
    #[error("ref not found: {name}")]
    RefNotFound { name: String },
    #[error("no shared history between {base} and {head}")]
    DiffUnavailable { base: String, head: String },
    #[error("backend error: {reason}")]
    BackendError { reason: String },
}

/// Read-only view of one git repository, scoped to what review anchoring
/// needs. `rev` arguments accept either a full commit hash or a ref name.
pub trait DiffContext {
    /// Commit that introduced `line` of `tree_path`, walking first parents
    /// back from `rev`. Lines are 1-based.
    fn line_owner(&self, rev: &str, tree_path: &str, line: u32) -> Result<String, GitError>;

    /// Unified diff of `tree_path` between `base` and `head`, trimmed to a
    /// window of at most `context_lines` rows either side of `line`.
    fn patch_around_line(
        &self,
        base: &str,
        head: &str,
        tree_path: &str,
        line: u32,
        old_side: bool,
        context_lines: u32,
    ) -> Result<String, GitError>;

    fn ref_tip(&self, rev: &str) -> Result<String, GitError>;

    fn merge_base(&self, a: &str, b: &str) -> Result<String, GitError>;

    /// Whether the change set a pull carries differs between two of its head
    /// commits, each judged against its own merge base with `base_ref`.
    fn content_changed(
        &self,
        base_ref: &str,
        old_commit: &str,
        new_commit: &str,
    ) -> Result<bool, GitError>;
}
