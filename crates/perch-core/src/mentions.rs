use crate::error::{MentionError, UserError};
use crate::types::{User, UserId};
use crate::users::UserRepository;
use regex::Regex;
use std::sync::OnceLock;

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|[^\w@])@([A-Za-z0-9][A-Za-z0-9_-]*)").expect("valid regex"))
}

/// Handles mentioned in `text`, first occurrence order, deduplicated.
pub fn extract_handles(text: &str) -> Vec<String> {
    let mut handles = Vec::new();
    for capture in mention_re().captures_iter(text) {
        let handle = capture[1].to_string();
        if !handles.contains(&handle) {
            handles.push(handle);
        }
    }
    handles
}

/// Resolve `@handle` mentions in `text` against the user store. Unknown
/// handles are not mentions and drop out; the author never mentions
/// themselves. Store failures surface as `MentionError`.
pub fn resolve<R: UserRepository>(
    users: &R,
    actor: &UserId,
    text: &str,
) -> Result<Vec<User>, MentionError> {
    let mut resolved = Vec::new();
    for handle in extract_handles(text) {
        let user = users.get_by_handle(&handle).map_err(|err: UserError| {
            MentionError::LookupFailed {
                message: err.to_string(),
            }
        })?;
        if let Some(user) = user {
            if &user.id != actor {
                resolved.push(user);
            }
        }
    }
    Ok(resolved)
}
