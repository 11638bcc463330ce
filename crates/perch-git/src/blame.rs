use crate::backend::GitError;
use crate::git::{blob_text, map_backend_error, tree_blob_id};
use gix::ObjectId;
use std::ops::Range;

/// First-parent line-ownership walk: starting at `tip`, diff each commit's
/// version of `tree_path` against its first parent's. A commit owns the
/// tracked line when the line falls inside a region it introduced; hunks
/// above only shift the tracked position. A root commit, or the commit that
/// added the path, owns whatever survives to it.
pub fn line_owner(
    repo: &gix::Repository,
    tip: ObjectId,
    tree_path: &str,
    line: u32,
) -> Result<String, GitError> {
    let Some(blob_id) = tree_blob_id(repo, tip, tree_path)? else {
        return Err(GitError::PathNotFound {
            path: tree_path.to_string(),
        });
    };
    let text = blob_text(repo, blob_id)?;
    let lines = text.lines().count() as u32;
    if line == 0 || line > lines {
        return Err(GitError::InsufficientLines {
            path: tree_path.to_string(),
            lines,
        });
    }

    let mut commit_id = tip;
    let mut commit_blob = blob_id;
    let mut commit_text = text;
    // 0-based position of the tracked line in the current commit's version.
    let mut idx = i64::from(line) - 1;

    loop {
        let commit = repo
            .find_commit(commit_id)
            .map_err(map_backend_error("load commit"))?;
        let Some(parent_id) = commit.parent_ids().next() else {
            return Ok(commit_id.to_string());
        };
        let parent_id = parent_id.detach();
        let Some(parent_blob) = tree_blob_id(repo, parent_id, tree_path)? else {
            // The path first appears in this commit.
            return Ok(commit_id.to_string());
        };
        if parent_blob == commit_blob {
            commit_id = parent_id;
            continue;
        }

        let parent_text = blob_text(repo, parent_blob)?;
        let changes = line_changes(&parent_text, &commit_text);
        let mut shift: i64 = 0;
        let mut owned = false;
        for (before, after) in &changes {
            let after_start = i64::from(after.start);
            let after_end = i64::from(after.end);
            if idx >= after_start && idx < after_end {
                owned = true;
                break;
            }
            if after_end <= idx {
                shift += i64::from(before.len() as u32) - i64::from(after.len() as u32);
            }
        }
        if owned {
            return Ok(commit_id.to_string());
        }

        idx += shift;
        commit_id = parent_id;
        commit_blob = parent_blob;
        commit_text = parent_text;
    }
}

#[derive(Default)]
struct ChangeCollector {
    changes: Vec<(Range<u32>, Range<u32>)>,
}

impl gix::diff::blob::Sink for ChangeCollector {
    type Out = Vec<(Range<u32>, Range<u32>)>;

    fn process_change(&mut self, before: Range<u32>, after: Range<u32>) {
        self.changes.push((before, after));
    }

    fn finish(self) -> Self::Out {
        self.changes
    }
}

/// Changed line regions between two blob texts, as (old, new) 0-based ranges.
pub(crate) fn line_changes(old: &str, new: &str) -> Vec<(Range<u32>, Range<u32>)> {
    use gix::diff::blob::intern::InternedInput;
    use gix::diff::blob::sources::lines_with_terminator;
    use gix::diff::blob::Algorithm;

    let input = InternedInput::new(lines_with_terminator(old), lines_with_terminator(new));
    gix::diff::blob::diff(Algorithm::Histogram, &input, ChangeCollector::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GixContext;
    use crate::testutil::GitTestRepo;

    #[test]
    fn test_line_changes_reports_replacement() {
        let changes = line_changes("a\nb\nc\n", "a\nB\nc\n");
        assert_eq!(changes, vec![(1..2, 1..2)]);
    }

    #[test]
    fn test_owner_is_commit_that_touched_the_line() {
        let repo = GitTestRepo::new();
        repo.write_file("f.txt", "one\ntwo\nthree\n");
        let c1 = repo.commit("add f");
        repo.write_file("f.txt", "one\ntwo changed\nthree\n");
        let c2 = repo.commit("touch line two");

        let ctx = GixContext::open(repo.path()).unwrap();
        let tip = ctx.resolve_commit("HEAD").unwrap();
        assert_eq!(line_owner(ctx.repo(), tip, "f.txt", 2).unwrap(), c2);
        assert_eq!(line_owner(ctx.repo(), tip, "f.txt", 1).unwrap(), c1);
        assert_eq!(line_owner(ctx.repo(), tip, "f.txt", 3).unwrap(), c1);
    }

    #[test]
    fn test_insertion_above_shifts_tracking() {
        let repo = GitTestRepo::new();
        repo.write_file("f.txt", "alpha\nomega\n");
        let c1 = repo.commit("base");
        repo.write_file("f.txt", "intro\nalpha\nomega\n");
        let _c2 = repo.commit("insert line on top");

        let ctx = GixContext::open(repo.path()).unwrap();
        let tip = ctx.resolve_commit("HEAD").unwrap();
        // "omega" moved from line 2 to line 3 but is still owned by c1.
        assert_eq!(line_owner(ctx.repo(), tip, "f.txt", 3).unwrap(), c1);
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let repo = GitTestRepo::new();
        repo.write_file("f.txt", "x\n");
        repo.commit("init");
        let ctx = GixContext::open(repo.path()).unwrap();
        let tip = ctx.resolve_commit("HEAD").unwrap();
        assert!(matches!(
            line_owner(ctx.repo(), tip, "missing.txt", 1),
            Err(GitError::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_short_file_is_insufficient_lines() {
        let repo = GitTestRepo::new();
        repo.write_file("f.txt", "only\n");
        repo.commit("init");
        let ctx = GixContext::open(repo.path()).unwrap();
        let tip = ctx.resolve_commit("HEAD").unwrap();
        assert!(matches!(
            line_owner(ctx.repo(), tip, "f.txt", 5),
            Err(GitError::InsufficientLines { lines: 1, .. })
        ));
    }
}
