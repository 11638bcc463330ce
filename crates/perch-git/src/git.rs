use crate::backend::{DiffContext, GitError};
use crate::blame;
use crate::pipe;
use crate::window;
use gix::ObjectId;
use gix::objs::tree::{EntryKind as TreeEntryKind, EntryMode};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::ops::Range;
use std::path::Path;

/// `DiffContext` over one gix repository.
pub struct GixContext {
    repo: gix::Repository,
}

impl GixContext {
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = gix::open(path).map_err(|_| GitError::RepoNotFound)?;
        Ok(Self { repo })
    }

    pub(crate) fn repo(&self) -> &gix::Repository {
        &self.repo
    }

    /// Resolve a commit hash or ref name to a commit id.
    pub(crate) fn resolve_commit(&self, rev: &str) -> Result<ObjectId, GitError> {
        let id = self
            .repo
            .rev_parse_single(rev)
            .map_err(|_| GitError::RefNotFound {
                name: rev.to_string(),
            })?;
        let object = id.object().map_err(map_backend_error("load object"))?;
        let commit = object
            .peel_to_kind(gix::object::Kind::Commit)
            .map_err(map_backend_error("peel to commit"))?;
        Ok(commit.id)
    }

    fn merge_base_ids(&self, a: ObjectId, b: ObjectId) -> Result<ObjectId, GitError> {
        let mut ancestors = HashSet::new();
        let mut queue = VecDeque::from([a]);
        while let Some(id) = queue.pop_front() {
            if !ancestors.insert(id) {
                continue;
            }
            let commit = self
                .repo
                .find_commit(id)
                .map_err(map_backend_error("load commit"))?;
            for parent in commit.parent_ids() {
                queue.push_back(parent.detach());
            }
        }

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([b]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if ancestors.contains(&id) {
                return Ok(id);
            }
            let commit = self
                .repo
                .find_commit(id)
                .map_err(map_backend_error("load commit"))?;
            for parent in commit.parent_ids() {
                queue.push_back(parent.detach());
            }
        }
        Err(GitError::DiffUnavailable {
            base: a.to_string(),
            head: b.to_string(),
        })
    }

    /// Per-path (old blob, new blob) pairs of the tree diff `from..to`.
    fn change_set(
        &self,
        from: ObjectId,
        to: ObjectId,
    ) -> Result<BTreeMap<String, (Option<ObjectId>, Option<ObjectId>)>, GitError> {
        use gix::object::tree::diff::ChangeDetached;

        let from_tree = self
            .repo
            .find_commit(from)
            .map_err(map_backend_error("load commit"))?
            .tree()
            .map_err(map_backend_error("load tree"))?;
        let to_tree = self
            .repo
            .find_commit(to)
            .map_err(map_backend_error("load commit"))?
            .tree()
            .map_err(map_backend_error("load tree"))?;
        let changes = self
            .repo
            .diff_tree_to_tree(&from_tree, &to_tree, None)
            .map_err(map_backend_error("tree diff"))?;

        let mut set = BTreeMap::new();
        for change in changes {
            match change {
                ChangeDetached::Addition {
                    location,
                    entry_mode,
                    id,
                    ..
                } => {
                    if !is_blob_entry(entry_mode) {
                        continue;
                    }
                    set.insert(location.to_string(), (None, Some(id)));
                }
                ChangeDetached::Deletion {
                    location,
                    entry_mode,
                    id,
                    ..
                } => {
                    if !is_blob_entry(entry_mode) {
                        continue;
                    }
                    set.insert(location.to_string(), (Some(id), None));
                }
                ChangeDetached::Modification {
                    location,
                    previous_entry_mode,
                    entry_mode,
                    previous_id,
                    id,
                    ..
                } => {
                    if !is_blob_entry(entry_mode) || !is_blob_entry(previous_entry_mode) {
                        continue;
                    }
                    set.insert(location.to_string(), (Some(previous_id), Some(id)));
                }
                ChangeDetached::Rewrite {
                    source_location,
                    location,
                    source_entry_mode,
                    entry_mode,
                    source_id,
                    id,
                    ..
                } => {
                    if !is_blob_entry(entry_mode) || !is_blob_entry(source_entry_mode) {
                        continue;
                    }
                    set.insert(source_location.to_string(), (Some(source_id), None));
                    set.insert(location.to_string(), (None, Some(id)));
                }
            }
        }
        Ok(set)
    }
}

impl DiffContext for GixContext {
    fn line_owner(&self, rev: &str, tree_path: &str, line: u32) -> Result<String, GitError> {
        let tip = self.resolve_commit(rev)?;
        blame::line_owner(&self.repo, tip, tree_path, line)
    }

    fn patch_around_line(
        &self,
        base: &str,
        head: &str,
        tree_path: &str,
        line: u32,
        old_side: bool,
        context_lines: u32,
    ) -> Result<String, GitError> {
        let base_id = self.resolve_commit(base)?;
        let head_id = self.resolve_commit(head)?;
        let old_blob = tree_blob_id(&self.repo, base_id, tree_path)?;
        let new_blob = tree_blob_id(&self.repo, head_id, tree_path)?;
        if old_blob.is_none() && new_blob.is_none() {
            return Err(GitError::PathNotFound {
                path: tree_path.to_string(),
            });
        }
        let old_text = old_blob
            .map(|id| blob_text(&self.repo, id))
            .transpose()?
            .unwrap_or_default();
        let new_text = new_blob
            .map(|id| blob_text(&self.repo, id))
            .transpose()?
            .unwrap_or_default();

        // The raw diff streams through a bounded pipe; dropping the reader
        // on early exit fails the producer's next send, so it never blocks
        // on a consumer that went away.
        let (writer, reader) = pipe::bounded(64);
        let producer = std::thread::spawn(move || {
            emit_unified(&old_text, &new_text, context_lines, |row| {
                writer.send(row).is_ok()
            });
        });
        let patch =
            window::cut_around_line(reader, line, old_side, context_lines).unwrap_or_default();
        producer
            .join()
            .map_err(|_| GitError::BackendError {
                reason: "diff producer panicked".to_string(),
            })?;
        Ok(patch)
    }

    fn ref_tip(&self, rev: &str) -> Result<String, GitError> {
        self.resolve_commit(rev).map(|id| id.to_string())
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<String, GitError> {
        let a = self.resolve_commit(a)?;
        let b = self.resolve_commit(b)?;
        self.merge_base_ids(a, b).map(|id| id.to_string())
    }

    fn content_changed(
        &self,
        base_ref: &str,
        old_commit: &str,
        new_commit: &str,
    ) -> Result<bool, GitError> {
        let old_id = self.resolve_commit(old_commit)?;
        let new_id = self.resolve_commit(new_commit)?;
        if old_id == new_id {
            return Ok(false);
        }
        let old_tree = self
            .repo
            .find_commit(old_id)
            .map_err(map_backend_error("load commit"))?
            .tree_id()
            .map_err(map_backend_error("tree id"))?
            .detach();
        let new_tree = self
            .repo
            .find_commit(new_id)
            .map_err(map_backend_error("load commit"))?
            .tree_id()
            .map_err(map_backend_error("tree id"))?
            .detach();
        if old_tree == new_tree {
            return Ok(false);
        }

        // Rewritten history carrying identical per-path change pairs, each
        // judged against its own merge base, is not a content change.
        let base_id = self.resolve_commit(base_ref)?;
        let old_set = self.change_set(self.merge_base_ids(base_id, old_id)?, old_id)?;
        let new_set = self.change_set(self.merge_base_ids(base_id, new_id)?, new_id)?;
        Ok(old_set != new_set)
    }
}

pub(crate) fn map_backend_error<E: std::fmt::Display>(
    context: &'static str,
) -> impl FnOnce(E) -> GitError {
    move |err| GitError::BackendError {
        reason: format!("{context}: {err}"),
    }
}

/// Blob id of `tree_path` in the commit's tree, `None` when the path is
/// absent or not a blob.
pub(crate) fn tree_blob_id(
    repo: &gix::Repository,
    commit_id: ObjectId,
    tree_path: &str,
) -> Result<Option<ObjectId>, GitError> {
    let commit = repo
        .find_commit(commit_id)
        .map_err(map_backend_error("load commit"))?;
    let tree = commit.tree().map_err(map_backend_error("load tree"))?;
    let Some(entry) = tree
        .lookup_entry_by_path(tree_path)
        .map_err(map_backend_error("lookup path"))?
    else {
        return Ok(None);
    };
    if !is_blob_entry(entry.mode()) {
        return Ok(None);
    }
    Ok(Some(entry.oid().to_owned()))
}

fn is_blob_entry(mode: EntryMode) -> bool {
    matches!(
        TreeEntryKind::from(mode),
        TreeEntryKind::Blob | TreeEntryKind::BlobExecutable
    )
}

pub(crate) fn blob_text(repo: &gix::Repository, id: ObjectId) -> Result<String, GitError> {
    let blob = repo.find_blob(id).map_err(map_backend_error("load blob"))?;
    Ok(String::from_utf8_lossy(&blob.data).to_string())
}

/// Emit a unified diff of two texts with `context` lines of context, one
/// output row at a time. `send` returning false stops the emission.
fn emit_unified(old: &str, new: &str, context: u32, mut send: impl FnMut(String) -> bool) {
    let changes = blame::line_changes(old, new);
    if changes.is_empty() {
        return;
    }
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let ctx = context as usize;

    let mut groups: Vec<&[(Range<u32>, Range<u32>)]> = Vec::new();
    let mut group_start = 0;
    for i in 1..changes.len() {
        let gap = changes[i].0.start as usize - changes[i - 1].0.end as usize;
        if gap > 2 * ctx {
            groups.push(&changes[group_start..i]);
            group_start = i;
        }
    }
    groups.push(&changes[group_start..]);

    for group in groups {
        let first = &group[0];
        let last = &group[group.len() - 1];
        let lead = ctx.min(first.0.start as usize);
        let tail = ctx.min(old_lines.len() - last.0.end as usize);

        let old_from = first.0.start as usize - lead;
        let old_to = last.0.end as usize + tail;
        let new_from = first.1.start as usize - lead;
        let new_to = last.1.end as usize + tail;

        let old_count = old_to - old_from;
        let new_count = new_to - new_from;
        let old_display = if old_count == 0 { old_from } else { old_from + 1 };
        let new_display = if new_count == 0 { new_from } else { new_from + 1 };
        if !send(format!(
            "@@ -{old_display},{old_count} +{new_display},{new_count} @@"
        )) {
            return;
        }

        let mut cursor = old_from;
        for (before, after) in group {
            while cursor < before.start as usize {
                if !send(format!(" {}", old_lines[cursor])) {
                    return;
                }
                cursor += 1;
            }
            for i in before.clone() {
                if !send(format!("-{}", old_lines[i as usize])) {
                    return;
                }
            }
            for i in after.clone() {
                if !send(format!("+{}", new_lines[i as usize])) {
                    return;
                }
            }
            cursor = before.end as usize;
        }
        while cursor < old_to {
            if !send(format!(" {}", old_lines[cursor])) {
                return;
            }
            cursor += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::GitTestRepo;

    fn numbered(from: u32, to: u32) -> String {
        (from..=to).map(|n| format!("line {n}\n")).collect()
    }

    #[test]
    fn test_ref_tip_resolves_branch_and_hash() {
        let repo = GitTestRepo::new();
        repo.write_file("a.txt", "a\n");
        let c1 = repo.commit("init");
        let ctx = GixContext::open(repo.path()).unwrap();
        assert_eq!(ctx.ref_tip("main").unwrap(), c1);
        assert_eq!(ctx.ref_tip(&c1).unwrap(), c1);
        assert!(matches!(
            ctx.ref_tip("no-such-branch"),
            Err(GitError::RefNotFound { .. })
        ));
    }

    #[test]
    fn test_merge_base_of_diverged_branches() {
        let repo = GitTestRepo::new();
        repo.write_file("a.txt", "a\n");
        let base = repo.commit("base");
        repo.branch("feature");
        repo.write_file("a.txt", "a on main\n");
        repo.commit("main change");
        repo.checkout("feature");
        repo.write_file("b.txt", "b\n");
        repo.commit("feature change");

        let ctx = GixContext::open(repo.path()).unwrap();
        assert_eq!(ctx.merge_base("main", "feature").unwrap(), base);
    }

    #[test]
    fn test_merge_base_disjoint_histories() {
        let repo = GitTestRepo::new();
        repo.write_file("a.txt", "a\n");
        repo.commit("init");
        repo.checkout_orphan("island");
        repo.write_file("z.txt", "z\n");
        repo.commit("unrelated root");

        let ctx = GixContext::open(repo.path()).unwrap();
        assert!(matches!(
            ctx.merge_base("main", "island"),
            Err(GitError::DiffUnavailable { .. })
        ));
    }

    #[test]
    fn test_patch_window_is_bounded_and_contains_target() {
        let repo = GitTestRepo::new();
        repo.write_file("f.txt", &numbered(1, 40));
        let base = repo.commit("base");
        let mut changed = numbered(1, 40);
        changed = changed.replace("line 20\n", "line twenty\n");
        repo.write_file("f.txt", &changed);
        let head = repo.commit("tweak line 20");

        let ctx = GixContext::open(repo.path()).unwrap();
        let patch = ctx
            .patch_around_line(&base, &head, "f.txt", 20, false, 3)
            .unwrap();
        assert!(patch.contains("+line twenty"));
        assert!(patch.starts_with("@@ "));
        // header + target-side rows + at most 3 context either side
        assert!(patch.lines().count() <= 1 + 2 + 2 * 3);
    }

    #[test]
    fn test_patch_for_line_outside_diff_is_empty() {
        let repo = GitTestRepo::new();
        repo.write_file("f.txt", &numbered(1, 40));
        let base = repo.commit("base");
        let changed = numbered(1, 40).replace("line 20\n", "line twenty\n");
        repo.write_file("f.txt", &changed);
        let head = repo.commit("tweak line 20");

        let ctx = GixContext::open(repo.path()).unwrap();
        let patch = ctx
            .patch_around_line(&base, &head, "f.txt", 2, false, 3)
            .unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_patch_missing_path_is_not_found() {
        let repo = GitTestRepo::new();
        repo.write_file("f.txt", "x\n");
        let base = repo.commit("base");
        repo.write_file("f.txt", "y\n");
        let head = repo.commit("head");

        let ctx = GixContext::open(repo.path()).unwrap();
        assert!(matches!(
            ctx.patch_around_line(&base, &head, "missing.txt", 1, false, 3),
            Err(GitError::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_noop_history_rewrite_is_not_a_content_change() {
        let repo = GitTestRepo::new();
        repo.write_file("a.txt", "a\n");
        repo.commit("base");
        repo.branch("feature");
        repo.checkout("feature");
        repo.write_file("a.txt", "a changed\n");
        let h1 = repo.commit("change a");
        let h2 = repo.amend("change a, reworded");
        assert_ne!(h1, h2);

        let ctx = GixContext::open(repo.path()).unwrap();
        assert!(!ctx.content_changed("main", &h1, &h2).unwrap());
    }

    #[test]
    fn test_clean_rebase_is_not_a_content_change() {
        let repo = GitTestRepo::new();
        repo.write_file("a.txt", "a\n");
        repo.commit("base");
        repo.branch("feature");
        repo.checkout("feature");
        repo.write_file("b.txt", "b\n");
        let h1 = repo.commit("add b");
        repo.checkout("main");
        repo.write_file("c.txt", "c\n");
        repo.commit("unrelated main work");
        repo.checkout("feature");
        repo.rebase("main");
        let h2 = repo.rev_parse("HEAD");
        assert_ne!(h1, h2);

        // trees differ after the rebase but the branch's own diff does not
        let ctx = GixContext::open(repo.path()).unwrap();
        assert!(!ctx.content_changed("main", &h1, &h2).unwrap());
    }

    #[test]
    fn test_substantive_change_is_stale_worthy() {
        let repo = GitTestRepo::new();
        repo.write_file("a.txt", "a\n");
        repo.commit("base");
        repo.branch("feature");
        repo.checkout("feature");
        repo.write_file("a.txt", "a changed\n");
        let h1 = repo.commit("change a");
        repo.write_file("a.txt", "a changed differently\n");
        let h2 = repo.commit("change a more");

        let ctx = GixContext::open(repo.path()).unwrap();
        assert!(ctx.content_changed("main", &h1, &h2).unwrap());
    }

    #[test]
    fn test_same_commit_is_never_changed() {
        let repo = GitTestRepo::new();
        repo.write_file("a.txt", "a\n");
        let c1 = repo.commit("init");
        let ctx = GixContext::open(repo.path()).unwrap();
        assert!(!ctx.content_changed("main", &c1, &c1).unwrap());
    }
}
