use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Scratch git repository driven through the git CLI. Commits are normalized
/// (fixed author, no gpg) so hashes stay stable within a test run.
pub(crate) struct GitTestRepo {
    dir: TempDir,
}

impl GitTestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let repo = Self { dir };
        repo.git(&["init", "-q", "-b", "main"]);
        repo.git(&["config", "user.name", "Perch Test"]);
        repo.git(&["config", "user.email", "perch@test.invalid"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(path, content).expect("write file");
    }

    pub fn commit(&self, message: &str) -> String {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "--no-gpg-sign", "--allow-empty", "-m", message]);
        self.rev_parse("HEAD")
    }

    pub fn amend(&self, message: &str) -> String {
        self.git(&["commit", "-q", "--no-gpg-sign", "--amend", "-m", message]);
        self.rev_parse("HEAD")
    }

    pub fn branch(&self, name: &str) {
        self.git(&["branch", name]);
    }

    pub fn checkout(&self, name: &str) {
        self.git(&["checkout", "-q", name]);
    }

    pub fn checkout_orphan(&self, name: &str) {
        self.git(&["checkout", "-q", "--orphan", name]);
        self.git(&["rm", "-rfq", "--ignore-unmatch", "."]);
    }

    pub fn rebase(&self, onto: &str) {
        self.git(&["rebase", "-q", onto]);
    }

    pub fn rev_parse(&self, rev: &str) -> String {
        let out = self.git(&["rev-parse", rev]);
        out.trim().to_string()
    }

    fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.dir.path())
            .output()
            .expect("run git");
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }
}
