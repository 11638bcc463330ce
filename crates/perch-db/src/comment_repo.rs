use crate::util::{decode_enum, decode_json, encode_enum, encode_json, from_rfc3339, to_rfc3339};
use perch_core::comments::CommentRepository;
use perch_core::error::CommentError;
use perch_core::types::{
    Comment, CommentFilter, CommentId, CreateCommentInput, PullId, ReviewId, UserId,
};
use rusqlite::{Connection, ToSql};

const COLUMNS: &str = "id, pull_id, author, kind, tree_path, line, commit_sha, patch, invalidated, review_id, content, attachments_json, created_at";

pub struct CommentRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> CommentRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl<'a> CommentRepository for CommentRepo<'a> {
    fn create(&self, input: CreateCommentInput) -> Result<Comment, CommentError> {
        let comment = Comment {
            id: CommentId::generate(),
            pull_id: input.pull_id,
            author: input.author,
            kind: input.kind,
            tree_path: input.tree_path,
            line: input.line,
            commit_sha: input.commit_sha,
            patch: input.patch,
            invalidated: input.invalidated,
            review_id: input.review_id,
            content: input.content,
            attachments: input.attachments,
            created_at: chrono::Utc::now(),
        };
        let sql = format!(
            "INSERT INTO comments ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        );
        let params = (
            comment.id.as_str(),
            comment.pull_id.as_str(),
            comment.author.as_str(),
            encode_enum(&comment.kind).map_err(db_err)?,
            comment.tree_path.clone(),
            comment.line,
            comment.commit_sha.clone(),
            comment.patch.clone(),
            comment.invalidated,
            comment.review_id.as_ref().map(|id| id.as_str().to_string()),
            comment.content.clone(),
            encode_json(&comment.attachments).map_err(db_err)?,
            to_rfc3339(&comment.created_at),
        );
        self.conn.execute(&sql, params).map_err(db_err)?;
        Ok(comment)
    }

    fn list(&self, filter: CommentFilter) -> Result<Vec<Comment>, CommentError> {
        let mut sql = format!("SELECT {COLUMNS} FROM comments");
        let mut clauses = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(pull_id) = &filter.pull_id {
            clauses.push(format!("pull_id = ?{}", values.len() + 1));
            values.push(Box::new(pull_id.as_str().to_string()));
        }
        if let Some(review_id) = &filter.review_id {
            clauses.push(format!("review_id = ?{}", values.len() + 1));
            values.push(Box::new(review_id.as_str().to_string()));
        }
        if let Some(kind) = &filter.kind {
            clauses.push(format!("kind = ?{}", values.len() + 1));
            values.push(Box::new(encode_enum(kind).map_err(db_err)?));
        }
        if let Some(tree_path) = &filter.tree_path {
            clauses.push(format!("tree_path = ?{}", values.len() + 1));
            values.push(Box::new(tree_path.clone()));
        }
        if let Some(line) = filter.line {
            clauses.push(format!("line = ?{}", values.len() + 1));
            values.push(Box::new(line));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let params: Vec<&dyn ToSql> = values.iter().map(|value| value.as_ref()).collect();
        let mut rows = stmt.query(&params[..]).map_err(db_err)?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            comments.push(map_comment_row(row)?);
        }
        Ok(comments)
    }

    fn first_at_anchor(
        &self,
        review_id: &ReviewId,
        tree_path: &str,
        line: i64,
    ) -> Result<Option<Comment>, CommentError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM comments WHERE review_id = ?1 AND tree_path = ?2 AND line = ?3 ORDER BY created_at ASC, id ASC LIMIT 1"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let mut rows = stmt
            .query((review_id.as_str(), tree_path, line))
            .map_err(db_err)?;
        let Some(row) = rows.next().map_err(db_err)? else {
            return Ok(None);
        };
        map_comment_row(row).map(Some)
    }

    fn exists_on_submitted_review(
        &self,
        pull_id: &PullId,
        tree_path: &str,
        line: i64,
    ) -> Result<bool, CommentError> {
        let sql = "SELECT EXISTS(
            SELECT 1 FROM comments c
            JOIN reviews r ON r.id = c.review_id
            WHERE c.pull_id = ?1 AND c.tree_path = ?2 AND c.line = ?3 AND r.kind != 'Pending'
        )";
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        stmt.query_row((pull_id.as_str(), tree_path, line), |row| row.get(0))
            .map_err(db_err)
    }
}

fn db_err(err: impl std::fmt::Display) -> CommentError {
    CommentError::InvalidInput {
        message: err.to_string(),
    }
}

fn map_comment_row(row: &rusqlite::Row<'_>) -> Result<Comment, CommentError> {
    let id: String = row.get(0).map_err(db_err)?;
    let pull_id: String = row.get(1).map_err(db_err)?;
    let author: String = row.get(2).map_err(db_err)?;
    let kind: String = row.get(3).map_err(db_err)?;
    let tree_path: String = row.get(4).map_err(db_err)?;
    let line: i64 = row.get(5).map_err(db_err)?;
    let commit_sha: String = row.get(6).map_err(db_err)?;
    let patch: String = row.get(7).map_err(db_err)?;
    let invalidated: bool = row.get(8).map_err(db_err)?;
    let review_id: Option<String> = row.get(9).map_err(db_err)?;
    let content: String = row.get(10).map_err(db_err)?;
    let attachments_json: String = row.get(11).map_err(db_err)?;
    let created_at: String = row.get(12).map_err(db_err)?;

    Ok(Comment {
        id: CommentId::new(id).map_err(db_err)?,
        pull_id: PullId::new(pull_id).map_err(db_err)?,
        author: UserId::new(author).map_err(db_err)?,
        kind: decode_enum(&kind).map_err(db_err)?,
        tree_path,
        line,
        commit_sha,
        patch,
        invalidated,
        review_id: review_id.map(ReviewId::new).transpose().map_err(db_err)?,
        content,
        attachments: decode_json(&attachments_json).map_err(db_err)?,
        created_at: from_rfc3339(&created_at).map_err(db_err)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review_repo::ReviewRepo;
    use crate::schema::fixtures::{seeded_pull, seeded_user};
    use crate::schema::with_test_db;
    use perch_core::reviews::ReviewRepository;
    use perch_core::types::{CommentKind, FinalizeReviewInput, ReviewKind};

    fn code_comment(
        pull_id: &PullId,
        author: &UserId,
        review_id: &ReviewId,
        line: i64,
    ) -> CreateCommentInput {
        CreateCommentInput {
            pull_id: pull_id.clone(),
            author: author.clone(),
            kind: CommentKind::Code,
            tree_path: "src/lib.rs".to_string(),
            line,
            commit_sha: "abc123".to_string(),
            patch: "@@ -1,1 +1,1 @@\n-old\n+new".to_string(),
            invalidated: false,
            review_id: Some(review_id.clone()),
            content: "why mutate here?".to_string(),
            attachments: vec!["att_one".to_string()],
        }
    }

    fn seeded_pending(conn: &Connection) -> (PullId, UserId, ReviewId) {
        let reviewer = seeded_user(conn, "alice");
        let pull = seeded_pull(conn, &reviewer);
        let pending = ReviewRepo::new(conn)
            .get_or_create_pending(&pull, &reviewer, "abc123")
            .unwrap();
        (pull, reviewer, pending.id)
    }

    #[test]
    fn test_create_and_list_round_trip() {
        let conn = with_test_db().unwrap();
        let repo = CommentRepo::new(&conn);
        let (pull, author, review) = seeded_pending(&conn);
        let comment = repo.create(code_comment(&pull, &author, &review, 12)).unwrap();

        let listed = repo
            .list(CommentFilter {
                pull_id: Some(pull),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(listed, vec![comment.clone()]);
        assert_eq!(listed[0].attachments, vec!["att_one".to_string()]);
        assert_eq!(listed[0].unsigned_line(), 12);
    }

    #[test]
    fn test_first_at_anchor_is_oldest() {
        let conn = with_test_db().unwrap();
        let repo = CommentRepo::new(&conn);
        let (pull, author, review) = seeded_pending(&conn);
        let first = repo.create(code_comment(&pull, &author, &review, -4)).unwrap();
        repo.create(code_comment(&pull, &author, &review, -4)).unwrap();
        repo.create(code_comment(&pull, &author, &review, 4)).unwrap();

        let anchor = repo
            .first_at_anchor(&review, "src/lib.rs", -4)
            .unwrap()
            .unwrap();
        assert_eq!(anchor.id, first.id);
        assert!(repo
            .first_at_anchor(&review, "src/other.rs", -4)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_exists_on_submitted_review_ignores_pending() {
        let conn = with_test_db().unwrap();
        let comments = CommentRepo::new(&conn);
        let reviews = ReviewRepo::new(&conn);
        let (pull, reviewer, pending) = seeded_pending(&conn);
        comments
            .create(code_comment(&pull, &reviewer, &pending, 9))
            .unwrap();

        assert!(!comments
            .exists_on_submitted_review(&pull, "src/lib.rs", 9)
            .unwrap());

        reviews
            .finalize(
                &pending,
                FinalizeReviewInput {
                    kind: ReviewKind::Comment,
                    content: "notes".to_string(),
                    commit_id: "abc123".to_string(),
                    official: false,
                    stale: false,
                },
            )
            .unwrap();
        assert!(comments
            .exists_on_submitted_review(&pull, "src/lib.rs", 9)
            .unwrap());
        assert!(!comments
            .exists_on_submitted_review(&pull, "src/lib.rs", 10)
            .unwrap());
    }
}
