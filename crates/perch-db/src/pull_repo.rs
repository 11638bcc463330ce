use crate::util::{from_rfc3339, to_rfc3339};
use perch_core::error::PullError;
use perch_core::pulls::PullRepository;
use perch_core::types::{Pull, PullId, RepoId, UserId};
use rusqlite::Connection;

const COLUMNS: &str =
    "id, repo_id, pull_index, author, title, base_ref, head_ref, merge_base, created_at, updated_at";

pub struct PullRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> PullRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl<'a> PullRepository for PullRepo<'a> {
    fn create(&self, pull: Pull) -> Result<Pull, PullError> {
        let sql = format!("INSERT INTO pulls ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)");
        let params = (
            pull.id.as_str(),
            pull.repo_id.as_str(),
            pull.index,
            pull.author.as_str(),
            pull.title.clone(),
            pull.base_ref.clone(),
            pull.head_ref.clone(),
            pull.merge_base.clone(),
            to_rfc3339(&pull.created_at),
            to_rfc3339(&pull.updated_at),
        );
        self.conn.execute(&sql, params).map_err(db_err)?;
        Ok(pull)
    }

    fn get(&self, id: &PullId) -> Result<Option<Pull>, PullError> {
        let sql = format!("SELECT {COLUMNS} FROM pulls WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let mut rows = stmt.query([id.as_str()]).map_err(db_err)?;
        let Some(row) = rows.next().map_err(db_err)? else {
            return Ok(None);
        };
        map_pull_row(row).map(Some)
    }

    fn list(&self) -> Result<Vec<Pull>, PullError> {
        let sql = format!("SELECT {COLUMNS} FROM pulls ORDER BY created_at DESC");
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let mut rows = stmt.query([]).map_err(db_err)?;
        let mut pulls = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            pulls.push(map_pull_row(row)?);
        }
        Ok(pulls)
    }
}

fn db_err(err: impl std::fmt::Display) -> PullError {
    PullError::InvalidInput {
        message: err.to_string(),
    }
}

fn map_pull_row(row: &rusqlite::Row<'_>) -> Result<Pull, PullError> {
    let id: String = row.get(0).map_err(db_err)?;
    let repo_id: String = row.get(1).map_err(db_err)?;
    let index: i64 = row.get(2).map_err(db_err)?;
    let author: String = row.get(3).map_err(db_err)?;
    let title: String = row.get(4).map_err(db_err)?;
    let base_ref: String = row.get(5).map_err(db_err)?;
    let head_ref: String = row.get(6).map_err(db_err)?;
    let merge_base: String = row.get(7).map_err(db_err)?;
    let created_at: String = row.get(8).map_err(db_err)?;
    let updated_at: String = row.get(9).map_err(db_err)?;

    Ok(Pull {
        id: PullId::new(id).map_err(db_err)?,
        repo_id: RepoId::new(repo_id).map_err(db_err)?,
        index,
        author: UserId::new(author).map_err(db_err)?,
        title,
        base_ref,
        head_ref,
        merge_base,
        created_at: from_rfc3339(&created_at).map_err(db_err)?,
        updated_at: from_rfc3339(&updated_at).map_err(db_err)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::with_test_db;
    use chrono::Utc;

    fn sample_pull() -> Pull {
        let now = Utc::now();
        Pull {
            id: PullId::generate(),
            repo_id: RepoId::generate(),
            index: 7,
            author: UserId::generate(),
            title: "Teach the parser about trailers".to_string(),
            base_ref: "main".to_string(),
            head_ref: "feature/trailers".to_string(),
            merge_base: "0123456789abcdef0123456789abcdef01234567".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_create_and_get_round_trip() {
        let conn = with_test_db().unwrap();
        let repo = PullRepo::new(&conn);
        let pull = repo.create(sample_pull()).unwrap();
        let fetched = repo.get(&pull.id).unwrap().unwrap();
        assert_eq!(fetched, pull);
    }

    #[test]
    fn test_get_missing_is_none() {
        let conn = with_test_db().unwrap();
        let repo = PullRepo::new(&conn);
        assert!(repo.get(&PullId::generate()).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_repo_index_rejected() {
        let conn = with_test_db().unwrap();
        let repo = PullRepo::new(&conn);
        let first = repo.create(sample_pull()).unwrap();
        let mut second = sample_pull();
        second.repo_id = first.repo_id.clone();
        second.index = first.index;
        assert!(repo.create(second).is_err());
    }
}
