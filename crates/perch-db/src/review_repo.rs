use crate::util::{decode_enum, encode_enum, from_rfc3339, to_rfc3339};
use perch_core::error::ReviewError;
use perch_core::reviews::ReviewRepository;
use perch_core::types::{
    CreateSubmittedReviewInput, FinalizeReviewInput, PullId, Review, ReviewFilter, ReviewId,
    ReviewKind, UserId,
};
use rusqlite::{Connection, ToSql};

const COLUMNS: &str = "id, pull_id, reviewer, kind, commit_id, content, official, dismissed, stale, created_at, updated_at";

pub struct ReviewRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> ReviewRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn insert(&self, review: &Review) -> Result<(), ReviewError> {
        let sql = format!(
            "INSERT INTO reviews ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        );
        let params = (
            review.id.as_str(),
            review.pull_id.as_str(),
            review.reviewer.as_str(),
            encode_enum(&review.kind).map_err(db_err)?,
            review.commit_id.clone(),
            review.content.clone(),
            review.official,
            review.dismissed,
            review.stale,
            to_rfc3339(&review.created_at),
            to_rfc3339(&review.updated_at),
        );
        self.conn.execute(&sql, params).map_err(db_err)?;
        Ok(())
    }
}

impl<'a> ReviewRepository for ReviewRepo<'a> {
    fn get(&self, id: &ReviewId) -> Result<Option<Review>, ReviewError> {
        let sql = format!("SELECT {COLUMNS} FROM reviews WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let mut rows = stmt.query([id.as_str()]).map_err(db_err)?;
        let Some(row) = rows.next().map_err(db_err)? else {
            return Ok(None);
        };
        map_review_row(row).map(Some)
    }

    fn get_pending(
        &self,
        pull_id: &PullId,
        reviewer: &UserId,
    ) -> Result<Option<Review>, ReviewError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM reviews WHERE pull_id = ?1 AND reviewer = ?2 AND kind = 'Pending' AND dismissed = 0"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let mut rows = stmt
            .query([pull_id.as_str(), reviewer.as_str()])
            .map_err(db_err)?;
        let Some(row) = rows.next().map_err(db_err)? else {
            return Ok(None);
        };
        map_review_row(row).map(Some)
    }

    fn get_or_create_pending(
        &self,
        pull_id: &PullId,
        reviewer: &UserId,
        commit_id: &str,
    ) -> Result<Review, ReviewError> {
        if let Some(existing) = self.get_pending(pull_id, reviewer)? {
            return Ok(existing);
        }
        let now = chrono::Utc::now();
        let review = Review {
            id: ReviewId::generate(),
            pull_id: pull_id.clone(),
            reviewer: reviewer.clone(),
            kind: ReviewKind::Pending,
            commit_id: commit_id.to_string(),
            content: String::new(),
            official: false,
            dismissed: false,
            stale: false,
            created_at: now,
            updated_at: now,
        };
        self.insert(&review)?;
        Ok(review)
    }

    fn list(&self, filter: ReviewFilter) -> Result<Vec<Review>, ReviewError> {
        let mut sql = format!("SELECT {COLUMNS} FROM reviews");
        let mut clauses = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(pull_id) = &filter.pull_id {
            clauses.push(format!("pull_id = ?{}", values.len() + 1));
            values.push(Box::new(pull_id.as_str().to_string()));
        }
        if let Some(reviewer) = &filter.reviewer {
            clauses.push(format!("reviewer = ?{}", values.len() + 1));
            values.push(Box::new(reviewer.as_str().to_string()));
        }
        if let Some(kind) = &filter.kind {
            clauses.push(format!("kind = ?{}", values.len() + 1));
            values.push(Box::new(encode_enum(kind).map_err(db_err)?));
        }
        if let Some(dismissed) = filter.dismissed {
            clauses.push(format!("dismissed = ?{}", values.len() + 1));
            values.push(Box::new(dismissed));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let params: Vec<&dyn ToSql> = values.iter().map(|value| value.as_ref()).collect();
        let mut rows = stmt.query(&params[..]).map_err(db_err)?;
        let mut reviews = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            reviews.push(map_review_row(row)?);
        }
        Ok(reviews)
    }

    fn finalize(&self, id: &ReviewId, input: FinalizeReviewInput) -> Result<Review, ReviewError> {
        let sql = "UPDATE reviews SET kind = ?1, content = ?2, commit_id = ?3, official = ?4, stale = ?5, updated_at = ?6 WHERE id = ?7 AND kind = 'Pending'";
        let params = (
            encode_enum(&input.kind).map_err(db_err)?,
            input.content,
            input.commit_id,
            input.official,
            input.stale,
            to_rfc3339(&chrono::Utc::now()),
            id.as_str(),
        );
        let changed = self.conn.execute(sql, params).map_err(db_err)?;
        if changed == 0 {
            return match self.get(id)? {
                Some(_) => Err(ReviewError::AlreadyTerminal),
                None => Err(ReviewError::ReviewNotFound),
            };
        }
        self.get(id)?.ok_or(ReviewError::ReviewNotFound)
    }

    fn create_submitted(&self, input: CreateSubmittedReviewInput) -> Result<Review, ReviewError> {
        if !input.kind.is_terminal() {
            return Err(ReviewError::InvalidInput {
                message: "submitted review must be terminal".to_string(),
            });
        }
        let now = chrono::Utc::now();
        let review = Review {
            id: ReviewId::generate(),
            pull_id: input.pull_id,
            reviewer: input.reviewer,
            kind: input.kind,
            commit_id: input.commit_id,
            content: input.content,
            official: input.official,
            dismissed: false,
            stale: input.stale,
            created_at: now,
            updated_at: now,
        };
        self.insert(&review)?;
        Ok(review)
    }

    fn set_dismissed(&self, id: &ReviewId, dismissed: bool) -> Result<Review, ReviewError> {
        let sql = "UPDATE reviews SET dismissed = ?1, updated_at = ?2 WHERE id = ?3";
        let params = (dismissed, to_rfc3339(&chrono::Utc::now()), id.as_str());
        let changed = self.conn.execute(sql, params).map_err(db_err)?;
        if changed == 0 {
            return Err(ReviewError::ReviewNotFound);
        }
        self.get(id)?.ok_or(ReviewError::ReviewNotFound)
    }
}

fn db_err(err: impl std::fmt::Display) -> ReviewError {
    ReviewError::InvalidInput {
        message: err.to_string(),
    }
}

fn map_review_row(row: &rusqlite::Row<'_>) -> Result<Review, ReviewError> {
    let id: String = row.get(0).map_err(db_err)?;
    let pull_id: String = row.get(1).map_err(db_err)?;
    let reviewer: String = row.get(2).map_err(db_err)?;
    let kind: String = row.get(3).map_err(db_err)?;
    let commit_id: String = row.get(4).map_err(db_err)?;
    let content: String = row.get(5).map_err(db_err)?;
    let official: bool = row.get(6).map_err(db_err)?;
    let dismissed: bool = row.get(7).map_err(db_err)?;
    let stale: bool = row.get(8).map_err(db_err)?;
    let created_at: String = row.get(9).map_err(db_err)?;
    let updated_at: String = row.get(10).map_err(db_err)?;

    Ok(Review {
        id: ReviewId::new(id).map_err(db_err)?,
        pull_id: PullId::new(pull_id).map_err(db_err)?,
        reviewer: UserId::new(reviewer).map_err(db_err)?,
        kind: decode_enum(&kind).map_err(db_err)?,
        commit_id,
        content,
        official,
        dismissed,
        stale,
        created_at: from_rfc3339(&created_at).map_err(db_err)?,
        updated_at: from_rfc3339(&updated_at).map_err(db_err)?,
    })
}
