use crate::util::{decode_enum, decode_json, encode_enum, encode_json, from_rfc3339, to_rfc3339};
use perch_core::error::PerchError;
use perch_core::events::EventRepository;
use perch_events::types::EventRecord;
use rusqlite::Connection;
use ulid::Ulid;

pub struct EventRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> EventRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl<'a> EventRepository for EventRepo<'a> {
    fn append(&self, mut event: EventRecord) -> Result<EventRecord, PerchError> {
        event.seq = next_seq(self.conn)?;
        event.id = format!("evt_{}", Ulid::new());
        let sql = "INSERT INTO events (id, seq, at, correlation_id, source, body_json) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
        let params = (
            event.id.clone(),
            event.seq,
            to_rfc3339(&event.at),
            event.correlation_id.clone(),
            encode_enum(&event.source).map_err(db_err)?,
            encode_json(&event.body).map_err(db_err)?,
        );
        self.conn.execute(sql, params).map_err(db_err)?;
        Ok(event)
    }

    fn list(&self, after: Option<i64>, limit: Option<u32>) -> Result<Vec<EventRecord>, PerchError> {
        let mut sql = "SELECT id, seq, at, correlation_id, source, body_json FROM events".to_string();
        if after.is_some() {
            sql.push_str(" WHERE seq > ?1");
        }
        sql.push_str(" ORDER BY seq ASC");
        if limit.is_some() {
            sql.push_str(if after.is_some() { " LIMIT ?2" } else { " LIMIT ?1" });
        }

        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let mut rows = match (after, limit) {
            (Some(after), Some(limit)) => {
                stmt.query(rusqlite::params![after, limit]).map_err(db_err)?
            }
            (Some(after), None) => stmt.query(rusqlite::params![after]).map_err(db_err)?,
            (None, Some(limit)) => stmt.query(rusqlite::params![limit]).map_err(db_err)?,
            (None, None) => stmt.query([]).map_err(db_err)?,
        };
        let mut events = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            events.push(map_event_row(row)?);
        }
        Ok(events)
    }
}

fn db_err(err: impl std::fmt::Display) -> PerchError {
    PerchError::Internal {
        message: err.to_string(),
    }
}

fn map_event_row(row: &rusqlite::Row<'_>) -> Result<EventRecord, PerchError> {
    let id: String = row.get(0).map_err(db_err)?;
    let seq: i64 = row.get(1).map_err(db_err)?;
    let at: String = row.get(2).map_err(db_err)?;
    let correlation_id: Option<String> = row.get(3).map_err(db_err)?;
    let source: String = row.get(4).map_err(db_err)?;
    let body_json: String = row.get(5).map_err(db_err)?;

    Ok(EventRecord {
        id,
        seq,
        at: from_rfc3339(&at).map_err(db_err)?,
        correlation_id,
        source: decode_enum(&source).map_err(db_err)?,
        body: decode_json(&body_json).map_err(db_err)?,
    })
}

fn next_seq(conn: &Connection) -> Result<i64, PerchError> {
    let mut stmt = conn
        .prepare("SELECT COALESCE(MAX(seq), 0) FROM events")
        .map_err(db_err)?;
    let seq: i64 = stmt.query_row([], |row| row.get(0)).map_err(db_err)?;
    Ok(seq + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::with_test_db;
    use perch_events::types::EventSource;

    fn record(note: &str) -> EventRecord {
        EventRecord {
            id: String::new(),
            seq: 0,
            at: chrono::Utc::now(),
            correlation_id: Some("corr-1".to_string()),
            source: EventSource::Cli,
            body: serde_json::json!({ "note": note }),
        }
    }

    #[test]
    fn test_append_assigns_monotonic_seq() {
        let conn = with_test_db().unwrap();
        let repo = EventRepo::new(&conn);
        let first = repo.append(record("one")).unwrap();
        let second = repo.append(record("two")).unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert!(first.id.starts_with("evt_"));
    }

    #[test]
    fn test_list_after_and_limit() {
        let conn = with_test_db().unwrap();
        let repo = EventRepo::new(&conn);
        for n in 0..5 {
            repo.append(record(&format!("event {n}"))).unwrap();
        }
        let all = repo.list(None, None).unwrap();
        assert_eq!(all.len(), 5);
        let tail = repo.list(Some(3), None).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].seq, 4);
        let page = repo.list(Some(1), Some(2)).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].seq, 2);
        assert_eq!(page[1].body["note"], "event 2");
    }
}
