use rusqlite::{Connection, Result};

pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    let sql = include_str!("../migrations/0001_init.sql");
    conn.execute_batch(sql)?;
    Ok(())
}

pub fn open_and_migrate(path: &str) -> Result<Connection> {
    let conn = open(path)?;
    migrate(&conn)?;
    Ok(conn)
}

pub fn with_test_db() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    migrate(&conn)?;
    Ok(conn)
}

/// Parent-row seeds for repo tests; reviews and comments carry foreign keys
/// into pulls and users.
#[cfg(test)]
pub(crate) mod fixtures {
    use crate::pull_repo::PullRepo;
    use crate::user_repo::UserRepo;
    use perch_core::pulls::PullRepository;
    use perch_core::types::{CreateUserInput, Pull, PullId, RepoId, UserId};
    use perch_core::users::UserRepository;
    use rusqlite::Connection;

    pub fn seeded_user(conn: &Connection, handle: &str) -> UserId {
        UserRepo::new(conn)
            .create(CreateUserInput {
                handle: handle.to_string(),
                display_name: handle.to_uppercase(),
            })
            .unwrap()
            .id
    }

    pub fn seeded_pull(conn: &Connection, author: &UserId) -> PullId {
        let now = chrono::Utc::now();
        PullRepo::new(conn)
            .create(Pull {
                id: PullId::generate(),
                repo_id: RepoId::generate(),
                index: 1,
                author: author.clone(),
                title: "Teach the parser about trailers".to_string(),
                base_ref: "main".to_string(),
                head_ref: "feature/trailers".to_string(),
                merge_base: "0123456789abcdef0123456789abcdef01234567".to_string(),
                created_at: now,
                updated_at: now,
            })
            .unwrap()
            .id
    }
}
