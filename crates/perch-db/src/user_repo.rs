use crate::util::{from_rfc3339, to_rfc3339};
use perch_core::error::UserError;
use perch_core::types::{CreateUserInput, User, UserId};
use perch_core::users::UserRepository;
use rusqlite::Connection;

pub struct UserRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> UserRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl<'a> UserRepository for UserRepo<'a> {
    fn create(&self, input: CreateUserInput) -> Result<User, UserError> {
        let user = User {
            id: UserId::generate(),
            handle: input.handle,
            display_name: input.display_name,
            created_at: chrono::Utc::now(),
        };
        let sql = "INSERT INTO users (id, handle, display_name, created_at) VALUES (?1, ?2, ?3, ?4)";
        let params = (
            user.id.as_str(),
            user.handle.clone(),
            user.display_name.clone(),
            to_rfc3339(&user.created_at),
        );
        self.conn.execute(sql, params).map_err(|err| match err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                UserError::HandleTaken {
                    handle: user.handle.clone(),
                }
            }
            other => db_err(other),
        })?;
        Ok(user)
    }

    fn get(&self, id: &UserId) -> Result<Option<User>, UserError> {
        let sql = "SELECT id, handle, display_name, created_at FROM users WHERE id = ?1";
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let mut rows = stmt.query([id.as_str()]).map_err(db_err)?;
        let Some(row) = rows.next().map_err(db_err)? else {
            return Ok(None);
        };
        map_user_row(row).map(Some)
    }

    fn get_by_handle(&self, handle: &str) -> Result<Option<User>, UserError> {
        let sql = "SELECT id, handle, display_name, created_at FROM users WHERE handle = ?1";
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let mut rows = stmt.query([handle]).map_err(db_err)?;
        let Some(row) = rows.next().map_err(db_err)? else {
            return Ok(None);
        };
        map_user_row(row).map(Some)
    }
}

fn db_err(err: impl std::fmt::Display) -> UserError {
    UserError::InvalidInput {
        message: err.to_string(),
    }
}

fn map_user_row(row: &rusqlite::Row<'_>) -> Result<User, UserError> {
    let id: String = row.get(0).map_err(db_err)?;
    let handle: String = row.get(1).map_err(db_err)?;
    let display_name: String = row.get(2).map_err(db_err)?;
    let created_at: String = row.get(3).map_err(db_err)?;

    Ok(User {
        id: UserId::new(id).map_err(db_err)?,
        handle,
        display_name,
        created_at: from_rfc3339(&created_at).map_err(db_err)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::with_test_db;

    fn input(handle: &str) -> CreateUserInput {
        CreateUserInput {
            handle: handle.to_string(),
            display_name: handle.to_uppercase(),
        }
    }

    #[test]
    fn test_create_and_lookup_by_handle() {
        let conn = with_test_db().unwrap();
        let repo = UserRepo::new(&conn);
        let user = repo.create(input("mallory")).unwrap();
        assert_eq!(repo.get(&user.id).unwrap().unwrap(), user);
        assert_eq!(repo.get_by_handle("mallory").unwrap().unwrap(), user);
        assert!(repo.get_by_handle("nobody").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_handle_is_rejected() {
        let conn = with_test_db().unwrap();
        let repo = UserRepo::new(&conn);
        repo.create(input("mallory")).unwrap();
        let err = repo.create(input("mallory")).unwrap_err();
        assert!(matches!(err, UserError::HandleTaken { handle } if handle == "mallory"));
    }
}
