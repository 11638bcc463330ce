use perch_core::PerchError;
use perch_core::store::Store;
use rusqlite::Connection;

use crate::comment_repo::CommentRepo;
use crate::event_repo::EventRepo;
use crate::pull_repo::PullRepo;
use crate::review_repo::ReviewRepo;
use crate::user_repo::UserRepo;

pub struct DbStore {
    conn: Connection,
}

impl DbStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Store for DbStore {
    type Pulls<'a>
        = PullRepo<'a>
    where
        Self: 'a;
    type Users<'a>
        = UserRepo<'a>
    where
        Self: 'a;
    type Reviews<'a>
        = ReviewRepo<'a>
    where
        Self: 'a;
    type Comments<'a>
        = CommentRepo<'a>
    where
        Self: 'a;
    type Events<'a>
        = EventRepo<'a>
    where
        Self: 'a;

    fn pulls(&self) -> Self::Pulls<'_> {
        PullRepo::new(&self.conn)
    }

    fn users(&self) -> Self::Users<'_> {
        UserRepo::new(&self.conn)
    }

    fn reviews(&self) -> Self::Reviews<'_> {
        ReviewRepo::new(&self.conn)
    }

    fn comments(&self) -> Self::Comments<'_> {
        CommentRepo::new(&self.conn)
    }

    fn events(&self) -> Self::Events<'_> {
        EventRepo::new(&self.conn)
    }

    fn with_tx<F, T>(&self, f: F) -> Result<T, PerchError>
    where
        F: FnOnce(&Self) -> Result<T, PerchError>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|err| PerchError::Internal {
                message: err.to_string(),
            })?;
        let result = f(self);
        match result {
            Ok(value) => {
                self.conn
                    .execute_batch("COMMIT")
                    .map_err(|err| PerchError::Internal {
                        message: err.to_string(),
                    })?;
                Ok(value)
            }
            Err(err) => {
                self.conn
                    .execute_batch("ROLLBACK")
                    .map_err(|rollback_err| PerchError::Internal {
                        message: rollback_err.to_string(),
                    })?;
                Err(err)
            }
        }
    }
}
