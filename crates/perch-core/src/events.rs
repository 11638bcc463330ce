use crate::error::PerchError;
use perch_events::types::EventRecord;

pub trait EventRepository {
    fn append(&self, event: EventRecord) -> Result<EventRecord, PerchError>;
    fn list(&self, after: Option<i64>, limit: Option<u32>) -> Result<Vec<EventRecord>, PerchError>;
}
