//! The temporal half of an Event: exactly what a VEVENT can express. The relational
//! half (type, show) lives only in RelStore and is merged in by the Event Coordinator.

use chrono::NaiveDateTime;
use showcaster_core::model::{EventId, Recurrence};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalEvent {
    pub id: EventId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub timezone: String,
    pub recurrence: Option<Recurrence>,
}
