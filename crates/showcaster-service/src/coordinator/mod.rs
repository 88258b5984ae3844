//! C6/C7 Coordinators: the only mutators of Show/Event state, composing the RelStore
//! Gateway (C5), CalStore Client (C3), Query Planner (C4) and Event Bus (C8) into the
//! public count/list/get/create/update/delete operations (§4.6, §4.7).

pub mod event;
pub mod show;

pub use event::{EventCoordinator, EventCreateInput, EventOrderBy, EventOrderKey, EventUpdateInput};
pub use show::{ShowCoordinator, ShowCreateInput, ShowUpdateInput};

use showcaster_core::model::{Event, Show};
use showcaster_db::filter::Direction;
use showcaster_db::model::{EventRow, ShowRow};
use showcaster_ical::CalEvent;

/// Composes a RelStore row with its CalStore counterpart into the public `Event`
/// shape (§4.6's "merge rule": identity/type/show from SQL, start/end/timezone/
/// recurrence from the VEVENT).
pub(crate) fn merge_event(row: EventRow, cal: CalEvent, show: Option<ShowRow>) -> Event {
    Event {
        id: row.id,
        event_type: row.event_type,
        show_id: row.show_id,
        start: cal.start,
        end: cal.end,
        timezone: cal.timezone,
        recurrence: cal.recurrence,
        show: show.map(|show| Show {
            id: show.id,
            title: show.title,
            description: show.description,
            events: None,
        }),
    }
}

pub(crate) fn show_row_to_show(row: ShowRow, events: Option<Vec<Event>>) -> Show {
    Show {
        id: row.id,
        title: row.title,
        description: row.description,
        events,
    }
}

/// Splits a caller-supplied ordering list into the prefix diesel can express in SQL
/// and the suffix of temporal keys (`start`/`end`/`timezone`) the Coordinator must
/// sort in memory after the CalStore merge (§4.5 "Ordering", §9 "Temporal ordering
/// outside SQL"). Keys do not need to be contiguous; each list preserves the
/// original relative order of its own kind.
pub(crate) fn split_event_order(
    order: &[EventOrderBy],
) -> (
    Vec<showcaster_db::filter::EventOrderBy>,
    Vec<EventOrderBy>,
) {
    let mut sql = Vec::new();
    let mut temporal = Vec::new();
    for entry in order {
        let direction = entry.direction;
        match entry.key {
            EventOrderKey::Id => sql.push(showcaster_db::filter::EventOrderBy {
                key: showcaster_db::filter::EventOrderKey::Id,
                direction,
            }),
            EventOrderKey::Type => sql.push(showcaster_db::filter::EventOrderBy {
                key: showcaster_db::filter::EventOrderKey::Type,
                direction,
            }),
            EventOrderKey::ShowId => sql.push(showcaster_db::filter::EventOrderBy {
                key: showcaster_db::filter::EventOrderKey::ShowId,
                direction,
            }),
            EventOrderKey::Start | EventOrderKey::End | EventOrderKey::Timezone => {
                temporal.push(*entry);
            }
        }
    }
    (sql, temporal)
}

/// Applies `temporal` as a stable in-memory sort over already SQL-ordered events: the
/// last key in the list is primary, so keys are applied in reverse (§4.6 "stable sort:
/// last key primary, earlier keys secondary; i.e. iterate reversed").
pub(crate) fn apply_temporal_order(events: &mut [Event], temporal: &[EventOrderBy]) {
    for entry in temporal.iter().rev() {
        match entry.direction {
            Direction::Asc => events.sort_by(|a, b| compare_temporal(a, b, entry.key)),
            Direction::Desc => events.sort_by(|a, b| compare_temporal(b, a, entry.key)),
        }
    }
}

fn compare_temporal(a: &Event, b: &Event, key: EventOrderKey) -> std::cmp::Ordering {
    match key {
        EventOrderKey::Start => a.start.cmp(&b.start),
        EventOrderKey::End => a.end.cmp(&b.end),
        EventOrderKey::Timezone => a.timezone.cmp(&b.timezone),
        EventOrderKey::Id | EventOrderKey::Type | EventOrderKey::ShowId => std::cmp::Ordering::Equal,
    }
}
