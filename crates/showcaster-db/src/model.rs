//! Row types for the relational half of Show/Event. These map 1:1 onto
//! [`crate::schema`] and never carry the temporal fields CalStore owns.

use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{events, shows};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = shows, check_for_backend(diesel::pg::Pg))]
pub struct ShowRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = shows)]
pub struct NewShowRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

/// Field-level changeset for the `shows` table. Does NOT carry `id`: diesel's
/// `AsChangeset` derive silently omits the primary-key column from the generated
/// `SET` clause, so a rename has to go through an explicit `diesel::update(...).set
/// (shows::id.eq(new_id))` in the gateway instead (see `gateway::show::update`).
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = shows)]
pub struct ShowChangeset {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

impl ShowChangeset {
    /// `true` when every field is "leave as-is": diesel's `UpdateStatement` errors
    /// at runtime on an empty `SET` clause, so callers must short-circuit to a plain
    /// read instead of issuing the update (§8.5: an empty delta must behave like `get`).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = events, check_for_backend(diesel::pg::Pg))]
pub struct EventRow {
    pub id: Uuid,
    pub event_type: String,
    pub show_id: Uuid,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = events)]
pub struct NewEventRow {
    pub id: Uuid,
    pub event_type: String,
    pub show_id: Uuid,
}

/// Field-level changeset for the `events` table. Does NOT carry `id`, for the same
/// reason as [`ShowChangeset`]: a primary-key reissue (§4.6's `update` state machine)
/// goes through an explicit `diesel::update(...).set(events::id.eq(new_id))` in
/// `gateway::event::update` rather than through this `AsChangeset`.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = events)]
pub struct EventChangeset {
    pub event_type: Option<String>,
    pub show_id: Option<Uuid>,
}

impl EventChangeset {
    /// `true` when every field is "leave as-is" (see [`ShowChangeset::is_empty`]).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.event_type.is_none() && self.show_id.is_none()
    }
}
