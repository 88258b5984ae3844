//! C6 Event Coordinator: composes the RelStore Gateway, CalStore Client and Query
//! Planner into the public Event operations, fires bus notifications after a
//! successful mutation (§4.6).

use chrono::{NaiveDateTime, Utc};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::AsyncConnection;
use uuid::Uuid;

use showcaster_core::model::{ChangeEvent, ChangeEventKind, Event, EventId, Recurrence, ShowId};
use showcaster_db::DbPool;
use showcaster_db::error::DbError;
use showcaster_db::filter::{Direction, EventWhereInput, EventWhereUnique};
use showcaster_db::model::{EventChangeset, NewEventRow};
use showcaster_ical::CalEvent;

use crate::bus::EventBus;
use crate::calstore::CalStoreClient;
use crate::error::{ServiceError, ServiceResult};
use crate::query::Query;
use crate::validation::validate_event_temporal;

use super::{apply_temporal_order, merge_event, split_event_order};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrderKey {
    Id,
    Type,
    ShowId,
    Start,
    End,
    Timezone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOrderBy {
    pub key: EventOrderKey,
    pub direction: Direction,
}

/// Body of a `create` call: mirrors the HTTP `EventCreateInput` shape (§6), though the
/// HTTP binding itself is out of scope.
#[derive(Debug, Clone)]
pub struct EventCreateInput {
    pub id: Option<EventId>,
    pub event_type: String,
    pub show_id: ShowId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub timezone: String,
    pub recurrence: Option<Recurrence>,
}

/// Body of an `update` call. Every field is optional; an absent field leaves the
/// current value untouched. `id` reissues the event's primary key (§4.6's update
/// state machine).
#[derive(Debug, Clone, Default)]
pub struct EventUpdateInput {
    pub id: Option<EventId>,
    pub event_type: Option<String>,
    pub show_id: Option<ShowId>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub timezone: Option<String>,
    pub recurrence: Option<Option<Recurrence>>,
}

pub struct EventCoordinator {
    pool: DbPool,
    cal: CalStoreClient,
    bus: EventBus,
}

impl EventCoordinator {
    #[must_use]
    pub fn new(pool: DbPool, cal: CalStoreClient, bus: EventBus) -> Self {
        Self { pool, cal, bus }
    }

    async fn fused_where(
        &self,
        mut where_: EventWhereInput,
        query: Option<&Query>,
    ) -> ServiceResult<EventWhereInput> {
        if let Some(query) = query {
            let xml = crate::query::build_report_xml(query)?;
            let multistatus = self.cal.query(xml).await?;
            let ids = crate::query::extract_uids(&multistatus)?;
            where_ = where_.fuse_ids(ids);
        }
        Ok(where_)
    }

    /// ## Errors
    /// Returns a `ServiceError` on a RelStore or CalStore failure.
    #[tracing::instrument(skip(self, where_, query))]
    pub async fn count(&self, where_: EventWhereInput, query: Option<Query>) -> ServiceResult<i64> {
        let where_ = self.fused_where(where_, query.as_ref()).await?;
        let mut conn = self.pool.get().await.map_err(DbError::from)?;
        let count = showcaster_db::gateway::event::count(&mut conn, &where_).await?;
        Ok(count)
    }

    /// ## Errors
    /// Returns a `ServiceError` on a RelStore or CalStore failure.
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip(self, where_, query, order))]
    pub async fn list(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
        where_: EventWhereInput,
        query: Option<Query>,
        include: showcaster_db::filter::EventInclude,
        order: &[EventOrderBy],
    ) -> ServiceResult<Vec<Event>> {
        let where_ = self.fused_where(where_, query.as_ref()).await?;
        let (sql_order, temporal_order) = split_event_order(order);

        let mut conn = self.pool.get().await.map_err(DbError::from)?;
        let rows = showcaster_db::gateway::event::find_many(
            &mut conn, limit, offset, &where_, &sql_order, include,
        )
        .await?;

        let mut events = Vec::with_capacity(rows.len());
        for with_include in rows {
            let cal_event = self.fetch_cal_event(with_include.row.id).await?;
            events.push(merge_event(with_include.row, cal_event, with_include.show));
        }

        apply_temporal_order(&mut events, &temporal_order);
        Ok(events)
    }

    /// ## Errors
    /// Returns a `ServiceError` on a RelStore or CalStore failure, or
    /// `InvariantViolation` if the SQL row exists with no matching VEVENT.
    #[tracing::instrument(skip(self))]
    pub async fn get(
        &self,
        where_unique: EventWhereUnique,
        include: showcaster_db::filter::EventInclude,
    ) -> ServiceResult<Option<Event>> {
        let mut conn = self.pool.get().await.map_err(DbError::from)?;
        let Some(with_include) =
            showcaster_db::gateway::event::find_unique(&mut conn, where_unique, include).await?
        else {
            return Ok(None);
        };

        let cal_event = self.fetch_cal_event(with_include.row.id).await?;
        Ok(Some(merge_event(with_include.row, cal_event, with_include.show)))
    }

    async fn fetch_cal_event(&self, id: Uuid) -> ServiceResult<CalEvent> {
        match self.cal.get_event(id).await {
            Ok(text) => Ok(showcaster_ical::decode(&text)?),
            Err(err) if err.is_not_found() => Err(ServiceError::InvariantViolation(
                "RelStore row present but no matching VEVENT in CalStore",
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Inserts the relational row inside its own RelStore transaction, then PUTs the
    /// VEVENT (§4.6, §5: "RelStore mutations commit strictly before CalStore
    /// mutations"). A PUT failure after a successful insert triggers a best-effort
    /// compensating delete of the row just inserted.
    ///
    /// ## Errors
    /// Returns a `ServiceError::Validation` for a malformed `data`, or a `Store`/
    /// `Calendar` error from the underlying stores.
    #[tracing::instrument(skip(self, data))]
    pub async fn create(
        &self,
        data: EventCreateInput,
        include: showcaster_db::filter::EventInclude,
    ) -> ServiceResult<Event> {
        validate_event_temporal(data.start, data.end, &data.timezone, data.recurrence.as_ref())?;

        let id = data.id.unwrap_or_else(Uuid::new_v4);
        let cal_event = CalEvent {
            id,
            start: data.start,
            end: data.end,
            timezone: data.timezone.clone(),
            recurrence: data.recurrence.clone(),
        };
        let ical_text = showcaster_ical::encode(&cal_event)?;

        let mut conn = self.pool.get().await.map_err(DbError::from)?;
        let new_row = NewEventRow {
            id,
            event_type: data.event_type,
            show_id: data.show_id,
        };
        let created = conn
            .transaction::<_, ServiceError, _>(move |tx| {
                async move { Ok(showcaster_db::gateway::event::create(tx, new_row, include).await?) }
                    .scope_boxed()
            })
            .await?;

        if let Err(err) = self.cal.put_event(id, ical_text).await {
            tracing::warn!(event_id = %id, error = %err, "CalStore PUT failed after SQL insert, compensating");
            if let Ok(mut conn) = self.pool.get().await {
                let _ = showcaster_db::gateway::event::delete(
                    &mut conn,
                    EventWhereUnique { id },
                    showcaster_db::filter::EventInclude::default(),
                )
                .await;
            }
            return Err(err.into());
        }

        let event = merge_event(created.row, cal_event, created.show);
        self.bus.publish(ChangeEvent::event(ChangeEventKind::EventCreated, Utc::now(), event.clone()));
        Ok(event)
    }

    /// Runs the whole state machine — SQL update, VEVENT reconciliation — inside one
    /// transaction: a CalStore failure rolls back the SQL update too (§4.6's state
    /// machine: "Any CalStore error in `SqlUpdated`…`CalReconciled` fails the outer
    /// transaction").
    ///
    /// ## Errors
    /// Returns `ServiceError::Validation` for a malformed delta, or a `Store`/
    /// `Calendar`/`InvariantViolation` error from the underlying stores.
    #[tracing::instrument(skip(self, data))]
    pub async fn update(
        &self,
        data: EventUpdateInput,
        where_unique: EventWhereUnique,
        include: showcaster_db::filter::EventInclude,
    ) -> ServiceResult<Option<Event>> {
        let old_id = where_unique.id;
        let new_id = data.id.unwrap_or(old_id);
        let cal = self.cal.clone();

        let outcome = {
            let mut conn = self.pool.get().await.map_err(DbError::from)?;
            conn.transaction::<_, ServiceError, _>(move |tx| {
                async move {
                    let changeset = EventChangeset {
                        event_type: data.event_type,
                        show_id: data.show_id,
                    };
                    let id_change = (new_id != old_id).then_some(new_id);
                    let Some(updated) = showcaster_db::gateway::event::update(
                        tx,
                        id_change,
                        changeset,
                        where_unique,
                        include,
                    )
                    .await?
                    else {
                        return Ok(None);
                    };

                    let old_text = cal.get_event(old_id).await.map_err(|err| {
                        if err.is_not_found() {
                            ServiceError::InvariantViolation(
                                "RelStore row present but no matching VEVENT in CalStore",
                            )
                        } else {
                            err.into()
                        }
                    })?;
                    let mut cal_event = showcaster_ical::decode(&old_text)?;
                    cal_event.id = new_id;
                    if let Some(start) = data.start {
                        cal_event.start = start;
                    }
                    if let Some(end) = data.end {
                        cal_event.end = end;
                    }
                    if let Some(timezone) = data.timezone {
                        cal_event.timezone = timezone;
                    }
                    if let Some(recurrence) = data.recurrence {
                        cal_event.recurrence = recurrence;
                    }
                    validate_event_temporal(
                        cal_event.start,
                        cal_event.end,
                        &cal_event.timezone,
                        cal_event.recurrence.as_ref(),
                    )?;

                    let new_text = showcaster_ical::encode(&cal_event)?;
                    if new_id != old_id {
                        cal.delete_event(old_id).await?;
                    }
                    cal.put_event(new_id, new_text).await?;

                    Ok(Some(merge_event(updated.row, cal_event, updated.show)))
                }
                .scope_boxed()
            })
            .await?
        };

        if let Some(event) = &outcome {
            self.bus.publish(ChangeEvent::event(ChangeEventKind::EventUpdated, Utc::now(), event.clone()));
        }
        Ok(outcome)
    }

    /// Deletes the SQL row first (committing), then reads and deletes the matching
    /// VEVENT (§4.6, §5's "delete read path" ordering).
    ///
    /// ## Errors
    /// Returns a `ServiceError` on a RelStore or CalStore failure.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, where_unique: EventWhereUnique) -> ServiceResult<Option<Event>> {
        let mut conn = self.pool.get().await.map_err(DbError::from)?;
        let Some(deleted) = showcaster_db::gateway::event::delete(
            &mut conn,
            where_unique,
            showcaster_db::filter::EventInclude::default(),
        )
        .await?
        else {
            return Ok(None);
        };

        let cal_event = self.fetch_cal_event(deleted.row.id).await?;
        self.cal.delete_event(deleted.row.id).await?;

        let event = merge_event(deleted.row, cal_event, deleted.show);
        self.bus.publish(ChangeEvent::event(ChangeEventKind::EventDeleted, Utc::now(), event.clone()));
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_split_preserves_relative_order_within_kind() {
        let order = vec![
            EventOrderBy { key: EventOrderKey::Start, direction: Direction::Asc },
            EventOrderBy { key: EventOrderKey::Id, direction: Direction::Desc },
            EventOrderBy { key: EventOrderKey::End, direction: Direction::Desc },
        ];
        let (sql, temporal) = split_event_order(&order);
        assert_eq!(sql.len(), 1);
        assert_eq!(temporal.len(), 2);
        assert_eq!(temporal[0].key, EventOrderKey::Start);
        assert_eq!(temporal[1].key, EventOrderKey::End);
    }
}
