//! C7 Show Coordinator: mirrors the Event Coordinator for Shows. `count`/`list`/`get`/
//! `create`/`delete` are plain SQL operations with bus notifications; `update` carries
//! the one non-trivial case of a primary-key rename migrating dependent events
//! (§4.7).

use chrono::Utc;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::AsyncConnection;
use uuid::Uuid;

use showcaster_core::model::{ChangeEvent, ChangeEventKind, Event, Show, ShowId};
use showcaster_db::DbPool;
use showcaster_db::error::DbError;
use showcaster_db::filter::{EventWhereInput, ShowInclude, ShowOrderBy, ShowWhereInput, ShowWhereUnique};
use showcaster_db::model::{EventRow, NewEventRow, NewShowRow, ShowChangeset, ShowRow};
use showcaster_ical::CalEvent;

use crate::bus::EventBus;
use crate::calstore::CalStoreClient;
use crate::error::{ServiceError, ServiceResult};
use crate::validation::validate_show_title;

use super::merge_event;

#[derive(Debug, Clone)]
pub struct ShowCreateInput {
    pub id: Option<ShowId>,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ShowUpdateInput {
    /// Reissuing the show's primary key triggers the dependent-event migration
    /// described in §4.7.
    pub id: Option<ShowId>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

pub struct ShowCoordinator {
    pool: DbPool,
    cal: CalStoreClient,
    bus: EventBus,
}

impl ShowCoordinator {
    #[must_use]
    pub fn new(pool: DbPool, cal: CalStoreClient, bus: EventBus) -> Self {
        Self { pool, cal, bus }
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

    async fn hydrate_events(&self, rows: Vec<EventRow>) -> ServiceResult<Vec<Event>> {
        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let cal_event = self.fetch_cal_event(row.id).await?;
            events.push(merge_event(row, cal_event, None));
        }
        Ok(events)
    }

    async fn to_show(&self, row: ShowRow, events: Option<Vec<EventRow>>) -> ServiceResult<Show> {
        let events = match events {
            Some(rows) => Some(self.hydrate_events(rows).await?),
            None => None,
        };
        Ok(super::show_row_to_show(row, events))
    }

    /// ## Errors
    /// Returns a `ServiceError` on a RelStore failure.
    #[tracing::instrument(skip(self, where_))]
    pub async fn count(&self, where_: ShowWhereInput) -> ServiceResult<i64> {
        let mut conn = self.pool.get().await.map_err(DbError::from)?;
        Ok(showcaster_db::gateway::show::count(&mut conn, &where_).await?)
    }

    /// ## Errors
    /// Returns a `ServiceError` on a RelStore or CalStore failure.
    #[tracing::instrument(skip(self, where_, order))]
    pub async fn list(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
        where_: ShowWhereInput,
        include: ShowInclude,
        order: &[ShowOrderBy],
    ) -> ServiceResult<Vec<Show>> {
        let mut conn = self.pool.get().await.map_err(DbError::from)?;
        let rows =
            showcaster_db::gateway::show::find_many(&mut conn, limit, offset, &where_, order, include)
                .await?;

        let mut shows = Vec::with_capacity(rows.len());
        for with_include in rows {
            shows.push(self.to_show(with_include.row, with_include.events).await?);
        }
        Ok(shows)
    }

    /// ## Errors
    /// Returns a `ServiceError` on a RelStore or CalStore failure.
    #[tracing::instrument(skip(self))]
    pub async fn get(
        &self,
        where_unique: ShowWhereUnique,
        include: ShowInclude,
    ) -> ServiceResult<Option<Show>> {
        let mut conn = self.pool.get().await.map_err(DbError::from)?;
        let Some(with_include) =
            showcaster_db::gateway::show::find_unique(&mut conn, where_unique, include).await?
        else {
            return Ok(None);
        };
        Ok(Some(self.to_show(with_include.row, with_include.events).await?))
    }

    /// ## Errors
    /// Returns `ServiceError::Validation` for an empty title, or a `Store` error.
    #[tracing::instrument(skip(self, data))]
    pub async fn create(&self, data: ShowCreateInput, include: ShowInclude) -> ServiceResult<Show> {
        validate_show_title(&data.title)?;
        let new_row = NewShowRow {
            id: data.id.unwrap_or_else(Uuid::new_v4),
            title: data.title,
            description: data.description,
        };

        let mut conn = self.pool.get().await.map_err(DbError::from)?;
        let created = showcaster_db::gateway::show::create(&mut conn, new_row, include).await?;
        let show = self.to_show(created.row, created.events).await?;

        self.bus.publish(ChangeEvent::show(ChangeEventKind::ShowCreated, Utc::now(), show.clone()));
        Ok(show)
    }

    /// Plain field update when the id is unchanged; a full snapshot/delete/recreate
    /// migration when it is (§4.7), all inside one RelStore transaction. After commit,
    /// publishes `show-updated` then one `event-updated` per migrated event.
    ///
    /// ## Errors
    /// Returns `ServiceError::Validation` for an empty title, or a `Store`/`Calendar`
    /// error from the underlying stores.
    #[tracing::instrument(skip(self, data))]
    pub async fn update(
        &self,
        data: ShowUpdateInput,
        where_unique: ShowWhereUnique,
        include: ShowInclude,
    ) -> ServiceResult<Option<Show>> {
        if let Some(title) = &data.title {
            validate_show_title(title)?;
        }
        let old_id = where_unique.id;
        let new_id = data.id.unwrap_or(old_id);
        let renamed = new_id != old_id;

        let mut conn = self.pool.get().await.map_err(DbError::from)?;
        let outcome = conn
            .transaction::<_, ServiceError, _>(move |tx| {
                async move {
                    if renamed {
                        let affected = showcaster_db::gateway::event::find_by_show(tx, old_id).await?;
                        showcaster_db::gateway::event::delete_many(
                            tx,
                            &EventWhereInput {
                                show_id: Some(old_id),
                                ..EventWhereInput::default()
                            },
                        )
                        .await?;

                        let changeset = ShowChangeset {
                            title: data.title,
                            description: data.description,
                        };
                        let Some(updated) = showcaster_db::gateway::show::update(
                            tx,
                            Some(new_id),
                            changeset,
                            where_unique,
                            include,
                        )
                        .await?
                        else {
                            return Ok(None);
                        };

                        let new_rows: Vec<NewEventRow> = affected
                            .iter()
                            .map(|event| NewEventRow {
                                id: event.id,
                                event_type: event.event_type.clone(),
                                show_id: new_id,
                            })
                            .collect();
                        showcaster_db::gateway::event::create_many(tx, &new_rows).await?;

                        let ids: Vec<Uuid> = affected.iter().map(|event| event.id).collect();
                        let migrated = showcaster_db::gateway::event::find_many(
                            tx,
                            None,
                            None,
                            &EventWhereInput { ids: Some(ids), ..EventWhereInput::default() },
                            &[],
                            showcaster_db::filter::EventInclude::default(),
                        )
                        .await?;

                        Ok(Some((
                            updated,
                            migrated.into_iter().map(|with_include| with_include.row).collect::<Vec<_>>(),
                        )))
                    } else {
                        let changeset = ShowChangeset {
                            title: data.title,
                            description: data.description,
                        };
                        let updated =
                            showcaster_db::gateway::show::update(tx, None, changeset, where_unique, include)
                                .await?;
                        Ok(updated.map(|updated| (updated, Vec::new())))
                    }
                }
                .scope_boxed()
            })
            .await?;

        let Some((updated_show, migrated_rows)) = outcome else {
            return Ok(None);
        };

        let show = if renamed && include.events {
            self.to_show(updated_show.row, Some(migrated_rows.clone())).await?
        } else {
            self.to_show(updated_show.row, updated_show.events).await?
        };

        self.bus.publish(ChangeEvent::show(ChangeEventKind::ShowUpdated, Utc::now(), show.clone()));
        for row in migrated_rows {
            let cal_event = self.fetch_cal_event(row.id).await?;
            let event = merge_event(row, cal_event, None);
            self.bus
                .publish(ChangeEvent::event(ChangeEventKind::EventUpdated, Utc::now(), event));
        }

        Ok(Some(show))
    }

    /// Cascades: collects referenced events, deletes the SQL rows (show then events,
    /// in one transaction), then deletes each VEVENT in CalStore; publishes
    /// `show-deleted` then `event-deleted` per event (§4.7).
    ///
    /// ## Errors
    /// Returns a `ServiceError` on a RelStore or CalStore failure.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, where_unique: ShowWhereUnique) -> ServiceResult<Option<Show>> {
        let show_id = where_unique.id;
        let mut conn = self.pool.get().await.map_err(DbError::from)?;
        let outcome = conn
            .transaction::<_, ServiceError, _>(move |tx| {
                async move {
                    let affected = showcaster_db::gateway::event::find_by_show(tx, show_id).await?;
                    showcaster_db::gateway::event::delete_many(
                        tx,
                        &EventWhereInput { show_id: Some(show_id), ..EventWhereInput::default() },
                    )
                    .await?;
                    let Some(deleted_show) =
                        showcaster_db::gateway::show::delete(tx, where_unique).await?
                    else {
                        return Ok(None);
                    };
                    Ok(Some((deleted_show, affected)))
                }
                .scope_boxed()
            })
            .await?;

        let Some((deleted_show, affected)) = outcome else {
            return Ok(None);
        };

        let mut events = Vec::with_capacity(affected.len());
        for row in affected {
            let cal_event = self.fetch_cal_event(row.id).await?;
            self.cal.delete_event(row.id).await?;
            events.push(merge_event(row, cal_event, None));
        }

        let show = super::show_row_to_show(deleted_show, Some(events.clone()));
        self.bus.publish(ChangeEvent::show(ChangeEventKind::ShowDeleted, Utc::now(), show.clone()));
        for event in events {
            self.bus
                .publish(ChangeEvent::event(ChangeEventKind::EventDeleted, Utc::now(), event));
        }

        Ok(Some(show))
    }
}
