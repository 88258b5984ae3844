//! C5 RelStore Gateway operations for the `events` table.

use diesel::dsl::count_star;
use diesel::expression::BoxableExpression;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::error::DbResult;
use crate::filter::{Direction, EventInclude, EventOrderBy, EventOrderKey, EventWhereInput, EventWhereUnique};
use crate::model::{EventChangeset, EventRow, NewEventRow};
use crate::schema::{events, shows};

/// An event row plus its hydrated Show backref, present iff `include.show` was set.
#[derive(Debug, Clone)]
pub struct EventWithInclude {
    pub row: EventRow,
    pub show: Option<crate::model::ShowRow>,
}

type BoxedFilter = Box<dyn BoxableExpression<events::table, Pg, SqlType = Bool>>;

fn build_filter(input: &EventWhereInput) -> BoxedFilter {
    let mut expr: BoxedFilter = Box::new(events::id.is_not_null());

    if let Some(id) = input.id {
        expr = Box::new(expr.and(events::id.eq(id)));
    }
    if let Some(ids) = &input.ids {
        expr = Box::new(expr.and(events::id.eq_any(ids.clone())));
    }
    if let Some(show_id) = input.show_id {
        expr = Box::new(expr.and(events::show_id.eq(show_id)));
    }
    if let Some(event_type) = &input.event_type {
        expr = Box::new(expr.and(events::event_type.eq(event_type.clone())));
    }
    if let Some(and) = &input.and {
        for sub in and {
            expr = Box::new(expr.and(build_filter(sub)));
        }
    }

    expr
}

async fn hydrate_show(
    conn: &mut AsyncPgConnection,
    row: EventRow,
    include: EventInclude,
) -> DbResult<EventWithInclude> {
    let show = if include.show {
        Some(
            shows::table
                .filter(shows::id.eq(row.show_id))
                .select(crate::model::ShowRow::as_select())
                .first(conn)
                .await?,
        )
    } else {
        None
    };
    Ok(EventWithInclude { row, show })
}

/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn count(conn: &mut AsyncPgConnection, r#where: &EventWhereInput) -> DbResult<i64> {
    let count = events::table
        .filter(build_filter(r#where))
        .select(count_star())
        .first(conn)
        .await?;
    Ok(count)
}

/// ## Errors
/// Returns a `DbError` on connection or query failure.
#[allow(clippy::too_many_arguments)]
pub async fn find_many(
    conn: &mut AsyncPgConnection,
    take: Option<i64>,
    skip: Option<i64>,
    r#where: &EventWhereInput,
    order: &[EventOrderBy],
    include: EventInclude,
) -> DbResult<Vec<EventWithInclude>> {
    let mut query = events::table.filter(build_filter(r#where)).into_boxed();

    for order_by in order {
        query = match (order_by.key, order_by.direction) {
            (EventOrderKey::Id, Direction::Asc) => query.then_order_by(events::id.asc()),
            (EventOrderKey::Id, Direction::Desc) => query.then_order_by(events::id.desc()),
            (EventOrderKey::Type, Direction::Asc) => query.then_order_by(events::event_type.asc()),
            (EventOrderKey::Type, Direction::Desc) => query.then_order_by(events::event_type.desc()),
            (EventOrderKey::ShowId, Direction::Asc) => query.then_order_by(events::show_id.asc()),
            (EventOrderKey::ShowId, Direction::Desc) => query.then_order_by(events::show_id.desc()),
        };
    }
    if let Some(take) = take {
        query = query.limit(take);
    }
    if let Some(skip) = skip {
        query = query.offset(skip);
    }

    let rows: Vec<EventRow> = query.select(EventRow::as_select()).load(conn).await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(hydrate_show(conn, row, include).await?);
    }
    Ok(out)
}

/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn find_unique(
    conn: &mut AsyncPgConnection,
    where_unique: EventWhereUnique,
    include: EventInclude,
) -> DbResult<Option<EventWithInclude>> {
    let row: Option<EventRow> = events::table
        .filter(events::id.eq(where_unique.id))
        .select(EventRow::as_select())
        .first(conn)
        .await
        .optional()?;

    match row {
        Some(row) => Ok(Some(hydrate_show(conn, row, include).await?)),
        None => Ok(None),
    }
}

/// ## Errors
/// Returns a `DbError` on connection or query failure (including a unique-constraint
/// violation if `data.id` or the owning show does not satisfy the schema).
pub async fn create(
    conn: &mut AsyncPgConnection,
    data: NewEventRow,
    include: EventInclude,
) -> DbResult<EventWithInclude> {
    let row: EventRow = diesel::insert_into(events::table)
        .values(&data)
        .get_result(conn)
        .await?;
    hydrate_show(conn, row, include).await
}

/// Updates the row matched by `where_unique`. `new_id`, when set, reissues the
/// primary key via an explicit `SET id = …` statement first — diesel's `AsChangeset`
/// derive never emits the primary-key column, so `data` cannot carry it (§4.6's
/// `update` state machine). When `data` carries no field changes, the field-level
/// update is skipped entirely (an empty `SET` clause is a runtime error in diesel)
/// and the row is read back as-is, so an empty delta behaves like `get` (§8.5).
///
/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn update(
    conn: &mut AsyncPgConnection,
    new_id: Option<Uuid>,
    data: EventChangeset,
    where_unique: EventWhereUnique,
    include: EventInclude,
) -> DbResult<Option<EventWithInclude>> {
    let mut current_id = where_unique.id;

    if let Some(new_id) = new_id {
        let renamed: Option<EventRow> =
            diesel::update(events::table.filter(events::id.eq(current_id)))
                .set(events::id.eq(new_id))
                .get_result(conn)
                .await
                .optional()?;
        if renamed.is_none() {
            return Ok(None);
        }
        current_id = new_id;
    }

    let row: Option<EventRow> = if data.is_empty() {
        events::table
            .filter(events::id.eq(current_id))
            .select(EventRow::as_select())
            .first(conn)
            .await
            .optional()?
    } else {
        diesel::update(events::table.filter(events::id.eq(current_id)))
            .set(&data)
            .get_result(conn)
            .await
            .optional()?
    };

    match row {
        Some(row) => Ok(Some(hydrate_show(conn, row, include).await?)),
        None => Ok(None),
    }
}

/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn delete(
    conn: &mut AsyncPgConnection,
    where_unique: EventWhereUnique,
    include: EventInclude,
) -> DbResult<Option<EventWithInclude>> {
    let row: Option<EventRow> = diesel::delete(events::table.filter(events::id.eq(where_unique.id)))
        .get_result(conn)
        .await
        .optional()?;

    match row {
        Some(row) => Ok(Some(hydrate_show(conn, row, include).await?)),
        None => Ok(None),
    }
}

/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn create_many(conn: &mut AsyncPgConnection, data: &[NewEventRow]) -> DbResult<Vec<EventRow>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let rows = diesel::insert_into(events::table)
        .values(data)
        .get_results(conn)
        .await?;
    Ok(rows)
}

/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn delete_many(conn: &mut AsyncPgConnection, r#where: &EventWhereInput) -> DbResult<Vec<EventRow>> {
    let rows = diesel::delete(events::table.filter(build_filter(r#where)))
        .get_results(conn)
        .await?;
    Ok(rows)
}

/// Event ids belonging to a show, ordered for deterministic snapshotting during a
/// show rename cascade (§4.7).
///
/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn find_by_show(conn: &mut AsyncPgConnection, show_id: Uuid) -> DbResult<Vec<EventRow>> {
    let rows = events::table
        .filter(events::show_id.eq(show_id))
        .order(events::id.asc())
        .select(EventRow::as_select())
        .load(conn)
        .await?;
    Ok(rows)
}
