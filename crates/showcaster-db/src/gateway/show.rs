//! C5 RelStore Gateway operations for the `shows` table.

use diesel::dsl::count_star;
use diesel::expression::BoxableExpression;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::error::DbResult;
use crate::filter::{Direction, ShowInclude, ShowOrderBy, ShowOrderKey, ShowWhereInput, ShowWhereUnique};
use crate::model::{EventRow, NewShowRow, ShowChangeset, ShowRow};
use crate::schema::{events, shows};

/// A show row plus its hydrated events, present iff `include.events` was set.
#[derive(Debug, Clone)]
pub struct ShowWithInclude {
    pub row: ShowRow,
    pub events: Option<Vec<EventRow>>,
}

type BoxedFilter = Box<dyn BoxableExpression<shows::table, Pg, SqlType = Bool>>;

fn build_filter(input: &ShowWhereInput) -> BoxedFilter {
    let mut expr: BoxedFilter = Box::new(shows::id.is_not_null());

    if let Some(id) = input.id {
        expr = Box::new(expr.and(shows::id.eq(id)));
    }
    if let Some(ids) = &input.ids {
        expr = Box::new(expr.and(shows::id.eq_any(ids.clone())));
    }
    if let Some(title) = &input.title {
        expr = Box::new(expr.and(shows::title.eq(title.clone())));
    }
    if let Some(and) = &input.and {
        for sub in and {
            expr = Box::new(expr.and(build_filter(sub)));
        }
    }

    expr
}

async fn hydrate_events(
    conn: &mut AsyncPgConnection,
    row: ShowRow,
    include: ShowInclude,
) -> DbResult<ShowWithInclude> {
    let events = if include.events {
        Some(
            events::table
                .filter(events::show_id.eq(row.id))
                .order(events::id.asc())
                .select(EventRow::as_select())
                .load(conn)
                .await?,
        )
    } else {
        None
    };
    Ok(ShowWithInclude { row, events })
}

/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn count(conn: &mut AsyncPgConnection, r#where: &ShowWhereInput) -> DbResult<i64> {
    let count = shows::table
        .filter(build_filter(r#where))
        .select(count_star())
        .first(conn)
        .await?;
    Ok(count)
}

/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn find_many(
    conn: &mut AsyncPgConnection,
    take: Option<i64>,
    skip: Option<i64>,
    r#where: &ShowWhereInput,
    order: &[ShowOrderBy],
    include: ShowInclude,
) -> DbResult<Vec<ShowWithInclude>> {
    let mut query = shows::table.filter(build_filter(r#where)).into_boxed();

    for order_by in order {
        query = match (order_by.key, order_by.direction) {
            (ShowOrderKey::Id, Direction::Asc) => query.then_order_by(shows::id.asc()),
            (ShowOrderKey::Id, Direction::Desc) => query.then_order_by(shows::id.desc()),
            (ShowOrderKey::Title, Direction::Asc) => query.then_order_by(shows::title.asc()),
            (ShowOrderKey::Title, Direction::Desc) => query.then_order_by(shows::title.desc()),
            (ShowOrderKey::Description, Direction::Asc) => {
                query.then_order_by(shows::description.asc())
            }
            (ShowOrderKey::Description, Direction::Desc) => {
                query.then_order_by(shows::description.desc())
            }
        };
    }
    if let Some(take) = take {
        query = query.limit(take);
    }
    if let Some(skip) = skip {
        query = query.offset(skip);
    }

    let rows: Vec<ShowRow> = query.select(ShowRow::as_select()).load(conn).await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(hydrate_events(conn, row, include).await?);
    }
    Ok(out)
}

/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn find_unique(
    conn: &mut AsyncPgConnection,
    where_unique: ShowWhereUnique,
    include: ShowInclude,
) -> DbResult<Option<ShowWithInclude>> {
    let row: Option<ShowRow> = shows::table
        .filter(shows::id.eq(where_unique.id))
        .select(ShowRow::as_select())
        .first(conn)
        .await
        .optional()?;

    match row {
        Some(row) => Ok(Some(hydrate_events(conn, row, include).await?)),
        None => Ok(None),
    }
}

/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn create(
    conn: &mut AsyncPgConnection,
    data: NewShowRow,
    include: ShowInclude,
) -> DbResult<ShowWithInclude> {
    let row: ShowRow = diesel::insert_into(shows::table)
        .values(&data)
        .get_result(conn)
        .await?;
    hydrate_events(conn, row, include).await
}

/// Updates the row matched by `where_unique`. `new_id`, when set, reissues the
/// primary key via an explicit `SET id = …` statement first — diesel's `AsChangeset`
/// derive never emits the primary-key column, so `data` cannot carry it (§4.7's
/// rename migration). When `data` carries no field changes, the field-level update
/// is skipped entirely (an empty `SET` clause is a runtime error in diesel) and the
/// row is read back as-is, so an empty delta behaves like `get` (§8.5).
///
/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn update(
    conn: &mut AsyncPgConnection,
    new_id: Option<Uuid>,
    data: ShowChangeset,
    where_unique: ShowWhereUnique,
    include: ShowInclude,
) -> DbResult<Option<ShowWithInclude>> {
    let mut current_id = where_unique.id;

    if let Some(new_id) = new_id {
        let renamed: Option<ShowRow> =
            diesel::update(shows::table.filter(shows::id.eq(current_id)))
                .set(shows::id.eq(new_id))
                .get_result(conn)
                .await
                .optional()?;
        if renamed.is_none() {
            return Ok(None);
        }
        current_id = new_id;
    }

    let row: Option<ShowRow> = if data.is_empty() {
        shows::table
            .filter(shows::id.eq(current_id))
            .select(ShowRow::as_select())
            .first(conn)
            .await
            .optional()?
    } else {
        diesel::update(shows::table.filter(shows::id.eq(current_id)))
            .set(&data)
            .get_result(conn)
            .await
            .optional()?
    };

    match row {
        Some(row) => Ok(Some(hydrate_events(conn, row, include).await?)),
        None => Ok(None),
    }
}

/// Deletes a show row. Callers must delete (or reassign) owned events first; the
/// schema does not cascade, matching the Show Coordinator's explicit snapshot step.
///
/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn delete(
    conn: &mut AsyncPgConnection,
    where_unique: ShowWhereUnique,
) -> DbResult<Option<ShowRow>> {
    let row = diesel::delete(shows::table.filter(shows::id.eq(where_unique.id)))
        .get_result(conn)
        .await
        .optional()?;
    Ok(row)
}

/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn create_many(conn: &mut AsyncPgConnection, data: &[NewShowRow]) -> DbResult<Vec<ShowRow>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let rows = diesel::insert_into(shows::table)
        .values(data)
        .get_results(conn)
        .await?;
    Ok(rows)
}

/// ## Errors
/// Returns a `DbError` on connection or query failure.
pub async fn delete_many(conn: &mut AsyncPgConnection, r#where: &ShowWhereInput) -> DbResult<Vec<ShowRow>> {
    let rows = diesel::delete(shows::table.filter(build_filter(r#where)))
        .get_results(conn)
        .await?;
    Ok(rows)
}
