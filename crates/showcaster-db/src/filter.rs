//! `where`/`order`/`include` inputs accepted by the gateway operations, and the
//! id-fusion helper the Query Planner uses to intersect a CalStore result with a
//! caller-supplied predicate (spec C4: "conjoin `id IN {uids}` under an outer AND").

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrderKey {
    Id,
    Type,
    ShowId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOrderBy {
    pub key: EventOrderKey,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOrderKey {
    Id,
    Title,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowOrderBy {
    pub key: ShowOrderKey,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventInclude {
    pub show: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShowInclude {
    pub events: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWhereUnique {
    pub id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowWhereUnique {
    pub id: Uuid,
}

/// A conjunctive/equality predicate over event rows. `and` nests further predicates;
/// every present field (including a nested `and`) is ANDed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventWhereInput {
    pub id: Option<Uuid>,
    pub ids: Option<Vec<Uuid>>,
    pub show_id: Option<Uuid>,
    pub event_type: Option<String>,
    pub and: Option<Vec<EventWhereInput>>,
}

impl EventWhereInput {
    /// Fuses a CalStore query result (§4.4) into this predicate: `id IN {ids}`
    /// appended to the existing `AND` list, or set if there is none yet.
    #[must_use]
    pub fn fuse_ids(mut self, ids: Vec<Uuid>) -> Self {
        let clause = Self {
            ids: Some(ids),
            ..Self::default()
        };
        match &mut self.and {
            Some(list) => list.push(clause),
            None => self.and = Some(vec![clause]),
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowWhereInput {
    pub id: Option<Uuid>,
    pub ids: Option<Vec<Uuid>>,
    pub title: Option<String>,
    pub and: Option<Vec<ShowWhereInput>>,
}
