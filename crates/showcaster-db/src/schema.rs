//! RelStore schema: the relational half only (identity, type, ownership). Temporal
//! fields (start, end, timezone, recurrence) never appear here — they live in
//! CalStore and are merged in by the Event Coordinator.

diesel::table! {
    shows (id) {
        id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    events (id) {
        id -> Uuid,
        event_type -> Text,
        show_id -> Uuid,
    }
}

diesel::joinable!(events -> shows (show_id));
diesel::allow_tables_to_appear_in_same_query!(shows, events);
