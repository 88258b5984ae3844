//! Domain value types shared by every layer of the core: the relational half of a
//! Show/Event (identity, type, ownership) and the temporal half (start, end, timezone,
//! recurrence) that the iCal codec and CalStore client operate on.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ShowId = Uuid;
pub type EventId = Uuid;

/// A broadcast show. `events` is a backref hydrated only when requested via `include`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    pub id: ShowId,
    pub title: String,
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Event>>,
}

/// A scheduled broadcast occurrence. `type` is an opaque site-specific tag (`live`,
/// `replay`, ...): the core never interprets its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "showId")]
    pub show_id: ShowId,
    /// Local wall time, interpreted in `timezone`.
    pub start: NaiveDateTime,
    /// Local wall time, interpreted in `timezone`.
    pub end: NaiveDateTime,
    /// IANA timezone name.
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show: Option<Show>,
}

/// Recurrence rule plus explicit inclusion/exclusion dates (RDATE/EXDATE).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Recurrence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<RecurrenceRule>,
    /// RDATE: wall times in the event's timezone, additional to the rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<NaiveDateTime>>,
    /// EXDATE: wall times in the event's timezone, removed from the rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<NaiveDateTime>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Two-letter RFC 5545 weekday code (`MO`, `TU`, ...).
    #[must_use]
    pub const fn as_ical_code(self) -> &'static str {
        match self {
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
            Self::Sunday => "SU",
        }
    }

    #[must_use]
    pub fn from_ical_code(code: &str) -> Option<Self> {
        match code {
            "MO" => Some(Self::Monday),
            "TU" => Some(Self::Tuesday),
            "WE" => Some(Self::Wednesday),
            "TH" => Some(Self::Thursday),
            "FR" => Some(Self::Friday),
            "SA" => Some(Self::Saturday),
            "SU" => Some(Self::Sunday),
            _ => None,
        }
    }
}

/// A `BYDAY` entry: a weekday, optionally qualified with a signed ordinal occurrence
/// within the recurring period (e.g. `-1SU` = last Sunday, `2MO` = second Monday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayRule {
    pub day: Weekday,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<i8>,
}

/// RFC 5545 `RRULE` fields. `until` and `count` are mutually exclusive; `interval`
/// defaults to 1 when absent on the wire but is always materialized here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_second: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_minute: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_hour: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_weekdays: Vec<WeekdayRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_monthday: Vec<i8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_yearday: Vec<i16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_week: Vec<i8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_month: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_setpos: Vec<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_start: Option<Weekday>,
}

const fn default_interval() -> u32 {
    1
}

/// A materialized occurrence of an event's recurrence within a requested window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInstance {
    pub event_id: EventId,
    /// Wall time in the source event's timezone.
    pub start: NaiveDateTime,
    /// Wall time in the source event's timezone.
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeEventKind {
    ShowCreated,
    ShowUpdated,
    ShowDeleted,
    EventCreated,
    EventUpdated,
    EventDeleted,
}

/// Domain notification emitted after a successful mutation, carried as JSON on the
/// event bus. `data` mirrors whichever entity changed, trimmed of backrefs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeEventKind,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub data: ChangeEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeEventData {
    Show { show: Show },
    Event { event: Event },
}

impl ChangeEvent {
    #[must_use]
    pub fn show(kind: ChangeEventKind, created_at: DateTime<Utc>, show: Show) -> Self {
        Self {
            kind,
            created_at,
            data: ChangeEventData::Show {
                show: Show {
                    events: None,
                    ..show
                },
            },
        }
    }

    #[must_use]
    pub fn event(kind: ChangeEventKind, created_at: DateTime<Utc>, event: Event) -> Self {
        Self {
            kind,
            created_at,
            data: ChangeEventData::Event {
                event: Event { show: None, ..event },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_code_round_trips() {
        for day in [
            Weekday::Monday,
            Weekday::Tuesday,
            Weekday::Wednesday,
            Weekday::Thursday,
            Weekday::Friday,
            Weekday::Saturday,
            Weekday::Sunday,
        ] {
            let code = day.as_ical_code();
            assert_eq!(Weekday::from_ical_code(code), Some(day));
        }
    }

    #[test]
    fn change_event_wire_shape() {
        let show = Show {
            id: Uuid::nil(),
            title: "Morning".to_string(),
            description: None,
            events: Some(vec![]),
        };
        let change = ChangeEvent::show(ChangeEventKind::ShowCreated, Utc::now(), show);
        let json = serde_json::to_value(&change).expect("serializable");
        assert_eq!(json["type"], "show-created");
        assert!(json["data"]["show"].get("events").is_none());
    }
}
