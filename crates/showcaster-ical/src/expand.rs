//! Given an event and a UTC window `[start, end)`, produces the sorted list of
//! concrete occurrences, each a wall-time pair in the event's declared timezone.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz as ChronoTz;
use rrule::{RRuleSet, Tz};
use showcaster_core::model::{EventInstance, Recurrence};

use crate::codec::{encode_datetime_list, encode_datetime_property, encode_rrule, is_utc_zone};
use crate::error::{IcalError, IcalResult};
use crate::model::CalEvent;

/// Safety cap on the number of raw occurrences pulled from the `rrule` crate before
/// window-filtering; recurrences without `UNTIL`/`COUNT` are otherwise unbounded.
const MAX_RAW_OCCURRENCES: u16 = 10_000;

/// ## Errors
/// Returns a `ValidationError` if the event's timezone does not resolve in the IANA
/// database, or if its recurrence rule fails to parse/build.
pub fn expand(
    event: &CalEvent,
    start_utc: DateTime<Utc>,
    end_utc: DateTime<Utc>,
) -> IcalResult<Vec<EventInstance>> {
    if start_utc >= end_utc {
        return Ok(Vec::new());
    }

    let tz: ChronoTz = event
        .timezone
        .parse()
        .map_err(|_| IcalError::ValidationError(format!("unknown timezone: {}", event.timezone)))?;

    let duration = event.end - event.start;

    let starts_utc = match &event.recurrence {
        None => single_occurrence(event.start, &tz),
        Some(recurrence) if recurrence.rule.is_some() => {
            rule_occurrences(event, recurrence, &tz, start_utc, end_utc)?
        }
        Some(recurrence) => explicit_occurrences(event.start, recurrence, &tz),
    };

    let mut instances: Vec<EventInstance> = starts_utc
        .into_iter()
        .filter(|start| *start >= start_utc && *start < end_utc)
        .map(|start_instant| {
            let local_start = start_instant.with_timezone(&tz).naive_local();
            let local_end = local_start + duration;
            EventInstance {
                event_id: event.id,
                start: local_start,
                end: local_end,
            }
        })
        .collect();

    instances.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
    Ok(instances)
}

fn single_occurrence(start: NaiveDateTime, tz: &ChronoTz) -> Vec<DateTime<Utc>> {
    wall_to_utc(start, tz).into_iter().collect()
}

fn explicit_occurrences(
    dtstart: NaiveDateTime,
    recurrence: &Recurrence,
    tz: &ChronoTz,
) -> Vec<DateTime<Utc>> {
    let mut wall_times = vec![dtstart];
    if let Some(include) = &recurrence.include {
        wall_times.extend(include.iter().copied());
    }
    if let Some(exclude) = &recurrence.exclude {
        wall_times.retain(|wt| !exclude.contains(wt));
    }
    wall_times
        .into_iter()
        .filter_map(|wt| wall_to_utc(wt, tz))
        .collect()
}

fn rule_occurrences(
    event: &CalEvent,
    recurrence: &Recurrence,
    tz: &ChronoTz,
    start_utc: DateTime<Utc>,
    end_utc: DateTime<Utc>,
) -> IcalResult<Vec<DateTime<Utc>>> {
    let text = build_rrule_set_text(event, recurrence)?;
    let rrule_set: RRuleSet = text
        .parse()
        .map_err(|err| IcalError::ValidationError(format!("invalid recurrence: {err}")))?;

    let rrule_set = rrule_set
        .after(start_utc.with_timezone(&Tz::UTC))
        .before(end_utc.with_timezone(&Tz::UTC));

    let result = rrule_set.all(MAX_RAW_OCCURRENCES);
    Ok(result
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&Utc))
        .collect())
}

fn build_rrule_set_text(event: &CalEvent, recurrence: &Recurrence) -> IcalResult<String> {
    let is_utc = is_utc_zone(&event.timezone);
    let mut lines = vec![encode_datetime_property(
        "DTSTART",
        event.start,
        &event.timezone,
        is_utc,
    )];

    if let Some(rule) = &recurrence.rule {
        lines.push(format!("RRULE:{}", encode_rrule(rule)?));
    }
    if let Some(include) = &recurrence.include {
        if !include.is_empty() {
            lines.push(encode_datetime_list("RDATE", include, &event.timezone, is_utc));
        }
    }
    if let Some(exclude) = &recurrence.exclude {
        if !exclude.is_empty() {
            lines.push(encode_datetime_list("EXDATE", exclude, &event.timezone, is_utc));
        }
    }

    Ok(lines.join("\n"))
}

/// Resolves a wall time in `tz` to a UTC instant, preferring the earlier of two
/// candidates on an ambiguous (fall-back) transition and skipping times that fall in
/// a spring-forward gap.
fn wall_to_utc(wall: NaiveDateTime, tz: &ChronoTz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&wall) {
        chrono::LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        chrono::LocalResult::Ambiguous(earlier, _) => Some(earlier.with_timezone(&Utc)),
        chrono::LocalResult::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use showcaster_core::model::{Frequency, RecurrenceRule, Weekday, WeekdayRule};
    use uuid::Uuid;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn expands_non_recurring_event_in_window() {
        let event = CalEvent {
            id: Uuid::nil(),
            start: dt("2030-03-15 09:00:00"),
            end: dt("2030-03-15 10:00:00"),
            timezone: "Europe/Warsaw".to_string(),
            recurrence: None,
        };
        let instances = expand(&event, utc("2030-01-01T00:00:00Z"), utc("2030-04-01T00:00:00Z"))
            .unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].start, dt("2030-03-15 09:00:00"));
    }

    #[test]
    fn empty_window_yields_no_instances() {
        let event = CalEvent {
            id: Uuid::nil(),
            start: dt("2030-03-15 09:00:00"),
            end: dt("2030-03-15 10:00:00"),
            timezone: "UTC".to_string(),
            recurrence: None,
        };
        let instances = expand(&event, utc("2030-04-01T00:00:00Z"), utc("2030-04-01T00:00:00Z"))
            .unwrap();
        assert!(instances.is_empty());
    }

    #[test]
    fn weekly_recurrence_yields_four_monday_instances() {
        let event = CalEvent {
            id: Uuid::nil(),
            start: dt("2030-03-04 20:00:00"),
            end: dt("2030-03-04 21:00:00"),
            timezone: "Europe/Warsaw".to_string(),
            recurrence: Some(Recurrence {
                rule: Some(RecurrenceRule {
                    frequency: Frequency::Weekly,
                    until: None,
                    count: Some(4),
                    interval: 1,
                    by_second: vec![],
                    by_minute: vec![],
                    by_hour: vec![],
                    by_weekdays: vec![WeekdayRule {
                        day: Weekday::Monday,
                        occurrence: None,
                    }],
                    by_monthday: vec![],
                    by_yearday: vec![],
                    by_week: vec![],
                    by_month: vec![],
                    by_setpos: vec![],
                    week_start: None,
                }),
                include: None,
                exclude: None,
            }),
        };

        let instances = expand(&event, utc("2030-03-01T00:00:00Z"), utc("2030-04-01T00:00:00Z"))
            .unwrap();
        assert_eq!(instances.len(), 4);
        assert_eq!(instances[0].start, dt("2030-03-04 20:00:00"));
        assert_eq!(instances[1].start, dt("2030-03-11 20:00:00"));
        assert_eq!(instances[2].start, dt("2030-03-18 20:00:00"));
        assert_eq!(instances[3].start, dt("2030-03-25 20:00:00"));
    }

    #[test]
    fn dst_spring_forward_gap_is_skipped() {
        // 2030-03-31 is the Europe/Warsaw spring-forward transition; 02:30 does not exist.
        let event = CalEvent {
            id: Uuid::nil(),
            start: dt("2030-03-29 02:30:00"),
            end: dt("2030-03-29 03:00:00"),
            timezone: "Europe/Warsaw".to_string(),
            recurrence: Some(Recurrence {
                rule: Some(RecurrenceRule {
                    frequency: Frequency::Daily,
                    until: None,
                    count: Some(10),
                    interval: 1,
                    by_second: vec![],
                    by_minute: vec![],
                    by_hour: vec![],
                    by_weekdays: vec![],
                    by_monthday: vec![],
                    by_yearday: vec![],
                    by_week: vec![],
                    by_month: vec![],
                    by_setpos: vec![],
                    week_start: None,
                }),
                include: None,
                exclude: None,
            }),
        };

        let instances = expand(&event, utc("2030-01-01T00:00:00Z"), utc("2030-05-01T00:00:00Z"))
            .unwrap();
        assert_eq!(instances.len(), 9);
    }

    #[test]
    fn explicit_rdate_exdate_without_rule() {
        let event = CalEvent {
            id: Uuid::nil(),
            start: dt("2030-03-15 09:00:00"),
            end: dt("2030-03-15 10:00:00"),
            timezone: "UTC".to_string(),
            recurrence: Some(Recurrence {
                rule: None,
                include: Some(vec![dt("2030-03-20 09:00:00")]),
                exclude: Some(vec![dt("2030-03-15 09:00:00")]),
            }),
        };

        let instances = expand(&event, utc("2030-01-01T00:00:00Z"), utc("2030-04-01T00:00:00Z"))
            .unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].start, dt("2030-03-20 09:00:00"));
    }
}

/// Exercises the `rrule` crate directly against a broad set of RFC 5545 recurrence
/// shapes, independent of the event-level wrapping this module adds.
#[cfg(test)]
mod rrule_cases {
    include!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/rrule_cases_data/mod.rs"));

    #[test]
    fn rrule_cases_unit() {
        for case in rrule_cases() {
            assert_case(&case);
        }
    }
}
