//! Bidirectional translation between a [`CalEvent`] and an RFC 5545 `VCALENDAR`
//! containing exactly one `VEVENT`.
//!
//! `VTIMEZONE` definitions are never emitted or expected: events carry bare IANA
//! timezone names and the CalDAV server is assumed to accept a `TZID` parameter
//! without a matching embedded timezone component.

use chrono::{DateTime, NaiveDateTime, Utc};
use showcaster_core::model::{Frequency, Recurrence, RecurrenceRule, Weekday, WeekdayRule};
use uuid::Uuid;

use crate::error::{IcalError, IcalResult};
use crate::model::CalEvent;

const DATE_FMT: &str = "%Y%m%dT%H%M%S";
const FOLD_WIDTH: usize = 75;

/// Encodes an event into a single-VEVENT `VCALENDAR` text.
///
/// ## Errors
/// Returns a `ValidationError` if the recurrence rule declares both `until` and
/// `count`, which RFC 5545 forbids.
pub fn encode(event: &CalEvent) -> IcalResult<String> {
    let is_utc = is_utc_zone(&event.timezone);

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//Showcaster//Event Coordinator//EN".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}", event.id),
        encode_datetime_property("DTSTART", event.start, &event.timezone, is_utc),
        encode_datetime_property("DTEND", event.end, &event.timezone, is_utc),
    ];

    if let Some(recurrence) = &event.recurrence {
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
    }

    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());

    Ok(lines
        .into_iter()
        .map(|line| fold_line(&line))
        .collect::<Vec<_>>()
        .join("\r\n")
        + "\r\n")
}

/// Decodes a single-VEVENT `VCALENDAR` text into an event.
///
/// ## Errors
/// Returns a `ParseError` if `UID`, `DTSTART`, or `DTEND` are missing or malformed,
/// and a `ValidationError` if an integer field in `RRULE` falls outside its RFC 5545
/// range, or `RDATE`/`EXDATE` mix timezones with the event's declared zone.
pub fn decode(text: &str) -> IcalResult<CalEvent> {
    let unfolded = unfold(text);
    let mut uid: Option<Uuid> = None;
    let mut dtstart: Option<(NaiveDateTime, String)> = None;
    let mut dtend: Option<(NaiveDateTime, String)> = None;
    let mut rrule: Option<RecurrenceRule> = None;
    let mut rdate: Option<(Vec<NaiveDateTime>, String)> = None;
    let mut exdate: Option<(Vec<NaiveDateTime>, String)> = None;

    for line in unfolded.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let Some((name, params, value)) = split_property(line) else {
            continue;
        };
        match name.as_str() {
            "UID" => {
                uid = Some(
                    Uuid::parse_str(value)
                        .map_err(|err| IcalError::ParseError(format!("invalid UID: {err}")))?,
                );
            }
            "DTSTART" => dtstart = Some(parse_datetime_property(value, &params)?),
            "DTEND" => dtend = Some(parse_datetime_property(value, &params)?),
            "RRULE" => rrule = Some(parse_rrule(value)?),
            "RDATE" => rdate = Some(parse_datetime_list(value, &params)?),
            "EXDATE" => exdate = Some(parse_datetime_list(value, &params)?),
            _ => {}
        }
    }

    let id = uid.ok_or_else(|| IcalError::ParseError("missing UID property".to_string()))?;
    let (start, timezone) =
        dtstart.ok_or_else(|| IcalError::ParseError("missing DTSTART property".to_string()))?;
    let (end, end_tz) =
        dtend.ok_or_else(|| IcalError::ParseError("missing DTEND property".to_string()))?;

    if end_tz != timezone {
        return Err(IcalError::ValidationError(format!(
            "DTSTART/DTEND timezone mismatch: {timezone} vs {end_tz}"
        )));
    }

    for (label, parsed) in [("RDATE", &rdate), ("EXDATE", &exdate)] {
        if let Some((_, tz)) = parsed {
            if *tz != timezone {
                return Err(IcalError::ValidationError(format!(
                    "{label} timezone {tz} does not match event timezone {timezone}"
                )));
            }
        }
    }

    let recurrence = if rrule.is_none() && rdate.is_none() && exdate.is_none() {
        None
    } else {
        Some(Recurrence {
            rule: rrule,
            include: rdate.map(|(dates, _)| dates),
            exclude: exdate.map(|(dates, _)| dates),
        })
    };

    Ok(CalEvent {
        id,
        start,
        end,
        timezone,
        recurrence,
    })
}

pub(crate) fn is_utc_zone(timezone: &str) -> bool {
    timezone == "UTC" || timezone == "Etc/UTC"
}

pub(crate) fn encode_datetime_property(name: &str, dt: NaiveDateTime, timezone: &str, is_utc: bool) -> String {
    if is_utc {
        format!("{name}:{}Z", dt.format(DATE_FMT))
    } else {
        format!("{name};TZID={timezone}:{}", dt.format(DATE_FMT))
    }
}

pub(crate) fn encode_datetime_list(name: &str, dates: &[NaiveDateTime], timezone: &str, is_utc: bool) -> String {
    let values = dates
        .iter()
        .map(|dt| {
            if is_utc {
                format!("{}Z", dt.format(DATE_FMT))
            } else {
                dt.format(DATE_FMT).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    if is_utc {
        format!("{name}:{values}")
    } else {
        format!("{name};TZID={timezone}:{values}")
    }
}

pub(crate) fn encode_rrule(rule: &RecurrenceRule) -> IcalResult<String> {
    if rule.until.is_some() && rule.count.is_some() {
        return Err(IcalError::ValidationError(
            "RRULE cannot declare both UNTIL and COUNT".to_string(),
        ));
    }

    let mut parts = vec![format!("FREQ={}", encode_frequency(rule.frequency))];

    if let Some(until) = rule.until {
        parts.push(format!("UNTIL={}", until.format("%Y%m%dT%H%M%SZ")));
    }
    if let Some(count) = rule.count {
        parts.push(format!("COUNT={count}"));
    }
    parts.push(format!("INTERVAL={}", rule.interval));

    push_int_list(&mut parts, "BYSECOND", &rule.by_second);
    push_int_list(&mut parts, "BYMINUTE", &rule.by_minute);
    push_int_list(&mut parts, "BYHOUR", &rule.by_hour);

    if !rule.by_weekdays.is_empty() {
        let values = rule
            .by_weekdays
            .iter()
            .map(encode_weekday_rule)
            .collect::<Vec<_>>()
            .join(",");
        parts.push(format!("BYDAY={values}"));
    }

    push_int_list(&mut parts, "BYMONTHDAY", &rule.by_monthday);
    push_int_list(&mut parts, "BYYEARDAY", &rule.by_yearday);
    push_int_list(&mut parts, "BYWEEKNO", &rule.by_week);
    push_int_list(&mut parts, "BYMONTH", &rule.by_month);
    push_int_list(&mut parts, "BYSETPOS", &rule.by_setpos);

    if let Some(week_start) = rule.week_start {
        parts.push(format!("WKST={}", week_start.as_ical_code()));
    }

    Ok(parts.join(";"))
}

fn push_int_list<T: std::fmt::Display>(parts: &mut Vec<String>, key: &str, values: &[T]) {
    if values.is_empty() {
        return;
    }
    let joined = values
        .iter()
        .map(std::string::ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    parts.push(format!("{key}={joined}"));
}

fn encode_weekday_rule(rule: &WeekdayRule) -> String {
    match rule.occurrence {
        Some(occurrence) => format!("{occurrence}{}", rule.day.as_ical_code()),
        None => rule.day.as_ical_code().to_string(),
    }
}

const fn encode_frequency(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Secondly => "SECONDLY",
        Frequency::Minutely => "MINUTELY",
        Frequency::Hourly => "HOURLY",
        Frequency::Daily => "DAILY",
        Frequency::Weekly => "WEEKLY",
        Frequency::Monthly => "MONTHLY",
        Frequency::Yearly => "YEARLY",
    }
}

fn decode_frequency(value: &str) -> IcalResult<Frequency> {
    match value {
        "SECONDLY" => Ok(Frequency::Secondly),
        "MINUTELY" => Ok(Frequency::Minutely),
        "HOURLY" => Ok(Frequency::Hourly),
        "DAILY" => Ok(Frequency::Daily),
        "WEEKLY" => Ok(Frequency::Weekly),
        "MONTHLY" => Ok(Frequency::Monthly),
        "YEARLY" => Ok(Frequency::Yearly),
        other => Err(IcalError::ValidationError(format!(
            "unknown FREQ value: {other}"
        ))),
    }
}

fn parse_rrule(value: &str) -> IcalResult<RecurrenceRule> {
    let mut frequency: Option<Frequency> = None;
    let mut until: Option<DateTime<Utc>> = None;
    let mut count: Option<u32> = None;
    let mut interval: Option<u32> = None;
    let mut by_second = Vec::new();
    let mut by_minute = Vec::new();
    let mut by_hour = Vec::new();
    let mut by_weekdays = Vec::new();
    let mut by_monthday = Vec::new();
    let mut by_yearday = Vec::new();
    let mut by_week = Vec::new();
    let mut by_month = Vec::new();
    let mut by_setpos = Vec::new();
    let mut week_start = None;

    for part in value.split(';') {
        let Some((key, val)) = part.split_once('=') else {
            continue;
        };
        match key.to_ascii_uppercase().as_str() {
            "FREQ" => frequency = Some(decode_frequency(val)?),
            "UNTIL" => until = Some(parse_until(val)?),
            "COUNT" => {
                count = Some(
                    val.parse()
                        .map_err(|_| IcalError::ValidationError(format!("invalid COUNT: {val}")))?,
                );
            }
            "INTERVAL" => {
                let parsed: u32 = val
                    .parse()
                    .map_err(|_| IcalError::ValidationError(format!("invalid INTERVAL: {val}")))?;
                if parsed == 0 {
                    return Err(IcalError::ValidationError(
                        "INTERVAL must be positive".to_string(),
                    ));
                }
                interval = Some(parsed);
            }
            "BYSECOND" => by_second = parse_ranged_list(val, 0, 60)?,
            "BYMINUTE" => by_minute = parse_ranged_list(val, 0, 59)?,
            "BYHOUR" => by_hour = parse_ranged_list(val, 0, 23)?,
            "BYDAY" => by_weekdays = parse_weekday_rules(val)?,
            "BYMONTHDAY" => by_monthday = parse_signed_list(val, 1, 31)?,
            "BYYEARDAY" => by_yearday = parse_signed_list(val, 1, 366)?,
            "BYWEEKNO" => by_week = parse_signed_list(val, 1, 53)?,
            "BYMONTH" => by_month = parse_ranged_list(val, 1, 12)?,
            "BYSETPOS" => {
                by_setpos = val
                    .split(',')
                    .map(|token| {
                        token.parse::<i32>().map_err(|_| {
                            IcalError::ValidationError(format!("invalid BYSETPOS entry: {token}"))
                        })
                    })
                    .collect::<IcalResult<Vec<_>>>()?;
            }
            "WKST" => {
                week_start = Some(Weekday::from_ical_code(val).ok_or_else(|| {
                    IcalError::ValidationError(format!("invalid WKST: {val}"))
                })?);
            }
            _ => {}
        }
    }

    if until.is_some() && count.is_some() {
        return Err(IcalError::ValidationError(
            "RRULE cannot declare both UNTIL and COUNT".to_string(),
        ));
    }

    let frequency =
        frequency.ok_or_else(|| IcalError::ValidationError("RRULE missing FREQ".to_string()))?;

    Ok(RecurrenceRule {
        frequency,
        until,
        count,
        interval: interval.unwrap_or(1),
        by_second,
        by_minute,
        by_hour,
        by_weekdays,
        by_monthday,
        by_yearday,
        by_week,
        by_month,
        by_setpos,
        week_start,
    })
}

fn parse_until(value: &str) -> IcalResult<DateTime<Utc>> {
    let trimmed = value
        .strip_suffix('Z')
        .ok_or_else(|| IcalError::ValidationError(format!("UNTIL must be UTC: {value}")))?;
    let naive = NaiveDateTime::parse_from_str(trimmed, DATE_FMT)
        .map_err(|err| IcalError::ValidationError(format!("invalid UNTIL: {err}")))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

fn parse_ranged_list(value: &str, lo: i64, hi: i64) -> IcalResult<Vec<u8>> {
    value
        .split(',')
        .map(|token| {
            let n: i64 = token
                .parse()
                .map_err(|_| IcalError::ValidationError(format!("invalid integer: {token}")))?;
            if n < lo || n > hi {
                return Err(IcalError::ValidationError(format!(
                    "value {n} out of range [{lo}, {hi}]"
                )));
            }
            Ok(u8::try_from(n).unwrap_or_default())
        })
        .collect()
}

fn parse_signed_list<T>(value: &str, lo_abs: i64, hi_abs: i64) -> IcalResult<Vec<T>>
where
    T: TryFrom<i64>,
{
    value
        .split(',')
        .map(|token| {
            let n: i64 = token
                .parse()
                .map_err(|_| IcalError::ValidationError(format!("invalid integer: {token}")))?;
            let mag = n.abs();
            if mag < lo_abs || mag > hi_abs {
                return Err(IcalError::ValidationError(format!(
                    "value {n} out of range [-{hi_abs}, -{lo_abs}] ∪ [{lo_abs}, {hi_abs}]"
                )));
            }
            T::try_from(n)
                .map_err(|_| IcalError::ValidationError(format!("value {n} does not fit")))
        })
        .collect()
}

fn parse_weekday_rules(value: &str) -> IcalResult<Vec<WeekdayRule>> {
    value
        .split(',')
        .map(|token| {
            let (sign_and_num, code) = token.split_at(token.len() - 2);
            let day = Weekday::from_ical_code(code)
                .ok_or_else(|| IcalError::ValidationError(format!("invalid weekday code: {token}")))?;
            let occurrence = if sign_and_num.is_empty() {
                None
            } else {
                let n: i64 = sign_and_num.parse().map_err(|_| {
                    IcalError::ValidationError(format!("invalid weekday occurrence: {token}"))
                })?;
                if n.abs() < 1 || n.abs() > 53 {
                    return Err(IcalError::ValidationError(format!(
                        "weekday occurrence out of range: {token}"
                    )));
                }
                Some(i8::try_from(n).map_err(|_| {
                    IcalError::ValidationError(format!("weekday occurrence does not fit: {token}"))
                })?)
            };
            Ok(WeekdayRule { day, occurrence })
        })
        .collect()
}

/// Splits an unfolded content line into `(name, params, value)`. Parameters are
/// returned as `(key, value)` pairs; `TZID` is the only one this codec consumes.
fn split_property(line: &str) -> Option<(String, Vec<(String, String)>, &str)> {
    let colon = line.find(':')?;
    let (head, value) = line.split_at(colon);
    let value = &value[1..];
    let mut segments = head.split(';');
    let name = segments.next()?.to_ascii_uppercase();
    let params = segments
        .filter_map(|seg| seg.split_once('='))
        .map(|(k, v)| (k.to_ascii_uppercase(), v.to_string()))
        .collect();
    Some((name, params, value))
}

fn parse_datetime_property(value: &str, params: &[(String, String)]) -> IcalResult<(NaiveDateTime, String)> {
    if let Some(stripped) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(stripped, DATE_FMT)
            .map_err(|err| IcalError::ParseError(format!("invalid UTC datetime: {err}")))?;
        return Ok((naive, "UTC".to_string()));
    }
    let tzid = params
        .iter()
        .find(|(k, _)| k == "TZID")
        .map(|(_, v)| v.clone())
        .ok_or_else(|| {
            IcalError::ParseError(format!("datetime {value} has neither Z suffix nor TZID"))
        })?;
    let naive = NaiveDateTime::parse_from_str(value, DATE_FMT)
        .map_err(|err| IcalError::ParseError(format!("invalid datetime: {err}")))?;
    Ok((naive, tzid))
}

fn parse_datetime_list(
    value: &str,
    params: &[(String, String)],
) -> IcalResult<(Vec<NaiveDateTime>, String)> {
    let parsed = value
        .split(',')
        .map(|token| parse_datetime_property(token, params))
        .collect::<IcalResult<Vec<_>>>()?;

    let tz = parsed
        .first()
        .map(|(_, tz)| tz.clone())
        .ok_or_else(|| IcalError::ParseError("empty datetime list".to_string()))?;
    if parsed.iter().any(|(_, other)| *other != tz) {
        return Err(IcalError::ValidationError(
            "datetime list mixes timezones".to_string(),
        ));
    }

    Ok((parsed.into_iter().map(|(dt, _)| dt).collect(), tz))
}

/// Folds a content line at 75 octets per RFC 5545 (continuation lines start with a
/// single space).
fn fold_line(line: &str) -> String {
    if line.len() <= FOLD_WIDTH {
        return line.to_string();
    }
    let mut folded = String::new();
    let mut rest = line;
    let mut first = true;
    while !rest.is_empty() {
        let width = if first { FOLD_WIDTH } else { FOLD_WIDTH - 1 };
        let boundary = char_boundary_at_most(rest, width);
        if !first {
            folded.push_str("\r\n ");
        }
        folded.push_str(&rest[..boundary]);
        rest = &rest[boundary..];
        first = false;
    }
    folded
}

fn char_boundary_at_most(s: &str, max: usize) -> usize {
    let mut boundary = max.min(s.len());
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

/// Reverses [`fold_line`]: joins continuation lines (leading space or tab) back onto
/// the previous logical line.
fn unfold(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for line in text.split("\r\n").flat_map(|l| l.split('\n')) {
        if (line.starts_with(' ') || line.starts_with('\t')) && !result.is_empty() {
            result.push_str(&line[1..]);
        } else {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(line);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use showcaster_core::model::Frequency as F;

    fn sample_event(timezone: &str) -> CalEvent {
        CalEvent {
            id: Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap(),
            start: NaiveDateTime::parse_from_str("2030-03-15 09:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            end: NaiveDateTime::parse_from_str("2030-03-15 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            timezone: timezone.to_string(),
            recurrence: None,
        }
    }

    #[test]
    fn round_trips_non_recurring_zoned_event() {
        let event = sample_event("Europe/Warsaw");
        let text = encode(&event).unwrap();
        assert!(text.contains("DTSTART;TZID=Europe/Warsaw:20300315T090000"));
        let decoded = decode(&text).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn round_trips_utc_event() {
        let event = sample_event("UTC");
        let text = encode(&event).unwrap();
        assert!(text.contains("DTSTART:20300315T090000Z"));
        assert!(!text.contains("TZID=UTC"));
        let decoded = decode(&text).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn round_trips_weekly_recurrence_with_rdate_exdate() {
        let mut event = sample_event("Europe/Warsaw");
        event.recurrence = Some(Recurrence {
            rule: Some(RecurrenceRule {
                frequency: F::Weekly,
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
            include: Some(vec![NaiveDateTime::parse_from_str(
                "2030-03-22 09:00:00",
                "%Y-%m-%d %H:%M:%S",
            )
            .unwrap()]),
            exclude: Some(vec![NaiveDateTime::parse_from_str(
                "2030-03-29 09:00:00",
                "%Y-%m-%d %H:%M:%S",
            )
            .unwrap()]),
        });

        let text = encode(&event).unwrap();
        assert!(text.contains("RRULE:FREQ=WEEKLY;COUNT=4;INTERVAL=1;BYDAY=MO"));
        assert!(text.contains("RDATE;TZID=Europe/Warsaw:20300322T090000"));
        assert!(text.contains("EXDATE;TZID=Europe/Warsaw:20300329T090000"));

        let decoded = decode(&text).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn rejects_until_and_count_together() {
        let mut event = sample_event("UTC");
        event.recurrence = Some(Recurrence {
            rule: Some(RecurrenceRule {
                frequency: F::Daily,
                until: Some(Utc::now()),
                count: Some(3),
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
        });

        let err = encode(&event).unwrap_err();
        assert!(matches!(err, IcalError::ValidationError(_)));
    }

    #[test]
    fn decode_rejects_out_of_range_byhour() {
        let text = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:11111111-1111-1111-1111-111111111111\r\nDTSTART:20300315T090000Z\r\nDTEND:20300315T100000Z\r\nRRULE:FREQ=DAILY;BYHOUR=25\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let err = decode(text).unwrap_err();
        assert!(matches!(err, IcalError::ValidationError(_)));
    }

    #[test]
    fn decode_ignores_unknown_properties() {
        let text = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:11111111-1111-1111-1111-111111111111\r\nDTSTART:20300315T090000Z\r\nDTEND:20300315T100000Z\r\nSUMMARY:Ignored\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let decoded = decode(text).unwrap();
        assert_eq!(decoded.timezone, "UTC");
    }
}
