//! Input validation shared by the Event and Show Coordinators (§7 "Validation" kind):
//! the checks the HTTP transport layer would otherwise perform are the Coordinators'
//! responsibility here since binding is out of scope (§1).

use showcaster_core::model::{Recurrence, RecurrenceRule, WeekdayRule};

use crate::error::{ServiceError, ServiceResult};

/// ## Errors
/// Returns `ServiceError::Validation` if `end < start`, the timezone does not
/// resolve in the IANA database, or the recurrence rule (if any) is malformed.
pub fn validate_event_temporal(
    start: chrono::NaiveDateTime,
    end: chrono::NaiveDateTime,
    timezone: &str,
    recurrence: Option<&Recurrence>,
) -> ServiceResult<()> {
    if end < start {
        return Err(ServiceError::Validation(format!(
            "end ({end}) is before start ({start})"
        )));
    }
    timezone
        .parse::<chrono_tz::Tz>()
        .map_err(|_| ServiceError::Validation(format!("unknown timezone: {timezone}")))?;

    if let Some(recurrence) = recurrence {
        if let Some(rule) = &recurrence.rule {
            validate_recurrence_rule(rule)?;
        }
        validate_single_timezone(recurrence)?;
    }
    Ok(())
}

fn validate_single_timezone(recurrence: &Recurrence) -> ServiceResult<()> {
    // RDATE/EXDATE carry no zone of their own in the domain model (they share the
    // event's timezone by construction, §4.1); nothing further to check here beyond
    // what the type system already guarantees. Kept as an explicit step so a future
    // per-date timezone extension is forced to reconsider this function.
    let _ = recurrence;
    Ok(())
}

fn validate_recurrence_rule(rule: &RecurrenceRule) -> ServiceResult<()> {
    if rule.until.is_some() && rule.count.is_some() {
        return Err(ServiceError::Validation(
            "recurrence rule cannot declare both until and count".to_string(),
        ));
    }
    if rule.interval == 0 {
        return Err(ServiceError::Validation(
            "recurrence interval must be positive".to_string(),
        ));
    }
    check_range("by_second", rule.by_second.iter().map(|v| i64::from(*v)), 0, 60)?;
    check_range("by_minute", rule.by_minute.iter().map(|v| i64::from(*v)), 0, 59)?;
    check_range("by_hour", rule.by_hour.iter().map(|v| i64::from(*v)), 0, 23)?;
    check_range("by_monthday", rule.by_monthday.iter().map(|v| i64::from(*v)), -31, 31)?;
    check_range("by_yearday", rule.by_yearday.iter().map(|v| i64::from(*v)), -366, 366)?;
    check_range("by_week", rule.by_week.iter().map(|v| i64::from(*v)), -53, 53)?;
    check_range("by_month", rule.by_month.iter().map(|v| i64::from(*v)), 1, 12)?;
    for weekday in &rule.by_weekdays {
        validate_weekday_rule(weekday)?;
    }
    if rule.by_monthday.iter().any(|v| *v == 0)
        || rule.by_yearday.iter().any(|v| *v == 0)
        || rule.by_week.iter().any(|v| *v == 0)
    {
        return Err(ServiceError::Validation(
            "BY… fields do not accept zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_weekday_rule(rule: &WeekdayRule) -> ServiceResult<()> {
    if let Some(occurrence) = rule.occurrence {
        if occurrence == 0 || !(-53..=53).contains(&i64::from(occurrence)) {
            return Err(ServiceError::Validation(format!(
                "weekday occurrence out of range: {occurrence}"
            )));
        }
    }
    Ok(())
}

fn check_range(
    field: &str,
    values: impl Iterator<Item = i64>,
    lo: i64,
    hi: i64,
) -> ServiceResult<()> {
    for value in values {
        if value < lo || value > hi {
            return Err(ServiceError::Validation(format!(
                "{field} value {value} out of range [{lo}, {hi}]"
            )));
        }
    }
    Ok(())
}

/// ## Errors
/// Returns `ServiceError::Validation` if `title` is empty.
pub fn validate_show_title(title: &str) -> ServiceResult<()> {
    if title.trim().is_empty() {
        return Err(ServiceError::Validation("show title must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn rejects_end_before_start() {
        let start = dt(2030, 1, 2, 10, 0);
        let end = dt(2030, 1, 2, 9, 0);
        let err = validate_event_temporal(start, end, "Europe/Warsaw", None).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn rejects_unknown_timezone() {
        let start = dt(2030, 1, 2, 9, 0);
        let end = dt(2030, 1, 2, 10, 0);
        let err = validate_event_temporal(start, end, "Not/AZone", None).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn accepts_well_formed_weekly_rule() {
        let start = dt(2030, 1, 2, 9, 0);
        let end = dt(2030, 1, 2, 10, 0);
        let recurrence = Recurrence {
            rule: Some(RecurrenceRule {
                frequency: showcaster_core::model::Frequency::Weekly,
                until: None,
                count: Some(4),
                interval: 1,
                by_second: vec![],
                by_minute: vec![],
                by_hour: vec![],
                by_weekdays: vec![WeekdayRule {
                    day: showcaster_core::model::Weekday::Monday,
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
        };
        assert!(validate_event_temporal(start, end, "Europe/Warsaw", Some(&recurrence)).is_ok());
    }

    #[test]
    fn rejects_until_and_count_together() {
        let recurrence = Recurrence {
            rule: Some(RecurrenceRule {
                frequency: showcaster_core::model::Frequency::Daily,
                until: Some(chrono::Utc::now()),
                count: Some(4),
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
        };
        let start = dt(2030, 1, 2, 9, 0);
        let end = dt(2030, 1, 2, 10, 0);
        let err = validate_event_temporal(start, end, "Europe/Warsaw", Some(&recurrence)).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
