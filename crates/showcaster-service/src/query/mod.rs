//! C4 Query Planner: builds the CalDAV `REPORT` body for a structured [`Query`] and
//! extracts the matching event ids out of the returned multistatus XML so the
//! Coordinator can fuse them into a RelStore `where` predicate (§4.4).

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use uuid::Uuid;

use crate::calstore::CalStoreError;

const DAV_NS: &str = "DAV:";
const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";
const UTC_LITERAL: &str = "%Y%m%dT%H%M%SZ";

/// A structured CalDAV query the Coordinator compiles into a `REPORT` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Selects events whose `DTSTART` falls in `[start, end)`; either bound may be
    /// unset for an unbounded side.
    TimeRange {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
    /// Selects events whose `RRULE` is present (`true`) or absent (`false`).
    Recurring { recurring: bool },
}

/// Builds a `C:calendar-query` `REPORT` body for `query` (§4.4): a `calendar-data`
/// prop request plus a `VCALENDAR`/`VEVENT` `comp-filter` carrying the leaf
/// condition.
///
/// ## Errors
/// Returns a `CalStoreError::Xml` if the `quick_xml` writer fails, which in practice
/// only happens on an IO error from the in-memory buffer.
pub fn build_report_xml(query: &Query) -> Result<String, CalStoreError> {
    let mut writer = Writer::new(Vec::new());
    write_report(&mut writer, query).map_err(|err| CalStoreError::Xml(err.to_string()))?;
    String::from_utf8(writer.into_inner()).map_err(|err| CalStoreError::Xml(err.to_string()))
}

fn write_report<W: std::io::Write>(
    writer: &mut Writer<W>,
    query: &Query,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("C:calendar-query");
    root.push_attribute(("xmlns:D", DAV_NS));
    root.push_attribute(("xmlns:C", CALDAV_NS));
    writer.write_event(Event::Start(root))?;

    writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
    writer.write_event(Event::Empty(BytesStart::new("C:calendar-data")))?;
    writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

    writer.write_event(Event::Start(BytesStart::new("C:filter")))?;
    let mut vcalendar = BytesStart::new("C:comp-filter");
    vcalendar.push_attribute(("name", "VCALENDAR"));
    writer.write_event(Event::Start(vcalendar))?;

    let mut vevent = BytesStart::new("C:comp-filter");
    vevent.push_attribute(("name", "VEVENT"));
    writer.write_event(Event::Start(vevent))?;
    write_leaf(writer, query)?;
    writer.write_event(Event::End(BytesEnd::new("C:comp-filter")))?;

    writer.write_event(Event::End(BytesEnd::new("C:comp-filter")))?;
    writer.write_event(Event::End(BytesEnd::new("C:filter")))?;

    writer.write_event(Event::End(BytesEnd::new("C:calendar-query")))?;
    Ok(())
}

fn write_leaf<W: std::io::Write>(
    writer: &mut Writer<W>,
    query: &Query,
) -> Result<(), quick_xml::Error> {
    match query {
        Query::TimeRange { start, end } => {
            let mut elem = BytesStart::new("C:time-range");
            if let Some(start) = start {
                elem.push_attribute(("start", start.format(UTC_LITERAL).to_string().as_str()));
            }
            if let Some(end) = end {
                elem.push_attribute(("end", end.format(UTC_LITERAL).to_string().as_str()));
            }
            writer.write_event(Event::Empty(elem))?;
        }
        Query::Recurring { recurring } => {
            let mut elem = BytesStart::new("C:prop-filter");
            elem.push_attribute(("name", "RRULE"));
            if *recurring {
                writer.write_event(Event::Empty(elem))?;
            } else {
                writer.write_event(Event::Start(elem))?;
                writer.write_event(Event::Empty(BytesStart::new("C:is-not-defined")))?;
                writer.write_event(Event::End(BytesEnd::new("C:prop-filter")))?;
            }
        }
    }
    Ok(())
}

/// Extracts the event ids out of a `REPORT` multistatus response: every `D:href`
/// value is expected to end in `{uid}.ics` (§4.3's naming scheme).
///
/// ## Errors
/// Returns a `CalStoreError::Xml` if the XML is malformed or an href does not carry
/// a parseable UUID.
pub fn extract_uids(multistatus_xml: &str) -> Result<Vec<Uuid>, CalStoreError> {
    let mut reader = Reader::from_str(multistatus_xml);
    reader.config_mut().trim_text(true);

    let mut uids = Vec::new();
    let mut in_href = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if local_name(&e) == "href" => in_href = true,
            Ok(Event::End(e)) if local_name_end(&e) == "href" => in_href = false,
            Ok(Event::Text(text)) if in_href => {
                let decoded = text
                    .decode()
                    .map_err(|err| CalStoreError::Xml(err.to_string()))?;
                uids.push(parse_uid_from_href(&decoded)?);
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(CalStoreError::Xml(err.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(uids)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn local_name_end(e: &BytesEnd<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn parse_uid_from_href(href: &str) -> Result<Uuid, CalStoreError> {
    let file = href.rsplit('/').next().unwrap_or(href);
    let stem = file.strip_suffix(".ics").unwrap_or(file);
    Uuid::parse_str(stem).map_err(|err| {
        CalStoreError::Xml(format!("href {href} does not carry a parseable UID: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_time_range_filter_with_both_bounds() {
        let query = Query::TimeRange {
            start: Some(DateTime::parse_from_rfc3339("2030-03-01T00:00:00Z").unwrap().with_timezone(&Utc)),
            end: Some(DateTime::parse_from_rfc3339("2030-04-01T00:00:00Z").unwrap().with_timezone(&Utc)),
        };
        let xml = build_report_xml(&query).unwrap();
        assert!(xml.contains(r#"<C:time-range start="20300301T000000Z" end="20300401T000000Z"/>"#));
    }

    #[test]
    fn time_range_omits_unset_bound() {
        let query = Query::TimeRange {
            start: None,
            end: Some(DateTime::parse_from_rfc3339("2030-04-01T00:00:00Z").unwrap().with_timezone(&Utc)),
        };
        let xml = build_report_xml(&query).unwrap();
        assert!(xml.contains(r#"<C:time-range end="20300401T000000Z"/>"#));
    }

    #[test]
    fn recurring_true_emits_bare_prop_filter() {
        let xml = build_report_xml(&Query::Recurring { recurring: true }).unwrap();
        assert!(xml.contains(r#"<C:prop-filter name="RRULE"/>"#));
    }

    #[test]
    fn recurring_false_nests_is_not_defined() {
        let xml = build_report_xml(&Query::Recurring { recurring: false }).unwrap();
        assert!(xml.contains(r#"<C:prop-filter name="RRULE"><C:is-not-defined/></C:prop-filter>"#));
    }

    #[test]
    fn extracts_uids_from_multistatus() {
        let xml = r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/calendars/main/11111111-1111-1111-1111-111111111111.ics</D:href>
  </D:response>
  <D:response>
    <D:href>/calendars/main/22222222-2222-2222-2222-222222222222.ics</D:href>
  </D:response>
</D:multistatus>"#;
        let uids = extract_uids(xml).unwrap();
        assert_eq!(uids.len(), 2);
        assert_eq!(uids[0], Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap());
    }
}
