use chrono::{DateTime, NaiveDateTime, Utc};

use domain::alert::error::AlertError;
use domain::alert::event::{AlertEvent, LifecycleEvent};
use domain::alert::sla::SlaTier;

/// Timestamp layouts seen in message history lines, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &["%m/%d/%Y %I:%M:%S %p", "%m/%d/%Y %I:%M %p"];

/// Extract one lifecycle event from a plain-text alert message body.
///
/// Expected layout: labelled header lines (`Alert ID:`, `Alert:`,
/// `Alert Type:`, `Location:`, `Status:`, `SLA Level:`) followed by a
/// history section whose latest entry (the third non-empty line from the
/// end) carries `timestamp / ... / actor: note` segments. Any missing
/// field, unknown status, or unparseable timestamp/tier makes the whole
/// message malformed; the caller drops it without touching the registry.
pub fn parse_alert_body(body: &str) -> Result<AlertEvent, AlertError> {
    let lines: Vec<&str> = body
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let id = field(&lines, "Alert ID:")?;
    let name = field(&lines, "Alert:")?;
    let category = field(&lines, "Alert Type:")?;
    let location = field(&lines, "Location:")?;
    let status = field(&lines, "Status:")?;
    let sla_tier: SlaTier = field(&lines, "SLA Level:")?.parse()?;

    let (actor, timestamp) = latest_history_entry(&lines)?;

    let event = LifecycleEvent {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        location: location.to_string(),
        actor: actor.to_string(),
        timestamp: Some(timestamp),
        sla_tier,
    };

    if status.contains("Initiated") {
        Ok(AlertEvent::Raise(event))
    } else if status.contains("Acknowledged") {
        Ok(AlertEvent::Acknowledge(event))
    } else if status.contains("Resolved") {
        Ok(AlertEvent::Resolve(event))
    } else {
        Err(AlertError::MalformedEvent(format!(
            "unknown status '{status}'"
        )))
    }
}

/// Value of the first line containing `label`, with the label stripped.
fn field<'a>(lines: &[&'a str], label: &str) -> Result<&'a str, AlertError> {
    lines
        .iter()
        .find_map(|line| line.split_once(label).map(|(_, value)| value.trim()))
        .ok_or_else(|| AlertError::MalformedEvent(format!("missing field '{label}'")))
}

/// Actor and timestamp of the latest history entry: the third non-empty
/// line from the end, segmented by ` / `. The first segment starts with
/// the timestamp (truncated at its AM/PM marker), the last one is
/// `actor: note`.
fn latest_history_entry<'a>(lines: &[&'a str]) -> Result<(&'a str, DateTime<Utc>), AlertError> {
    let history = lines
        .len()
        .checked_sub(3)
        .and_then(|idx| lines.get(idx))
        .ok_or_else(|| AlertError::MalformedEvent("missing history section".to_string()))?;

    let segments: Vec<&str> = history
        .split(" / ")
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();
    let (first, last) = match (segments.first(), segments.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(AlertError::MalformedEvent(format!(
                "unrecognized history line '{history}'"
            )));
        }
    };

    let actor = last
        .split(':')
        .next()
        .map(str::trim)
        .filter(|actor| !actor.is_empty())
        .ok_or_else(|| AlertError::MalformedEvent(format!("no actor in '{last}'")))?;

    let timestamp = parse_timestamp(first)?;
    Ok((actor, timestamp))
}

fn parse_timestamp(segment: &str) -> Result<DateTime<Utc>, AlertError> {
    let end = segment
        .find("AM")
        .or_else(|| segment.find("PM"))
        .map(|idx| idx + 2)
        .ok_or_else(|| {
            AlertError::MalformedEvent(format!("no AM/PM timestamp in '{segment}'"))
        })?;
    let text = segment[..end].trim();

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AlertError::MalformedEvent(format!("unparseable timestamp '{text}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn sample_body(status: &str, tier: &str) -> String {
        format!(
            "Alert ID: A-17\r\n\
             Alert: Jam\r\n\
             Alert Type: Mechanical\r\n\
             Location: Line 3\r\n\
             Status: {status}\r\n\
             SLA Level: {tier}\r\n\
             \r\n\
             8/5/2026 10:31:00 AM / station 12 / jsmith: raised the alert\r\n\
             --\r\n\
             Plant Operations\r\n"
        )
    }

    #[test]
    fn initiated_body_parses_to_raise() {
        let event = parse_alert_body(&sample_body("Initiated", "0")).unwrap();
        let AlertEvent::Raise(e) = event else {
            panic!("expected raise");
        };
        assert_eq!(e.id, "A-17");
        assert_eq!(e.name, "Jam");
        assert_eq!(e.category, "Mechanical");
        assert_eq!(e.location, "Line 3");
        assert_eq!(e.actor, "jsmith");
        assert_eq!(e.sla_tier, SlaTier::Normal);

        let ts = e.timestamp.unwrap();
        assert_eq!((ts.month(), ts.day(), ts.year()), (8, 5, 2026));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (10, 31, 0));
    }

    #[test]
    fn acknowledged_and_resolved_statuses_map_to_their_events() {
        assert!(matches!(
            parse_alert_body(&sample_body("Acknowledged", "1")).unwrap(),
            AlertEvent::Acknowledge(_)
        ));
        assert!(matches!(
            parse_alert_body(&sample_body("Resolved", "2")).unwrap(),
            AlertEvent::Resolve(_)
        ));
    }

    #[test]
    fn status_match_tolerates_surrounding_text() {
        let event = parse_alert_body(&sample_body("eAndon Initiated (auto)", "0")).unwrap();
        assert!(matches!(event, AlertEvent::Raise(_)));
    }

    #[test]
    fn pm_timestamp_crosses_noon() {
        let body = sample_body("Initiated", "0").replace("10:31:00 AM", "2:05 PM");
        let AlertEvent::Raise(e) = parse_alert_body(&body).unwrap() else {
            panic!("expected raise");
        };
        assert_eq!(e.timestamp.unwrap().hour(), 14);
    }

    #[test]
    fn missing_field_is_malformed() {
        let body = sample_body("Initiated", "0").replace("Location: Line 3\r\n", "");
        let err = parse_alert_body(&body).unwrap_err();
        assert!(err.to_string().contains("Location"), "got: {err}");
    }

    #[test]
    fn unknown_status_is_malformed() {
        let err = parse_alert_body(&sample_body("Escalated", "0")).unwrap_err();
        assert!(err.to_string().contains("unknown status"), "got: {err}");
    }

    #[test]
    fn out_of_range_tier_is_rejected() {
        assert!(parse_alert_body(&sample_body("Initiated", "7")).is_err());
        assert!(parse_alert_body(&sample_body("Initiated", "high")).is_err());
    }

    #[test]
    fn timestamp_without_meridiem_is_malformed() {
        let body = sample_body("Initiated", "0").replace("10:31:00 AM", "10:31:00");
        assert!(parse_alert_body(&body).is_err());
    }

    #[test]
    fn garbage_body_is_malformed() {
        assert!(parse_alert_body("out of office auto-reply").is_err());
        assert!(parse_alert_body("").is_err());
    }
}
