//! Notification channel wire format.
//!
//! Client → server: `{"type":"get_history"}` right after the socket opens.
//! Server → client: `{"type":"history","data":[...]}` with the full backlog, and
//! `{"type":"notification","data":{...}}` for each live event. Items use loose
//! typing; every missing field gets a default here.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::notifications::model::NotificationRecord;
use crate::util::{parse_timestamp, sha256_hex};

pub const HISTORY_REQUEST: &str = r#"{"type":"get_history"}"#;

/// Server echo of a read-state change; never shown to the user.
pub const READ_UPDATED: &str = "read_updated";
/// Server acknowledgement of a mark-read request; never shown to the user.
pub const MARK_READ_RESPONSE: &str = "mark_read_response";

const DEFAULT_KIND: &str = "info";

/// Distinguishes live pushes that carry neither an id nor a timestamp.
static LIVE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    History(Vec<NotificationRecord>),
    Notification(NotificationRecord),
    /// Valid JSON the listener has nothing to do with.
    Ignored(String),
}

/// Values substituted for fields the server left out.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext {
    pub fallback_user_id: i64,
    pub now: DateTime<Utc>,
}

impl NormalizeContext {
    pub fn new(fallback_user_id: i64) -> Self {
        Self {
            fallback_user_id,
            now: Utc::now(),
        }
    }
}

struct Defaults {
    title: &'static str,
    message: &'static str,
}

const HISTORY_DEFAULTS: Defaults = Defaults {
    title: "No Title",
    message: "No message",
};

const REALTIME_DEFAULTS: Defaults = Defaults {
    title: "New Notification",
    message: "You have a new notification.",
};

pub fn parse_frame(
    payload: &str,
    context: &NormalizeContext,
) -> Result<InboundFrame, serde_json::Error> {
    let value: Value = serde_json::from_str(payload)?;
    let Some(frame) = value.as_object() else {
        return Ok(InboundFrame::Ignored("frame is not an object".into()));
    };

    match frame.get("type").and_then(Value::as_str) {
        Some("history") => Ok(InboundFrame::History(normalize_history(
            frame.get("data"),
            context,
        ))),
        Some("notification") => {
            let item = match frame.get("data") {
                Some(Value::Object(data)) => data,
                Some(Value::Null) | None => frame,
                Some(_) => return Ok(InboundFrame::Ignored("notification data is not an object".into())),
            };
            let kind = item.get("type").and_then(Value::as_str);
            if matches!(kind, Some(READ_UPDATED) | Some(MARK_READ_RESPONSE)) {
                return Ok(InboundFrame::Ignored(format!(
                    "system notification `{}`",
                    kind.unwrap_or_default()
                )));
            }
            Ok(InboundFrame::Notification(normalize_item(
                item,
                context,
                &REALTIME_DEFAULTS,
                live_item_id(item, context),
            )))
        }
        Some(other) => Ok(InboundFrame::Ignored(format!("unhandled frame type `{other}`"))),
        None => Ok(InboundFrame::Ignored("frame without type".into())),
    }
}

/// History items minus read-state echoes, newest first. Items that are not
/// JSON objects carry no notification fields and are skipped.
fn normalize_history(data: Option<&Value>, context: &NormalizeContext) -> Vec<NotificationRecord> {
    let Some(Value::Array(items)) = data else {
        return Vec::new();
    };

    let mut records: Vec<NotificationRecord> = items
        .iter()
        .filter_map(Value::as_object)
        .filter(|item| item.get("type").and_then(Value::as_str) != Some(READ_UPDATED))
        .map(|item| normalize_item(item, context, &HISTORY_DEFAULTS, item_id(item, None)))
        .collect();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records
}

fn normalize_item(
    item: &Map<String, Value>,
    context: &NormalizeContext,
    defaults: &Defaults,
    id: String,
) -> NotificationRecord {
    NotificationRecord {
        id,
        user_id: item
            .get("user_id")
            .and_then(value_as_i64)
            .filter(|id| *id != 0)
            .unwrap_or(context.fallback_user_id),
        kind: non_empty_str(item, "type").unwrap_or(DEFAULT_KIND).to_string(),
        title: non_empty_str(item, "title")
            .unwrap_or(defaults.title)
            .to_string(),
        message: non_empty_str(item, "message")
            .unwrap_or(defaults.message)
            .to_string(),
        read: item.get("read").and_then(Value::as_bool).unwrap_or(false),
        metadata: item.get("metadata").filter(|value| !value.is_null()).cloned(),
        created_at: item
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .unwrap_or(context.now),
    }
}

/// Server id when present, otherwise a digest of the raw item (plus `salt`)
/// so that the same event replayed by a later history batch maps to the same id.
fn item_id(item: &Map<String, Value>, salt: Option<String>) -> String {
    match item.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => {
            let mut canonical = Value::Object(item.clone()).to_string();
            if let Some(salt) = salt {
                canonical.push_str(&salt);
            }
            format!("local-{}", &sha256_hex(canonical)[..16])
        }
    }
}

/// A live push without id or `created_at` has nothing that tells two identical
/// events apart, so its id also covers the receive time and a sequence number.
fn live_item_id(item: &Map<String, Value>, context: &NormalizeContext) -> String {
    if item.contains_key("created_at") {
        return item_id(item, None);
    }
    let sequence = LIVE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    item_id(item, Some(format!("{}#{sequence}", context.now.to_rfc3339())))
}

fn non_empty_str<'a>(item: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn context() -> NormalizeContext {
        NormalizeContext {
            fallback_user_id: 42,
            now: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    fn history_ids(payload: &str) -> Vec<String> {
        match parse_frame(payload, &context()).unwrap() {
            InboundFrame::History(records) => records.into_iter().map(|r| r.id).collect(),
            other => panic!("expected history, got {other:?}"),
        }
    }

    #[test]
    fn history_is_sorted_newest_first() {
        let payload = r#"{"type":"history","data":[
            {"id":"n1","type":"info","created_at":"2024-01-01T00:00:00Z"},
            {"id":"n2","type":"info","created_at":"2024-01-02T00:00:00Z"}]}"#;
        assert_eq!(history_ids(payload), vec!["n2", "n1"]);
    }

    #[test]
    fn read_updated_entries_are_dropped_from_history() {
        let payload = r#"{"type":"history","data":[
            {"id":"n1","type":"read_updated","created_at":"2024-01-01T00:00:00Z"},
            {"id":"n2","type":"escrow_funded","created_at":"2024-01-02T00:00:00Z"}]}"#;
        assert_eq!(history_ids(payload), vec!["n2"]);
    }

    #[test]
    fn history_items_get_defaults() {
        let payload = r#"{"type":"history","data":[{"id": 5}]}"#;
        let InboundFrame::History(records) = parse_frame(payload, &context()).unwrap() else {
            panic!("expected history");
        };
        let record = &records[0];
        assert_eq!(record.id, "5");
        assert_eq!(record.user_id, 42);
        assert_eq!(record.kind, "info");
        assert_eq!(record.title, "No Title");
        assert_eq!(record.message, "No message");
        assert!(!record.read);
        assert_eq!(record.metadata, None);
        assert_eq!(record.created_at, context().now);
    }

    #[test]
    fn missing_or_non_array_history_is_empty() {
        assert!(history_ids(r#"{"type":"history"}"#).is_empty());
        assert!(history_ids(r#"{"type":"history","data":{"id":"x"}}"#).is_empty());
    }

    #[test]
    fn realtime_notification_uses_realtime_defaults() {
        let payload = r#"{"type":"notification","data":{"type":"escrow_created","metadata":{"escrow_id":9}}}"#;
        let InboundFrame::Notification(record) = parse_frame(payload, &context()).unwrap() else {
            panic!("expected notification");
        };
        assert_eq!(record.kind, "escrow_created");
        assert_eq!(record.title, "New Notification");
        assert_eq!(record.message, "You have a new notification.");
        assert_eq!(record.metadata, Some(serde_json::json!({"escrow_id": 9})));
        assert!(record.id.starts_with("local-"));
    }

    #[test]
    fn notification_without_data_uses_frame_itself() {
        let payload = r#"{"type":"notification","id":"n7","title":"Funds released"}"#;
        let InboundFrame::Notification(record) = parse_frame(payload, &context()).unwrap() else {
            panic!("expected notification");
        };
        assert_eq!(record.id, "n7");
        assert_eq!(record.title, "Funds released");
        assert_eq!(record.kind, "notification");
    }

    #[test]
    fn read_state_echoes_are_ignored() {
        for kind in [READ_UPDATED, MARK_READ_RESPONSE] {
            let payload = format!(r#"{{"type":"notification","data":{{"id":"x","type":"{kind}"}}}}"#);
            assert!(matches!(
                parse_frame(&payload, &context()).unwrap(),
                InboundFrame::Ignored(_)
            ));
        }
    }

    #[test]
    fn fallback_ids_are_stable_across_replays() {
        let payload = r#"{"type":"notification","data":{"title":"Dispute opened","created_at":"2024-02-01T10:00:00Z"}}"#;
        let first = parse_frame(payload, &context()).unwrap();
        let mut later = context();
        later.now = later.now + chrono::Duration::hours(1);
        let second = parse_frame(payload, &later).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn identical_live_pushes_without_timestamp_stay_distinct() {
        let payload = r#"{"type":"notification","data":{"type":"escrow_funded","title":"Escrow funded"}}"#;
        let InboundFrame::Notification(first) = parse_frame(payload, &context()).unwrap() else {
            panic!("expected notification");
        };
        let InboundFrame::Notification(second) = parse_frame(payload, &context()).unwrap() else {
            panic!("expected notification");
        };
        assert_ne!(first.id, second.id);

        let store = crate::notifications::NotificationStore::new();
        store.insert(first);
        store.insert(second);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn history_fallback_ids_ignore_receive_time() {
        let payload = r#"{"type":"history","data":[{"title":"Escrow funded"}]}"#;
        let mut later = context();
        later.now = later.now + chrono::Duration::minutes(5);
        let ids_at = |context: &NormalizeContext| match parse_frame(payload, context).unwrap() {
            InboundFrame::History(records) => records[0].id.clone(),
            other => panic!("expected history, got {other:?}"),
        };
        assert_eq!(ids_at(&context()), ids_at(&later));
    }

    #[test]
    fn non_object_history_items_are_skipped() {
        let payload = r#"{"type":"history","data":["stray", 7, null, {"id":"n1"}]}"#;
        assert_eq!(history_ids(payload), vec!["n1"]);
    }

    #[test]
    fn unparseable_created_at_falls_back_to_now() {
        let payload = r#"{"type":"notification","data":{"id":"n1","created_at":"last week"}}"#;
        let InboundFrame::Notification(record) = parse_frame(payload, &context()).unwrap() else {
            panic!("expected notification");
        };
        assert_eq!(record.created_at, context().now);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_frame("{not json", &context()).is_err());
        assert!(matches!(
            parse_frame("[1,2]", &context()).unwrap(),
            InboundFrame::Ignored(_)
        ));
    }
}
