//! Wire shapes returned by the queue service.
//!
//! The service is loose about numbers: `percentage`, `mb` and friends arrive as
//! strings from most versions and as numbers from some. Every numeric field here
//! goes through [`lenient_f64`] so either form is accepted.

use crate::queue::QueueItem;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Top-level `mode=queue` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueEnvelope {
    #[serde(default)]
    pub queue: QueueData,
}

/// The `queue` object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueData {
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timeleft: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub speed: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mbleft: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pause_int: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub kbpersec: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub speedlimit: String,
}

/// One job record (`slot`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Slot {
    #[serde(default)]
    pub nzo_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub percentage: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mb: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mbleft: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timeleft: String,
}

impl From<Slot> for QueueItem {
    fn from(slot: Slot) -> Self {
        QueueItem {
            id: slot.nzo_id,
            filename: slot.filename,
            status: slot.status.into(),
            percentage: slot.percentage.clamp(0.0, 100.0).round() as u8,
            mb: slot.mb,
            mbleft: slot.mbleft,
            timeleft: slot.timeleft,
        }
    }
}

impl QueueData {
    pub fn into_items(self) -> Vec<QueueItem> {
        self.slots.into_iter().map(QueueItem::from).collect()
    }
}

/// `mode=version` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: String,
}

/// The service's application error, if the body carries a truthy `error` field
pub fn api_error(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    match error {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::ItemStatus;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_string_percentage_is_parsed() {
        let envelope: QueueEnvelope = serde_json::from_value(json!({
            "queue": {
                "paused": false,
                "slots": [{"nzo_id": "A", "filename": "x.nzb", "status": "Downloading", "percentage": "42"}]
            }
        }))
        .unwrap();

        let items = envelope.queue.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "A");
        assert_eq!(items[0].percentage, 42);
        assert_eq!(items[0].status, ItemStatus::Downloading);
    }

    #[test]
    fn test_numeric_fields_accept_numbers_and_garbage() {
        let data: QueueData = serde_json::from_value(json!({
            "paused": true,
            "mbleft": 12.5,
            "kbpersec": "oops",
            "pause_int": 0,
            "slots": [{"nzo_id": "B", "percentage": 250, "mb": "100.0"}]
        }))
        .unwrap();

        assert!(data.paused);
        assert_eq!(data.mbleft, 12.5);
        assert_eq!(data.kbpersec, 0.0);
        assert_eq!(data.pause_int, "0");
        assert_eq!(data.slots[0].mb, 100.0);
        assert_eq!(data.into_items()[0].percentage, 100);
    }

    #[test]
    fn test_missing_queue_object_is_empty() {
        let envelope: QueueEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.queue.slots.is_empty());
        assert!(!envelope.queue.paused);
    }

    #[test]
    fn test_api_error_truthiness() {
        assert_eq!(api_error(&json!({"error": "API Key Incorrect"})), Some("API Key Incorrect".into()));
        assert_eq!(api_error(&json!({"error": ""})), None);
        assert_eq!(api_error(&json!({"error": false})), None);
        assert_eq!(api_error(&json!({"error": null})), None);
        assert_eq!(api_error(&json!({"queue": {}})), None);
        assert_eq!(api_error(&json!({"error": true})), Some("true".into()));
    }
}
