//! Queue snapshot model and its representation in the store.
//!
//! The slot list is stored under [`keys::QUEUE`] as one serialized JSON string so
//! that it is always replaced whole. The scalar fields live under their own keys and
//! may be observed slightly out of step with the list.

use crate::sab::QueueData;
use crate::store::{Store, keys};
use crate::util::format::format_size;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// State of one job as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemStatus {
    Queued,
    Downloading,
    Paused,
    Fetching,
    Grabbing,
    Propagating,
    Checking,
    Other(String),
}

impl From<String> for ItemStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Queued" => Self::Queued,
            "Downloading" => Self::Downloading,
            "Paused" => Self::Paused,
            "Fetching" => Self::Fetching,
            "Grabbing" => Self::Grabbing,
            "Propagating" => Self::Propagating,
            "Checking" => Self::Checking,
            _ => Self::Other(value),
        }
    }
}

impl From<ItemStatus> for String {
    fn from(status: ItemStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "Queued",
            Self::Downloading => "Downloading",
            Self::Paused => "Paused",
            Self::Fetching => "Fetching",
            Self::Grabbing => "Grabbing",
            Self::Propagating => "Propagating",
            Self::Checking => "Checking",
            Self::Other(other) => other,
        };
        f.write_str(s)
    }
}

/// One job in the rendered queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    #[serde(rename = "nzo_id")]
    pub id: String,
    #[serde(default)]
    pub filename: String,
    pub status: ItemStatus,
    #[serde(default)]
    pub percentage: u8,
    #[serde(default)]
    pub mb: f64,
    #[serde(default)]
    pub mbleft: f64,
    #[serde(default)]
    pub timeleft: String,
}

impl QueueItem {
    pub fn is_paused(&self) -> bool {
        self.status == ItemStatus::Paused
    }
}

/// Overall queue state published with each snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Paused,
    Downloading,
    #[default]
    Idle,
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Paused => "paused",
            Self::Downloading => "downloading",
            Self::Idle => "idle",
        })
    }
}

/// Locally cached copy of the remote queue
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueSnapshot {
    pub items: Vec<QueueItem>,
    pub status: QueueStatus,
    pub paused: bool,
    pub timeleft: String,
    pub speed: String,
    pub sizeleft: String,
    pub paused_jobs: usize,
    pub pause_int: String,
    pub speedlimit: String,
}

impl QueueSnapshot {
    /// Build the snapshot published after a successful fetch
    pub fn from_queue(data: QueueData) -> Self {
        let paused = data.paused;
        let timeleft = non_empty_or(data.timeleft, "0");
        let speed = if data.speed.trim().is_empty() {
            "-".to_string()
        } else {
            format!("{}B/s", data.speed)
        };
        let sizeleft = if data.mbleft > 0.0 {
            format_size(data.mbleft * 1_048_576.0)
        } else {
            String::new()
        };
        let pause_int = non_empty_or(data.pause_int, "0");
        let speedlimit = data.speedlimit;

        let items: Vec<QueueItem> = data.slots.into_iter().map(QueueItem::from).collect();
        let status = if paused {
            QueueStatus::Paused
        } else if !items.is_empty() {
            QueueStatus::Downloading
        } else {
            QueueStatus::Idle
        };
        let paused_jobs = items.iter().filter(|item| item.is_paused()).count();

        Self {
            items,
            status,
            paused,
            timeleft,
            speed,
            sizeleft,
            paused_jobs,
            pause_int,
            speedlimit,
        }
    }

    /// Store entries for this snapshot, written together with `error = ""`
    pub fn store_entries(&self) -> Vec<(&'static str, Value)> {
        vec![
            (keys::ERROR, json!("")),
            (keys::STATUS, json!(self.status)),
            (keys::PAUSED, json!(self.paused)),
            (keys::TIMELEFT, json!(self.timeleft)),
            (keys::SPEED, json!(self.speed)),
            (keys::SIZELEFT, json!(self.sizeleft)),
            (keys::PAUSED_JOBS, json!(self.paused_jobs)),
            (keys::PAUSE_INT, json!(self.pause_int)),
            (keys::SPEEDLIMIT, json!(self.speedlimit)),
            (keys::QUEUE, Value::String(serialize_items(&self.items))),
        ]
    }

    /// Read the last published snapshot. Missing fields take their empty values.
    pub async fn load(store: &Store) -> Self {
        let items = match store.get_raw(keys::QUEUE).await {
            Some(Value::String(blob)) => parse_items(&blob),
            Some(Value::Array(list)) => parse_items(&Value::Array(list).to_string()),
            Some(other) => {
                tracing::warn!("Stored queue has unexpected type: {}", other);
                Vec::new()
            }
            None => Vec::new(),
        };

        Self {
            items,
            status: store.get(keys::STATUS).await.unwrap_or_default(),
            paused: store.get_flag(keys::PAUSED).await,
            timeleft: store.get_string(keys::TIMELEFT).await.unwrap_or_default(),
            speed: store.get_string(keys::SPEED).await.unwrap_or_default(),
            sizeleft: store.get_string(keys::SIZELEFT).await.unwrap_or_default(),
            paused_jobs: store.get(keys::PAUSED_JOBS).await.unwrap_or_default(),
            pause_int: store.get_string(keys::PAUSE_INT).await.unwrap_or_default(),
            speedlimit: store.get_string(keys::SPEEDLIMIT).await.unwrap_or_default(),
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// Serialize an item list into the stored blob
pub fn serialize_items(items: &[QueueItem]) -> String {
    serde_json::to_string(items).unwrap_or_else(|e| {
        tracing::error!("Failed to serialize queue: {}", e);
        "[]".to_string()
    })
}

/// Parse the stored blob. A malformed blob is logged and yields an empty queue.
pub fn parse_items(blob: &str) -> Vec<QueueItem> {
    if blob.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<QueueItem>>(blob) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("Stored queue is malformed, showing empty queue: {}", e);
            Vec::new()
        }
    }
}
