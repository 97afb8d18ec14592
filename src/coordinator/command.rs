//! Typed command union accepted by the coordinator and its single response shape.
//!
//! Wire format: a JSON object tagged by `action`, e.g.
//! `{"action": "pause_download", "nzo_id": "SABnzbd_nzo_1"}`.

use crate::profile::ProfileValues;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Request sent from a surface (popup, CLI) to the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    /// Fetch the queue now
    RefreshData,

    /// Fetch the queue; a full update also extends the speed log
    FetchInfo {
        #[serde(default = "default_quick_update", rename = "quickUpdate", alias = "quick_update")]
        quick_update: bool,
    },

    PauseDownload { nzo_id: String },

    ResumeDownload { nzo_id: String },

    RemoveDownload { nzo_id: String },

    /// Move a job to a zero-based queue position
    MoveItem { nzo_id: String, position: usize },

    SetSpeedLimit {
        #[serde(deserialize_with = "lenient_text")]
        speed: String,
    },

    /// Pause the queue; no duration (or 0) pauses until resumed
    PauseQueue {
        #[serde(default, deserialize_with = "lenient_minutes")]
        duration: Option<u32>,
    },

    ResumeQueue,

    /// Probe a candidate profile without saving it
    TestConnection { profile: ProfileValues },

    GetCategories,

    GetProfiles,

    AddUrl {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nzbname: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
    },

    GetSetting { setting: String },

    ResetSettings,

    /// Re-read the refresh rate and restart the polling timer
    RestartTimer,

    /// Classify a page URL for newznab handling
    CheckPage { url: String },

    /// Stop auto-detection on a host
    IgnoreHost { host: String },
}

fn default_quick_update() -> bool {
    true
}

impl Command {
    /// Every `action` tag this union understands
    pub const ACTIONS: &'static [&'static str] = &[
        "refresh_data",
        "fetch_info",
        "pause_download",
        "resume_download",
        "remove_download",
        "move_item",
        "set_speed_limit",
        "pause_queue",
        "resume_queue",
        "test_connection",
        "get_categories",
        "get_profiles",
        "add_url",
        "get_setting",
        "reset_settings",
        "restart_timer",
        "check_page",
        "ignore_host",
    ];

    /// Parse a raw JSON message. Unknown actions resolve to `{error: "Unknown action"}`.
    pub fn from_json(raw: &str) -> Result<Self, CommandResponse> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| CommandResponse::failure(format!("Invalid command JSON: {}", e)))?;

        let known = value
            .get("action")
            .and_then(Value::as_str)
            .is_some_and(|action| Self::ACTIONS.contains(&action));
        if !known {
            return Err(CommandResponse::error_only("Unknown action"));
        }

        serde_json::from_value(value)
            .map_err(|e| CommandResponse::failure(format!("Invalid command: {}", e)))
    }

    /// Whether a successful run changes remote queue state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::PauseDownload { .. }
                | Self::ResumeDownload { .. }
                | Self::RemoveDownload { .. }
                | Self::MoveItem { .. }
                | Self::SetSpeedLimit { .. }
                | Self::PauseQueue { .. }
                | Self::ResumeQueue
        )
    }

    /// The `action` tag
    pub fn action(&self) -> &'static str {
        match self {
            Self::RefreshData => "refresh_data",
            Self::FetchInfo { .. } => "fetch_info",
            Self::PauseDownload { .. } => "pause_download",
            Self::ResumeDownload { .. } => "resume_download",
            Self::RemoveDownload { .. } => "remove_download",
            Self::MoveItem { .. } => "move_item",
            Self::SetSpeedLimit { .. } => "set_speed_limit",
            Self::PauseQueue { .. } => "pause_queue",
            Self::ResumeQueue => "resume_queue",
            Self::TestConnection { .. } => "test_connection",
            Self::GetCategories => "get_categories",
            Self::GetProfiles => "get_profiles",
            Self::AddUrl { .. } => "add_url",
            Self::GetSetting { .. } => "get_setting",
            Self::ResetSettings => "reset_settings",
            Self::RestartTimer => "restart_timer",
            Self::CheckPage { .. } => "check_page",
            Self::IgnoreHost { .. } => "ignore_host",
        }
    }
}

/// Reply to every command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Command-specific payload (`categories`, `profiles`, `version`, ...)
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self {
            success: Some(true),
            ..Default::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            error: Some(message.into()),
            data: Map::new(),
        }
    }

    /// Bare `{error}` reply used for messages that never reached a handler
    pub fn error_only(message: impl Into<String>) -> Self {
        Self {
            success: None,
            error: Some(message.into()),
            data: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }

    /// Error text, or an empty string on success
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Minutes as a number or numeric string; anything else means "no duration"
fn lenient_minutes<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|m| u32::try_from(m).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|m| *m > 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_tagged_commands() {
        assert_eq!(
            Command::from_json(r#"{"action":"pause_download","nzo_id":"A"}"#).unwrap(),
            Command::PauseDownload { nzo_id: "A".into() }
        );
        assert_eq!(
            Command::from_json(r#"{"action":"resume_queue"}"#).unwrap(),
            Command::ResumeQueue
        );
        assert_eq!(
            Command::from_json(r#"{"action":"fetch_info"}"#).unwrap(),
            Command::FetchInfo { quick_update: true }
        );
        assert_eq!(
            Command::from_json(r#"{"action":"fetch_info","quickUpdate":false}"#).unwrap(),
            Command::FetchInfo { quick_update: false }
        );
    }

    #[test]
    fn test_pause_queue_duration_forms() {
        let parse = |raw: &str| match Command::from_json(raw).unwrap() {
            Command::PauseQueue { duration } => duration,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(parse(r#"{"action":"pause_queue","duration":15}"#), Some(15));
        assert_eq!(parse(r#"{"action":"pause_queue","duration":"30"}"#), Some(30));
        assert_eq!(parse(r#"{"action":"pause_queue","duration":0}"#), None);
        assert_eq!(parse(r#"{"action":"pause_queue","duration":"soon"}"#), None);
        assert_eq!(parse(r#"{"action":"pause_queue"}"#), None);
    }

    #[test]
    fn test_speed_accepts_number() {
        assert_eq!(
            Command::from_json(r#"{"action":"set_speed_limit","speed":500}"#).unwrap(),
            Command::SetSpeedLimit { speed: "500".into() }
        );
    }

    #[test]
    fn test_unknown_action() {
        let response = Command::from_json(r#"{"action":"launch_rockets"}"#).unwrap_err();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"error": "Unknown action"})
        );
        assert!(Command::from_json(r#"{"nzo_id":"A"}"#).is_err());
    }

    #[test]
    fn test_known_action_with_bad_fields() {
        let response = Command::from_json(r#"{"action":"pause_download"}"#).unwrap_err();
        assert_eq!(response.success, Some(false));
        assert!(response.error_message().starts_with("Invalid command"));
    }

    #[test]
    fn test_action_tags_match_serialization() {
        let commands = vec![
            Command::RefreshData,
            Command::MoveItem { nzo_id: "A".into(), position: 2 },
            Command::TestConnection { profile: ProfileValues::new("http://x/") },
            Command::CheckPage { url: "http://x/".into() },
        ];
        for command in commands {
            let value = serde_json::to_value(&command).unwrap();
            assert_eq!(value["action"], command.action());
            assert!(Command::ACTIONS.contains(&command.action()));
        }
    }

    #[test]
    fn test_response_shape() {
        let response = CommandResponse::ok().with("categories", json!(["TV"]));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": true, "categories": ["TV"]})
        );
        assert_eq!(
            serde_json::to_value(CommandResponse::failure("boom")).unwrap(),
            json!({"success": false, "error": "boom"})
        );
    }
}
