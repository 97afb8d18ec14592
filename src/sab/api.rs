//! Translation of local intents into form-encoded API requests.

use super::error::{SabError, SabResult};
use crate::profile::ProfileValues;
use url::Url;

/// One call against the `/api` endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    /// Full queue snapshot
    Queue,
    /// Ask the service to fetch an NZB from a URL
    AddUrl {
        url: String,
        nzbname: Option<String>,
        category: Option<String>,
    },
    PauseItem(String),
    ResumeItem(String),
    DeleteItem(String),
    /// Move a job to a zero-based queue position
    MoveItem { nzo_id: String, position: usize },
    /// Speed limit as entered by the user (KB/s or with unit suffix)
    SpeedLimit(String),
    /// Pause the whole queue for a number of minutes
    PauseFor(u32),
    /// Pause the whole queue until resumed
    Pause,
    Resume,
    /// Connectivity probe
    Version,
}

impl ApiRequest {
    /// Intent-specific form fields, in wire order
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let queue_action = |name: &str, id: &str| {
            vec![
                ("mode", "queue".to_string()),
                ("name", name.to_string()),
                ("value", id.to_string()),
            ]
        };

        match self {
            Self::Queue => vec![("mode", "queue".to_string()), ("output", "json".to_string())],
            Self::AddUrl {
                url,
                nzbname,
                category,
            } => {
                let mut fields = vec![("mode", "addurl".to_string()), ("name", url.clone())];
                if let Some(name) = nzbname.as_ref().filter(|n| !n.is_empty()) {
                    fields.push(("nzbname", name.clone()));
                }
                if let Some(cat) = category.as_ref().filter(|c| !c.is_empty()) {
                    fields.push(("cat", cat.clone()));
                }
                fields
            }
            Self::PauseItem(id) => queue_action("pause", id),
            Self::ResumeItem(id) => queue_action("resume", id),
            Self::DeleteItem(id) => queue_action("delete", id),
            Self::MoveItem { nzo_id, position } => vec![
                ("mode", "switch".to_string()),
                ("value", nzo_id.clone()),
                ("value2", position.to_string()),
            ],
            Self::SpeedLimit(speed) => vec![
                ("mode", "config".to_string()),
                ("name", "speedlimit".to_string()),
                ("value", speed.clone()),
            ],
            Self::PauseFor(minutes) => vec![
                ("mode", "config".to_string()),
                ("name", "set_pause".to_string()),
                ("value", minutes.to_string()),
            ],
            Self::Pause => vec![("mode", "pause".to_string())],
            Self::Resume => vec![("mode", "resume".to_string())],
            Self::Version => vec![("mode", "version".to_string()), ("output", "json".to_string())],
        }
    }

    /// Whether the service answers this intent with a JSON document
    pub fn expects_json(&self) -> bool {
        matches!(self, Self::Queue | Self::Version | Self::AddUrl { .. })
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::AddUrl { .. } => "addurl",
            Self::PauseItem(_) => "pause-item",
            Self::ResumeItem(_) => "resume-item",
            Self::DeleteItem(_) => "delete-item",
            Self::MoveItem { .. } => "switch",
            Self::SpeedLimit(_) => "speedlimit",
            Self::PauseFor(_) => "set_pause",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Version => "version",
        }
    }
}

/// Credential fields sent with every request (only the non-empty ones)
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl From<&ProfileValues> for Credentials {
    fn from(values: &ProfileValues) -> Self {
        Self {
            api_key: values.api_key.clone(),
            username: values.username.clone(),
            password: values.password.clone(),
        }
    }
}

impl Credentials {
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("apikey", self.api_key.as_str()),
            ("ma_username", self.username.as_str()),
            ("ma_password", self.password.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }
}

/// Form-encode credentials followed by the intent's fields
pub fn encode_body(credentials: &Credentials, request: &ApiRequest) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in credentials.fields() {
        serializer.append_pair(key, value);
    }
    for (key, value) in request.fields() {
        serializer.append_pair(key, &value);
    }
    serializer.finish()
}

/// Build `<base>/api`, adding the trailing slash the base may lack
pub fn api_url(base: &str) -> SabResult<Url> {
    let trimmed = base.trim();
    if trimmed.is_empty() {
        return Err(SabError::InvalidUrl {
            url: base.to_string(),
            reason: "empty".to_string(),
        });
    }

    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };

    let parsed = Url::parse(&with_slash).map_err(|e| SabError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SabError::InvalidUrl {
            url: base.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    parsed.join("api").map_err(|e| SabError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_credentials() -> Credentials {
        Credentials::default()
    }

    #[test]
    fn test_pause_for_duration_body() {
        let body = encode_body(&no_credentials(), &ApiRequest::PauseFor(15));
        assert_eq!(body, "mode=config&name=set_pause&value=15");
    }

    #[test]
    fn test_item_action_bodies() {
        let creds = no_credentials();
        assert_eq!(
            encode_body(&creds, &ApiRequest::PauseItem("SABnzbd_nzo_1".into())),
            "mode=queue&name=pause&value=SABnzbd_nzo_1"
        );
        assert_eq!(
            encode_body(&creds, &ApiRequest::ResumeItem("A".into())),
            "mode=queue&name=resume&value=A"
        );
        assert_eq!(
            encode_body(&creds, &ApiRequest::DeleteItem("A".into())),
            "mode=queue&name=delete&value=A"
        );
        assert_eq!(
            encode_body(
                &creds,
                &ApiRequest::MoveItem {
                    nzo_id: "A".into(),
                    position: 3
                }
            ),
            "mode=switch&value=A&value2=3"
        );
    }

    #[test]
    fn test_queue_level_bodies() {
        let creds = no_credentials();
        assert_eq!(encode_body(&creds, &ApiRequest::Queue), "mode=queue&output=json");
        assert_eq!(encode_body(&creds, &ApiRequest::Pause), "mode=pause");
        assert_eq!(encode_body(&creds, &ApiRequest::Resume), "mode=resume");
        assert_eq!(encode_body(&creds, &ApiRequest::Version), "mode=version&output=json");
        assert_eq!(
            encode_body(&creds, &ApiRequest::SpeedLimit("500".into())),
            "mode=config&name=speedlimit&value=500"
        );
    }

    #[test]
    fn test_credentials_precede_intent_and_skip_empty() {
        let creds = Credentials {
            api_key: "abc".into(),
            username: String::new(),
            password: "p w".into(),
        };
        assert_eq!(
            encode_body(&creds, &ApiRequest::Resume),
            "apikey=abc&ma_password=p+w&mode=resume"
        );
    }

    #[test]
    fn test_add_url_encodes_optional_fields() {
        let request = ApiRequest::AddUrl {
            url: "http://idx.example/get?id=1&x=2".into(),
            nzbname: Some("My Show".into()),
            category: Some(String::new()),
        };
        assert_eq!(
            encode_body(&no_credentials(), &request),
            "mode=addurl&name=http%3A%2F%2Fidx.example%2Fget%3Fid%3D1%26x%3D2&nzbname=My+Show"
        );
    }

    #[test]
    fn test_api_url_adds_slash() {
        assert_eq!(
            api_url("http://localhost:8080").unwrap().as_str(),
            "http://localhost:8080/api"
        );
        assert_eq!(
            api_url("https://host/sabnzbd/").unwrap().as_str(),
            "https://host/sabnzbd/api"
        );
    }

    #[test]
    fn test_api_url_rejects_garbage() {
        assert!(matches!(api_url(""), Err(SabError::InvalidUrl { .. })));
        assert!(matches!(api_url("not a url"), Err(SabError::InvalidUrl { .. })));
        assert!(matches!(api_url("ftp://host/"), Err(SabError::InvalidUrl { .. })));
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = Credentials {
            api_key: "topsecret".into(),
            username: "me".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("topsecret"));
        assert!(!rendered.contains("hunter2"));
    }
}
