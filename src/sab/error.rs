use super::http_errors::{HttpErrorCategory, HttpErrorInfo};
use thiserror::Error;

/// Errors talking to the remote queue service
#[derive(Error, Debug)]
pub enum SabError {
    /// The profile's server URL cannot be used
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No profile is selected
    #[error("No active profile configured. Please check settings.")]
    NoActiveProfile,

    /// The request never produced a response
    #[error("Connection failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{}", .0.format())]
    Http(HttpErrorInfo),

    /// The service reported an application error
    #[error("{0}")]
    Api(String),

    /// The response body was not what the intent expects
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SabError {
    /// Human-readable diagnostic shown in the error banner
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Transport(e) if e.is_connect() => "Connection failed: Cannot connect to SABnzbd. Please check:\n\
                 1. SABnzbd is running\n\
                 2. URL is correct (default: http://localhost:8080/)\n\
                 3. No firewall blocking connection"
                .to_string(),
            Self::Transport(e) if e.is_timeout() => {
                "Connection failed: the server did not answer in time".to_string()
            }
            Self::Transport(e) => {
                let info = HttpErrorInfo::network_error(&e.to_string());
                format!("Connection failed: {}", info.suggestion)
            }
            Self::Http(info) => match info.category {
                HttpErrorCategory::Auth | HttpErrorCategory::Client => {
                    format!("Connection failed: {}. {}", info.format(), info.suggestion)
                }
                _ => format!("Connection failed: {}", info.format()),
            },
            Self::Api(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type SabResult<T> = Result<T, SabError>;
