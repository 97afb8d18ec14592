/// HTTP error category for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorCategory {
    Network,   // Connection errors (no status code)
    Client,    // 4xx errors
    Server,    // 5xx errors
    Auth,      // 401, 403
    RateLimit, // 429
}

/// Enriched HTTP error information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpErrorInfo {
    pub status_code: Option<u16>,
    pub category: HttpErrorCategory,
    pub description: String,
    pub suggestion: String,
}

impl HttpErrorInfo {
    /// Create from HTTP status code
    pub fn from_status(status: u16) -> Self {
        let (category, description, suggestion) = match status {
            400 => (
                HttpErrorCategory::Client,
                "Bad Request".to_string(),
                "The server rejected the request. Check the server URL.",
            ),
            401 => (
                HttpErrorCategory::Auth,
                "Unauthorized".to_string(),
                "Check the username and password of the active profile.",
            ),
            403 => (
                HttpErrorCategory::Auth,
                "Forbidden".to_string(),
                "Access denied. Check the API key and the server's access settings.",
            ),
            404 => (
                HttpErrorCategory::Client,
                "Not Found".to_string(),
                "No API endpoint at this address. Check the server URL.",
            ),
            429 => (
                HttpErrorCategory::RateLimit,
                "Too Many Requests".to_string(),
                "Rate limited. Consider a longer refresh rate.",
            ),
            500 => (
                HttpErrorCategory::Server,
                "Internal Server Error".to_string(),
                "Server-side issue. The next refresh may succeed.",
            ),
            502 => (
                HttpErrorCategory::Server,
                "Bad Gateway".to_string(),
                "A proxy in front of the server failed. The next refresh may succeed.",
            ),
            503 => (
                HttpErrorCategory::Server,
                "Service Unavailable".to_string(),
                "Server temporarily unavailable.",
            ),
            504 => (
                HttpErrorCategory::Server,
                "Gateway Timeout".to_string(),
                "Server response timeout. The next refresh may succeed.",
            ),
            // Generic fallbacks
            _ if (400..500).contains(&status) => (
                HttpErrorCategory::Client,
                format!("Client Error ({})", status),
                "Check the profile settings.",
            ),
            _ if status >= 500 => (
                HttpErrorCategory::Server,
                format!("Server Error ({})", status),
                "Server-side issue. The next refresh may succeed.",
            ),
            _ => (
                HttpErrorCategory::Client,
                format!("HTTP Error ({})", status),
                "Unknown error. Check logs for details.",
            ),
        };

        Self {
            status_code: Some(status),
            category,
            description,
            suggestion: suggestion.to_string(),
        }
    }

    /// Create for network errors (no status code)
    pub fn network_error(message: &str) -> Self {
        Self {
            status_code: None,
            category: HttpErrorCategory::Network,
            description: "Network Error".to_string(),
            suggestion: format!("Connection failed: {}. Check network connectivity.", message),
        }
    }

    /// Format for display
    pub fn format(&self) -> String {
        if let Some(code) = self.status_code {
            format!("HTTP {} - {}", code, self.description)
        } else {
            self.description.clone()
        }
    }
}
