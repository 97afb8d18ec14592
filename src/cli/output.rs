use crate::coordinator::CommandResponse;
use crate::profile::Profile;
use crate::queue::QueueSnapshot;
use crate::sync::{QueueView, RenderedRow, RowToggle};

/// Format one queue row for display
pub fn format_row(index: usize, row: &RenderedRow) -> String {
    let icon = match row.toggle {
        RowToggle::Resume => "||",
        RowToggle::Pause => ">>",
    };
    let progress = if row.show_progress {
        format!("{:>3}%", row.percentage)
    } else {
        "   -".to_string()
    };
    let mut line = format!(
        "{:>3}. {} [{}] {}  {}  ({})",
        index + 1,
        icon,
        progress,
        row.id,
        row.filename,
        row.status
    );
    if !row.timeleft.is_empty() && row.toggle == RowToggle::Pause {
        line.push_str(&format!("  ETA {}", row.timeleft));
    }
    line
}

/// Format the queue view for display
pub fn format_view(view: &QueueView) -> String {
    let mut output = String::new();

    if let Some(error) = &view.error {
        output.push_str(&format!("Error: {}\n", error));
    }

    output.push_str(&format!("Status: {}  Speed: {}", view.status, view.speed));
    if !view.sizeleft.is_empty() {
        output.push_str(&format!("  Left: {}", view.sizeleft));
    }
    output.push_str(&format!("  ETA: {}", view.timeleft));
    if !view.speedlimit.is_empty() {
        output.push_str(&format!("  Limit: {}", view.speedlimit));
    }
    output.push('\n');

    if view.paused_jobs > 0 {
        output.push_str(&format!("Paused jobs: {}\n", view.paused_jobs));
    }

    if view.rows.is_empty() {
        output.push_str("Queue is empty.");
        return output;
    }

    let rows = view
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| format_row(i, row))
        .collect::<Vec<_>>()
        .join("\n");
    output.push_str(&rows);
    output
}

/// Snapshot as pretty JSON
pub fn format_snapshot_json(snapshot: &QueueSnapshot) -> String {
    serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_string())
}

/// Raw coordinator response as pretty JSON
pub fn format_response(response: &CommandResponse) -> String {
    serde_json::to_string_pretty(response).unwrap_or_else(|_| "{}".to_string())
}

/// Profile details with secrets masked
pub fn format_profile(profile: &Profile, active: bool) -> String {
    let mask = |s: &str| if s.is_empty() { "(none)" } else { "********" };
    let mut output = String::new();
    output.push_str(&format!(
        "Name: {}{}\n",
        profile.name,
        if active { " (active)" } else { "" }
    ));
    output.push_str(&format!("URL: {}\n", profile.values.url));
    output.push_str(&format!("API key: {}\n", mask(&profile.values.api_key)));
    if !profile.values.username.is_empty() {
        output.push_str(&format!("Username: {}\n", profile.values.username));
    }
    output.push_str(&format!("Password: {}", mask(&profile.values.password)));
    output
}
