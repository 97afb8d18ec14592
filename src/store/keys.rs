//! Names of every persisted key.

pub const PROFILES: &str = "profiles";
pub const ACTIVE_PROFILE: &str = "active_profile";

/// Serialized slot list (one JSON string, replaced as a whole)
pub const QUEUE: &str = "queue";
pub const PAUSED: &str = "paused";
pub const STATUS: &str = "status";
pub const TIMELEFT: &str = "timeleft";
pub const SPEED: &str = "speed";
pub const SIZELEFT: &str = "sizeleft";
pub const PAUSED_JOBS: &str = "paused_jobs";
pub const PAUSE_INT: &str = "pause_int";
pub const SPEEDLIMIT: &str = "speedlimit";
pub const SPEEDLOG: &str = "speedlog";
pub const ERROR: &str = "error";

pub const SKIP_REDRAW: &str = "skip_redraw";
/// Epoch milliseconds after which a leftover `skip_redraw` is ignored
pub const SKIP_REDRAW_UNTIL: &str = "skip_redraw_until";

pub const USER_CATEGORIES: &str = "user_categories";
pub const ACTIVE_CATEGORY: &str = "active_category";

const PROFILE_PASSWORD_PREFIX: &str = "profile_pass";
const NAB_IGNORE_PREFIX: &str = "nabignore.";

/// Key holding the password of one profile
pub fn profile_password(profile_name: &str) -> String {
    format!("{PROFILE_PASSWORD_PREFIX}{profile_name}")
}

/// Key holding the "never auto-detect on this host" flag
pub fn nab_ignore(host: &str) -> String {
    format!("{NAB_IGNORE_PREFIX}{host}")
}

/// Keys making up a published queue snapshot
pub const SNAPSHOT_FIELDS: &[&str] = &[
    STATUS,
    PAUSED,
    TIMELEFT,
    SPEED,
    SIZELEFT,
    PAUSED_JOBS,
    PAUSE_INT,
    SPEEDLIMIT,
    QUEUE,
];
