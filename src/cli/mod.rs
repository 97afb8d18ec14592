use clap::{Args, Parser, Subcommand};

pub mod daemon;
pub mod error;
pub mod handler;
pub mod output;

/// sabremote - remote control for a SABnzbd download queue
#[derive(Parser, Debug)]
#[command(name = "sabremote")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Override config directory path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<std::path::PathBuf>,

    /// Run the coordinator and its polling timer without the popup
    #[arg(long, global = true)]
    pub headless: bool,

    /// Enable verbose logging (TRACE level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute; the popup opens when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and show the queue
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch the queue and publish it to the store
    Refresh,

    /// Pause one queue item
    Pause {
        /// Item id (nzo_id)
        id: String,
    },

    /// Resume one queue item
    Resume {
        /// Item id (nzo_id)
        id: String,
    },

    /// Delete one queue item
    Delete {
        /// Item id (nzo_id)
        id: String,
    },

    /// Move a queue item to a new position
    Move {
        /// Item id (nzo_id)
        id: String,

        /// Zero-based target position
        position: usize,
    },

    /// Set the speed limit (empty string clears it)
    Speed {
        /// Limit as understood by the service (e.g. 50, 2M, 400K)
        limit: String,
    },

    /// Pause the whole queue
    PauseQueue {
        /// Minutes to pause; omitted or 0 pauses indefinitely
        minutes: Option<String>,
    },

    /// Resume the whole queue
    ResumeQueue,

    /// Add a URL to the queue
    AddUrl {
        /// URL of the NZB
        url: String,

        /// Job name
        #[arg(long)]
        name: Option<String>,

        /// Category; falls back to the configured category rules
        #[arg(long)]
        category: Option<String>,
    },

    /// Test connection settings
    Test {
        /// Profile to test (default: active profile)
        #[arg(long)]
        profile: Option<String>,
    },

    /// List the categories offered for added URLs
    Categories,

    /// Manage connection profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Classify a page URL for newznab detection
    CheckPage {
        url: String,
    },

    /// Stop automatic detection on a host
    IgnoreHost {
        host: String,

        /// Re-enable detection instead
        #[arg(long)]
        undo: bool,
    },

    /// Send a raw JSON command to the coordinator
    Send {
        /// Command object, e.g. '{"action":"get_profiles"}'
        json: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Connection values given on the command line
#[derive(Args, Debug, Default, Clone)]
pub struct ProfileFields {
    /// Base URL of the service (e.g. http://localhost:8080/sabnzbd/)
    #[arg(long)]
    pub url: Option<String>,

    /// API key
    #[arg(long)]
    pub api_key: Option<String>,

    /// Username for HTTP form login
    #[arg(long)]
    pub username: Option<String>,

    /// Password for HTTP form login
    #[arg(long)]
    pub password: Option<String>,
}

/// Profile actions
#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    /// List profiles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a profile
    Add {
        name: String,

        #[command(flatten)]
        fields: ProfileFields,
    },

    /// Change a profile; unspecified fields keep their values
    Edit {
        name: String,

        /// New name for the profile
        #[arg(long)]
        rename: Option<String>,

        #[command(flatten)]
        fields: ProfileFields,
    },

    /// Remove a profile
    Remove {
        name: String,
    },

    /// Make a profile active
    Use {
        name: String,
    },

    /// Show a profile (secrets masked)
    Show {
        /// Profile name (default: active profile)
        name: Option<String>,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show all configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the settings and store file locations
    Path,

    /// Reset stored state (profiles, snapshot, flags) to defaults
    Reset {
        /// Also rewrite settings.toml with defaults
        #[arg(long)]
        settings: bool,
    },
}
