//! Background coordinator: the single authority for talking to the queue service.
//!
//! Surfaces send [`Command`]s through a [`CoordinatorHandle`] and receive exactly one
//! [`CommandResponse`] each. The coordinator publishes every fetched queue into the
//! store, owns the polling timer, and re-fetches the queue after every successful
//! mutation. Each command and each timer tick runs in its own task, so one hung
//! request never holds up the others.

pub mod command;

pub use command::{Command, CommandResponse};

use crate::app::config::Config;
use crate::profile::{ProfileManager, ProfileValues};
use crate::queue::QueueSnapshot;
use crate::sab::{SabClient, SabError, build_http_client};
use crate::site;
use crate::store::{Store, defaults, keys};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

/// Message stored under `error` when no profile is selected
pub const NO_ACTIVE_PROFILE: &str = "No active profile configured. Please check settings.";

/// Categories offered when the user has not defined any
pub const DEFAULT_CATEGORIES: &[&str] = &["Default", "Movies", "TV", "Music", "Books", "Software"];

/// Number of speed samples kept for the popup graph
pub const SPEEDLOG_LEN: usize = 10;

const UNAVAILABLE: &str = "coordinator unavailable";

/// A command paired with the channel its response goes back on
#[derive(Debug)]
pub struct Request {
    pub command: Command,
    pub reply: oneshot::Sender<CommandResponse>,
}

/// Cloneable sender side of the coordinator
#[derive(Clone, Debug)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<Request>,
}

impl CoordinatorHandle {
    /// Wrap a request channel. The receiving side must answer every request.
    pub fn new(sender: mpsc::Sender<Request>) -> Self {
        Self { sender }
    }

    /// Send a command and wait for its response. Never fails: a stopped
    /// coordinator yields a failure response.
    pub async fn send(&self, command: Command) -> CommandResponse {
        let (reply, response) = oneshot::channel();
        if self.sender.send(Request { command, reply }).await.is_err() {
            return CommandResponse::failure(UNAVAILABLE);
        }
        response
            .await
            .unwrap_or_else(|_| CommandResponse::failure(UNAVAILABLE))
    }

    /// Parse and send a raw JSON command
    pub async fn send_json(&self, raw: &str) -> CommandResponse {
        match Command::from_json(raw) {
            Ok(command) => self.send(command).await,
            Err(response) => response,
        }
    }
}

/// Shared state behind every command handler
#[derive(Clone)]
pub struct Coordinator {
    store: Store,
    profiles: ProfileManager,
    config: Arc<RwLock<Config>>,
    http: reqwest::Client,
}

impl Coordinator {
    pub fn new(store: Store, config: Arc<RwLock<Config>>, http: reqwest::Client) -> Self {
        Self {
            profiles: ProfileManager::new(store.clone()),
            store,
            config,
            http,
        }
    }

    /// Build with an HTTP client configured from the connection settings
    pub async fn from_config(store: Store, config: Arc<RwLock<Config>>) -> anyhow::Result<Self> {
        let timeouts = config.read().await.connection.timeouts();
        let http = build_http_client(timeouts)?;
        Ok(Self::new(store, config, http))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Start the command loop. With `polling`, the queue is fetched immediately and
    /// then every `general.refresh_rate` seconds.
    pub fn spawn(self, polling: bool) -> (CoordinatorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(64);
        let task = tokio::spawn(self.run(receiver, polling));
        (CoordinatorHandle { sender }, task)
    }

    async fn run(self, mut receiver: mpsc::Receiver<Request>, polling: bool) {
        if let Err(e) = defaults::initialize(&self.store).await {
            tracing::error!("Failed to initialize store defaults: {}", e);
        }

        let mut timer = if polling {
            Some(self.new_timer().await)
        } else {
            None
        };
        tracing::info!("Coordinator started (polling: {})", polling);

        loop {
            tokio::select! {
                request = receiver.recv() => {
                    let Some(Request { command, reply }) = request else {
                        break;
                    };

                    if command == Command::RestartTimer {
                        if timer.is_some() {
                            timer = Some(self.new_timer().await);
                        }
                        let _ = reply.send(CommandResponse::ok());
                        continue;
                    }

                    let coordinator = self.clone();
                    tokio::spawn(async move {
                        let response = coordinator.handle(command).await;
                        // The caller may have gone away; nothing to do then.
                        let _ = reply.send(response);
                    });
                }
                _ = tick(&mut timer) => {
                    let coordinator = self.clone();
                    tokio::spawn(async move {
                        coordinator.fetch_info(false).await;
                    });
                }
            }
        }

        tracing::info!("Coordinator stopped");
    }

    async fn new_timer(&self) -> Interval {
        let period = self.config.read().await.refresh_interval();
        tracing::debug!("Polling every {:?}", period);
        let mut timer = tokio::time::interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    }

    /// Run one command to completion
    pub async fn handle(&self, command: Command) -> CommandResponse {
        tracing::debug!("Handling command: {}", command.action());

        let mutation = command.is_mutation();
        let response = match command {
            Command::RefreshData => self.fetch_info(true).await,
            Command::FetchInfo { quick_update } => self.fetch_info(quick_update).await,
            Command::PauseDownload { nzo_id } => {
                self.with_client(|c| async move { c.pause_item(&nzo_id).await })
                    .await
            }
            Command::ResumeDownload { nzo_id } => {
                self.with_client(|c| async move { c.resume_item(&nzo_id).await })
                    .await
            }
            Command::RemoveDownload { nzo_id } => {
                self.with_client(|c| async move { c.delete_item(&nzo_id).await })
                    .await
            }
            Command::MoveItem { nzo_id, position } => {
                self.with_client(|c| async move { c.move_item(&nzo_id, position).await })
                    .await
            }
            Command::SetSpeedLimit { speed } => {
                self.with_client(|c| async move { c.set_speed_limit(&speed).await })
                    .await
            }
            Command::PauseQueue { duration } => self.set_queue_paused(true, duration).await,
            Command::ResumeQueue => self.set_queue_paused(false, None).await,
            Command::TestConnection { profile } => self.test_connection(&profile).await,
            Command::GetCategories => self.categories().await,
            Command::GetProfiles => {
                let mut names = self.profiles.names().await;
                if names.is_empty() {
                    names.push("Default".to_string());
                }
                CommandResponse::ok().with("profiles", names)
            }
            Command::AddUrl {
                url,
                nzbname,
                category,
            } => self.add_url(&url, nzbname, category).await,
            Command::GetSetting { setting } => CommandResponse::ok().with(
                "value",
                self.store.get_raw(&setting).await.unwrap_or(Value::Null),
            ),
            Command::ResetSettings => match defaults::reset(&self.store).await {
                Ok(()) => CommandResponse::ok(),
                Err(e) => CommandResponse::failure(e.to_string()),
            },
            Command::RestartTimer => CommandResponse::ok(),
            Command::CheckPage { url } => {
                let detection = self.config.read().await.detection.clone();
                let action = site::classify(&url, &detection, &self.store).await;
                CommandResponse::ok()
                    .with("page_action", json!(action))
                    .with("host", site::host_key(&url).map_or(Value::Null, Value::String))
            }
            Command::IgnoreHost { host } => match site::ignore_host(&self.store, &host).await {
                Ok(()) => CommandResponse::ok(),
                Err(e) => CommandResponse::failure(e.to_string()),
            },
        };

        if mutation && response.is_success() {
            self.fetch_info(true).await;
        }
        response
    }

    async fn active_client(&self) -> Result<SabClient, SabError> {
        let profile = self
            .profiles
            .get_active()
            .await
            .ok_or(SabError::NoActiveProfile)?;
        SabClient::new(self.http.clone(), &profile.values)
    }

    async fn with_client<F, Fut>(&self, call: F) -> CommandResponse
    where
        F: FnOnce(SabClient) -> Fut,
        Fut: std::future::Future<Output = Result<(), SabError>>,
    {
        let result = match self.active_client().await {
            Ok(client) => call(client).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => CommandResponse::ok(),
            Err(e) => {
                tracing::warn!("Command failed: {}", e);
                CommandResponse::failure(e.diagnostic())
            }
        }
    }

    /// Fetch the queue and publish it. Failures are recorded under `error`.
    pub async fn fetch_info(&self, quick_update: bool) -> CommandResponse {
        let result = match self.active_client().await {
            Ok(client) => client.fetch_queue().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(data) => {
                let kbpersec = data.kbpersec;
                let snapshot = QueueSnapshot::from_queue(data);
                if let Err(e) = self.store.set_many(snapshot.store_entries()).await {
                    tracing::error!("Failed to publish queue snapshot: {}", e);
                    return CommandResponse::failure(e.to_string());
                }
                if !quick_update {
                    self.record_speed(kbpersec).await;
                }
                tracing::debug!(
                    "Published snapshot: {} items, status {}",
                    snapshot.items.len(),
                    snapshot.status
                );
                CommandResponse::ok()
            }
            Err(e) => {
                let message = e.diagnostic();
                tracing::warn!("Queue fetch failed: {}", e);
                if let Err(store_err) = self.store.set(keys::ERROR, &message).await {
                    tracing::error!("Failed to record fetch error: {}", store_err);
                }
                CommandResponse::failure(message)
            }
        }
    }

    async fn record_speed(&self, kbpersec: f64) {
        let mut log: Vec<f64> = self.store.get(keys::SPEEDLOG).await.unwrap_or_default();
        log.push(kbpersec);
        if log.len() > SPEEDLOG_LEN {
            log.drain(..log.len() - SPEEDLOG_LEN);
        }
        if let Err(e) = self.store.set(keys::SPEEDLOG, log).await {
            tracing::warn!("Failed to update speed log: {}", e);
        }
    }

    async fn set_queue_paused(&self, paused: bool, duration: Option<u32>) -> CommandResponse {
        let response = self
            .with_client(|c| async move {
                if paused {
                    c.pause_queue(duration).await
                } else {
                    c.resume_queue().await
                }
            })
            .await;

        if response.is_success()
            && let Err(e) = self.store.set(keys::PAUSED, paused).await
        {
            tracing::error!("Failed to record paused state: {}", e);
        }
        response
    }

    async fn test_connection(&self, profile: &ProfileValues) -> CommandResponse {
        let result = match SabClient::new(self.http.clone(), profile) {
            Ok(client) => client.version().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(version) => {
                tracing::info!("Connection test succeeded (version {})", version);
                CommandResponse::ok().with("version", version)
            }
            Err(e) => {
                tracing::info!("Connection test failed: {}", e);
                CommandResponse::failure(e.diagnostic())
            }
        }
    }

    async fn categories(&self) -> CommandResponse {
        let categories = match self.store.get::<Vec<String>>(keys::USER_CATEGORIES).await {
            Some(list) => list,
            None => DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        };
        CommandResponse::ok().with("categories", categories)
    }

    /// Pick the category sent with an added URL
    async fn resolve_category(&self, explicit: Option<String>) -> Option<String> {
        let categories = self.config.read().await.categories.clone();
        if categories.ignore_categories {
            return None;
        }

        let non_empty = |s: String| (!s.trim().is_empty()).then_some(s);
        if let Some(category) = explicit.and_then(non_empty) {
            return Some(category);
        }
        if let Some(category) = non_empty(categories.hard_coded_category) {
            return Some(category);
        }
        if categories.use_user_categories
            && let Some(active) = self.store.get_string(keys::ACTIVE_CATEGORY).await
            && active != "*"
            && !active.is_empty()
        {
            return Some(active);
        }
        non_empty(categories.default_category)
    }

    async fn add_url(
        &self,
        url: &str,
        nzbname: Option<String>,
        category: Option<String>,
    ) -> CommandResponse {
        let category = self.resolve_category(category).await;
        let client = match self.active_client().await {
            Ok(client) => client,
            Err(e) => return CommandResponse::failure(e.diagnostic()),
        };

        match client.add_url(url, nzbname, category).await {
            Ok(result) => {
                tracing::info!("Added URL {}", url);
                CommandResponse::ok().with("result", result)
            }
            Err(e) => {
                tracing::warn!("Adding URL failed: {}", e);
                CommandResponse::failure(e.diagnostic())
            }
        }
    }
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Convenience for surfaces that only need a one-shot coordinator
pub async fn spawn_from_config(
    store: Store,
    config: Arc<RwLock<Config>>,
    polling: bool,
) -> anyhow::Result<(CoordinatorHandle, JoinHandle<()>)> {
    Ok(Coordinator::from_config(store, config).await?.spawn(polling))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn coordinator(store: Store) -> Coordinator {
        Coordinator::new(
            store,
            Arc::new(RwLock::new(Config::default())),
            reqwest::Client::new(),
        )
    }

    #[tokio::test]
    async fn test_fetch_without_profile_records_error() {
        let store = Store::in_memory();
        let response = coordinator(store.clone()).fetch_info(true).await;

        assert_eq!(response.success, Some(false));
        assert_eq!(response.error_message(), NO_ACTIVE_PROFILE);
        assert_eq!(store.get::<String>(keys::ERROR).await, Some(NO_ACTIVE_PROFILE.to_string()));
    }

    #[tokio::test]
    async fn test_get_profiles_defaults() {
        let response = coordinator(Store::in_memory()).handle(Command::GetProfiles).await;
        assert_eq!(response.get("profiles"), Some(&json!(["Default"])));
    }

    #[tokio::test]
    async fn test_get_categories_prefers_user_list() {
        let store = Store::in_memory();
        let c = coordinator(store.clone());

        let defaults = c.handle(Command::GetCategories).await;
        assert_eq!(
            defaults.get("categories"),
            Some(&json!(["Default", "Movies", "TV", "Music", "Books", "Software"]))
        );

        store.set(keys::USER_CATEGORIES, json!(["anime"])).await.unwrap();
        let user = c.handle(Command::GetCategories).await;
        assert_eq!(user.get("categories"), Some(&json!(["anime"])));
    }

    #[tokio::test]
    async fn test_speed_log_keeps_last_samples() {
        let store = Store::in_memory();
        let c = coordinator(store.clone());
        for i in 0..15 {
            c.record_speed(i as f64).await;
        }
        let log: Vec<f64> = store.get(keys::SPEEDLOG).await.unwrap();
        assert_eq!(log, (5..15).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_category_precedence() {
        let store = Store::in_memory();
        let config = Arc::new(RwLock::new(Config::default()));
        let c = Coordinator::new(store.clone(), config.clone(), reqwest::Client::new());

        assert_eq!(c.resolve_category(None).await, None);

        config.write().await.categories.default_category = "misc".into();
        assert_eq!(c.resolve_category(None).await, Some("misc".into()));

        config.write().await.categories.use_user_categories = true;
        store.set(keys::ACTIVE_CATEGORY, "tv").await.unwrap();
        assert_eq!(c.resolve_category(None).await, Some("tv".into()));

        config.write().await.categories.hard_coded_category = "movies".into();
        assert_eq!(c.resolve_category(None).await, Some("movies".into()));
        assert_eq!(c.resolve_category(Some("books".into())).await, Some("books".into()));

        config.write().await.categories.ignore_categories = true;
        assert_eq!(c.resolve_category(Some("books".into())).await, None);
    }

    #[tokio::test]
    async fn test_handle_ignore_host_and_check_page() {
        let store = Store::in_memory();
        let c = coordinator(store.clone());

        let before = c
            .handle(Command::CheckPage { url: "https://www.indexer.com/".into() })
            .await;
        assert_eq!(before.get("page_action"), Some(&json!("auto_detect")));
        assert_eq!(before.get("host"), Some(&json!("indexer.com")));

        assert!(c.handle(Command::IgnoreHost { host: "indexer.com".into() }).await.is_success());
        let after = c
            .handle(Command::CheckPage { url: "https://www.indexer.com/".into() })
            .await;
        assert_eq!(after.get("page_action"), Some(&json!("ignore")));
    }

    #[tokio::test]
    async fn test_handle_reports_dropped_coordinator() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let handle = CoordinatorHandle { sender };

        let response = handle.send(Command::GetProfiles).await;
        assert_eq!(response.error_message(), UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_send_json_unknown_action() {
        let (handle, _task) = coordinator(Store::in_memory()).spawn(false);
        let response = handle.send_json(r#"{"action":"nope"}"#).await;
        assert_eq!(response.error.as_deref(), Some("Unknown action"));
        assert_eq!(response.success, None);
    }
}
