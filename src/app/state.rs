use super::config::Config;
use crate::coordinator::{self, Command, CoordinatorHandle};
use crate::profile::ProfileManager;
use crate::store::{Store, defaults};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tokio::task::JoinHandle;

/// Shared handles for one surface (popup, CLI command, headless daemon)
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub store: Store,
    pub profiles: ProfileManager,
    pub coordinator: CoordinatorHandle,
    /// Completed once per session; concurrent callers of
    /// [`AppState::ensure_ready`] wait on the same initialization
    ready: Arc<OnceCell<()>>,
}

impl AppState {
    /// Wire up state around an existing coordinator
    pub fn new(config: Arc<RwLock<Config>>, store: Store, coordinator: CoordinatorHandle) -> Self {
        Self {
            config,
            profiles: ProfileManager::new(store.clone()),
            store,
            coordinator,
            ready: Arc::new(OnceCell::new()),
        }
    }

    /// Open the store, spawn a coordinator and wire up state
    pub async fn start(config: Config, store: Store, polling: bool) -> Result<(Self, JoinHandle<()>)> {
        let config = Arc::new(RwLock::new(config));
        let (handle, task) =
            coordinator::spawn_from_config(store.clone(), config.clone(), polling).await?;
        Ok((Self::new(config, store, handle), task))
    }

    /// Run session initialization exactly once: store defaults, then a first fetch.
    /// A failed fetch does not fail initialization; it shows up on the error banner.
    pub async fn ensure_ready(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                let written = defaults::initialize(&self.store).await?;
                tracing::debug!("Session init: {} defaults written", written);

                let response = self.coordinator.send(Command::RefreshData).await;
                if !response.is_success() {
                    tracing::warn!("Initial refresh failed: {}", response.error_message());
                }
                Ok::<(), anyhow::Error>(())
            })
            .await?;
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{CommandResponse, Request};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_concurrent_init_runs_once() {
        let (sender, mut receiver) = mpsc::channel::<Request>(8);
        let refreshes = Arc::new(AtomicUsize::new(0));
        let counter = refreshes.clone();
        tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                if request.command == Command::RefreshData {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                let _ = request.reply.send(CommandResponse::ok());
            }
        });

        let state = AppState::new(
            Arc::new(RwLock::new(Config::default())),
            Store::in_memory(),
            CoordinatorHandle::new(sender),
        );

        let (a, b) = tokio::join!(state.ensure_ready(), state.ensure_ready());
        a.unwrap();
        b.unwrap();
        state.ensure_ready().await.unwrap();

        assert!(state.is_ready());
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert!(state.store.contains(crate::store::keys::PROFILES).await);
    }
}
