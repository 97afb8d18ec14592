use super::{Store, StoreResult, keys};
use serde_json::{Value, json};

/// Values written for keys that are missing when the coordinator starts
pub fn default_entries() -> Vec<(&'static str, Value)> {
    vec![
        (keys::PROFILES, json!({})),
        (keys::ACTIVE_CATEGORY, json!("*")),
        (keys::PAUSED, json!(false)),
        (keys::ERROR, json!("")),
        (keys::SKIP_REDRAW, json!(false)),
    ]
}

/// Fill in defaults for missing keys, leaving existing values alone
pub async fn initialize(store: &Store) -> StoreResult<usize> {
    let mut missing = Vec::new();
    for (key, value) in default_entries() {
        if !store.contains(key).await {
            missing.push((key, value));
        }
    }

    let count = missing.len();
    if count > 0 {
        store.set_many(missing).await?;
        tracing::info!("Initialized {} default store entries", count);
    }
    Ok(count)
}

/// Wipe the store and write defaults again
pub async fn reset(store: &Store) -> StoreResult<()> {
    store.clear().await?;
    initialize(store).await?;
    tracing::info!("Store reset to defaults");
    Ok(())
}
