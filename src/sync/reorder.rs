//! The suppress-redraw flag held while a move gesture is in progress.
//!
//! `skip_redraw` is always written together with `skip_redraw_until` (epoch
//! milliseconds). A leftover flag whose deadline has passed no longer suppresses
//! anything, so a surface that dies mid-gesture cannot freeze refreshes for good.

use crate::store::{Store, StoreResult, keys};
use serde_json::{Value, json};
use std::time::Duration;

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Raise the flag for at most `bound`
pub async fn suppress(store: &Store, bound: Duration) -> StoreResult<()> {
    let until = now_millis().saturating_add(i64::try_from(bound.as_millis()).unwrap_or(i64::MAX));
    store
        .set_many([
            (keys::SKIP_REDRAW, json!(true)),
            (keys::SKIP_REDRAW_UNTIL, json!(until)),
        ])
        .await
}

/// Lower the flag
pub async fn release(store: &Store) -> StoreResult<()> {
    store
        .set_many([
            (keys::SKIP_REDRAW, json!(false)),
            (keys::SKIP_REDRAW_UNTIL, Value::Null),
        ])
        .await
}

/// Whether refreshes are suppressed right now
pub async fn is_suppressed(store: &Store) -> bool {
    is_suppressed_at(store, now_millis()).await
}

/// Whether refreshes are suppressed at `now` (epoch milliseconds).
///
/// A flag written without a deadline (by an older client) counts as expired.
pub async fn is_suppressed_at(store: &Store, now: i64) -> bool {
    if !store.get_flag(keys::SKIP_REDRAW).await {
        return false;
    }
    match store
        .get_raw(keys::SKIP_REDRAW_UNTIL)
        .await
        .as_ref()
        .and_then(Value::as_i64)
    {
        Some(until) if now < until => true,
        _ => {
            tracing::debug!("Ignoring expired skip_redraw flag");
            false
        }
    }
}
