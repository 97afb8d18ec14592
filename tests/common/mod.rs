#![allow(dead_code)]

use sabremote::app::config::Config;
use sabremote::app::state::AppState;
use sabremote::profile::ProfileValues;
use sabremote::store::Store;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-key";

// Initialize logging once for all tests
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// One queue slot as the service reports it
pub fn slot(nzo_id: &str, status: &str, percentage: u8) -> Value {
    json!({
        "nzo_id": nzo_id,
        "filename": format!("{nzo_id}.nzb"),
        "status": status,
        "percentage": percentage.to_string(),
        "mb": "1024.00",
        "mbleft": "512.00",
        "timeleft": "0:10:00",
    })
}

/// A `mode=queue` response body
pub fn queue_body(slots: Vec<Value>, paused: bool, pause_int: &str) -> Value {
    json!({
        "queue": {
            "paused": paused,
            "slots": slots,
            "timeleft": "0:10:00",
            "speed": "1.2 M",
            "mbleft": "512.00",
            "pause_int": pause_int,
            "kbpersec": "1200.50",
            "speedlimit": "",
        }
    })
}

/// Mock that answers queue fetches with `body`
pub fn queue_mock(body: Value) -> Mock {
    Mock::given(method("POST"))
        .and(path("/api"))
        .and(body_string_contains("mode=queue&output=json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
}

/// Mock that answers form commands containing `fragment` with plain text
pub fn command_mock(fragment: &str) -> Mock {
    Mock::given(method("POST"))
        .and(path("/api"))
        .and(body_string_contains(fragment))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok\n"))
}

/// Profile pointing at the mock server
pub fn profile_for(server: &MockServer) -> ProfileValues {
    ProfileValues {
        url: format!("{}/", server.uri()),
        api_key: API_KEY.to_string(),
        ..Default::default()
    }
}

/// In-memory store with one active profile for `server`
pub async fn store_with_profile(server: &MockServer) -> Store {
    let store = Store::in_memory();
    sabremote::profile::ProfileManager::new(store.clone())
        .add("test", profile_for(server))
        .await
        .unwrap();
    store
}

/// App state around a coordinator without a polling timer
pub async fn start_app(store: Store) -> (AppState, JoinHandle<()>) {
    AppState::start(Config::default(), store, false).await.unwrap()
}
