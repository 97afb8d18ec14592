//! Interactive queue popup: a terminal view of the queue that reflects the store
//! and forwards user actions through the coordinator.

pub mod app;
pub mod events;
pub mod state;
pub mod ui;

pub use app::{PopupApp, run_popup};
