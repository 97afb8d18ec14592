pub mod app;
pub mod cli;
pub mod coordinator;
pub mod popup;
pub mod profile;
pub mod queue;
pub mod sab;
pub mod site;
pub mod store;
pub mod sync;
pub mod util;

pub use app::{config::Config, state::AppState};
