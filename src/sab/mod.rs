//! HTTP client for the remote queue service (`<base>/api`, form-encoded POST).

pub mod api;
pub mod client;
pub mod error;
pub mod http_errors;
pub mod response;

pub use api::{ApiRequest, Credentials};
pub use client::{SabClient, Timeouts, build_http_client};
pub use error::{SabError, SabResult};
pub use http_errors::{HttpErrorCategory, HttpErrorInfo};
pub use response::{QueueData, Slot};
