//! HTTP access to the workshop-operations backend.

pub mod config;
pub mod error;
pub mod remote;
pub mod wsop;

pub use config::{load_settings, ClientSettings};
pub use error::RequestError;
pub use remote::{RemoteClient, RetryPolicy};
pub use wsop::WsopClient;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
