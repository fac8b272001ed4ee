// Library interface for rust_manga_tracker
// The binary and the integration tests build on these components

pub mod adapter;
pub mod app_state;
pub mod config;
pub mod db;
pub mod detector;
pub mod error;
pub mod http_client;
pub mod metrics;
pub mod models;
pub mod pager;
pub mod registry;
pub mod scheduler;
pub mod source_utils;
pub mod sources;

pub use adapter::Adapter;
pub use error::{Result, TrackerError};
pub use registry::AdapterRegistry;
