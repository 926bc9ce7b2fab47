//! gradebook-api — REST client for the school persistence API.
//!
//! Implements [`gradebook_core::traits::GradebookApi`] over HTTP/JSON, loads
//! client configuration, and ships an in-memory [`mock::MockApi`] for tests.

pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod wire;

pub use config::{load_config, load_config_from, ApiConfig, GradebookConfig};
pub use error::ApiError;
pub use http::RestApi;
