//! # Horizon Infra
//!
//! Infrastructure adapters for the Horizon client: the REST transport
//! implementing the `ForecastTransport` port over HTTP/JSON, and
//! environment-based configuration loading.

pub mod config;
pub mod rest;

pub use config::RestConfig;
pub use rest::{RestTransport, RestTransportBuilder};
