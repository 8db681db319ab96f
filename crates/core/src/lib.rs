//! # Horizon Core
//!
//! Request-orchestration logic for the Horizon forecasting service.
//!
//! This crate contains:
//! - Client-side validation of the service's structural contract
//! - The batching/slicing engine with adaptive slice tuning
//! - Continuation-token pagination as a lazy stream
//! - The forecast readiness poller
//! - The [`ForecastClient`] facade composing all of the above
//!
//! ## Architecture Principles
//! - Only depends on `horizon-common` and `horizon-domain`
//! - No HTTP or serialization code; all I/O via the [`ForecastTransport`]
//!   port
//! - Pure, testable orchestration logic

pub mod batching;
pub mod client;
pub mod paging;
pub mod poller;
pub mod ports;
pub mod validation;

pub use client::{ClientConfig, ForecastClient, ForecastClientBuilder};
pub use ports::{Ack, Faulted, ForecastTransport, TransportError};
pub use validation::ValidationError;
