//! # Horizon Common
//!
//! Shared resilience utilities for the Horizon client, independent of any
//! particular transport or domain type.

pub mod resilience;
pub mod telemetry;

pub use resilience::{
    BackoffStrategy, RetryConfig, RetryConfigBuilder, RetryDecision, RetryError, RetryExecutor,
    RetryPolicy, RetryResult,
};
