//! Shared library for cross-cutting concerns in identity-platform Rust services.
//!
//! This crate provides centralized implementations for:
//! - Error types with retryability classification
//! - Tracing subscriber initialization
//! - A bounded background worker for fire-and-forget side effects

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod tracing_config;
pub mod worker;

pub use error::PlatformError;
pub use tracing_config::{TracingConfig, init_tracing};
pub use worker::{BackgroundWorker, BackgroundWorkerConfig};
