//! HTTP clients for the four external analytics providers.
//!
//! Each client wraps `reqwest` with provider-specific error handling, API
//! key management, and typed response deserialization, behind the shared
//! [`ProviderClient`] trait. Transient failures are retried with
//! exponential back-off; the engine treats anything that escapes here as
//! a per-platform failure, never a run-level one.

mod client;
mod error;
mod ga;
mod gsc;
mod http;
mod li;
mod retry;
mod yt;

pub use client::{FetchedMetrics, ProviderClient, ProviderRegistry};
pub use error::ProviderError;
pub use ga::GaClient;
pub use gsc::GscClient;
pub use http::ProviderSettings;
pub use li::LiClient;
pub use yt::YtClient;
