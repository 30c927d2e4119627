//! HTTP client for the REST collaborator, with retry policies.

mod client;
pub mod retry;

pub use client::{AlphaHttp, ApiResponse};
pub use retry::{RetryConfig, RetryPolicy};
