//! HTTP client for the Kuteera Kitchen backend
//!
//! Wraps `reqwest` with bearer-token attachment, a cookie jar and a single
//! silent refresh on `401 Unauthorized`.

pub mod client;
pub mod types;

pub use client::{KuteeraClient, KuteeraClientBuilder, error::ClientError};
