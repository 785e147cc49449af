//! REST API client module for Pairstream.
//!
//! This module provides a type-safe HTTP client for fetching scanner table
//! snapshots. The WebSocket module keeps a fetched table live afterwards.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use pairstream::api::PairstreamApiClient;
//! use pairstream::shared::ScannerFilter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PairstreamApiClient::new("https://api.pairstream.xyz")?;
//!
//!     let page = client.get_scanner(&ScannerFilter::trending_tokens()).await?;
//!     println!("Found {} pairs ({} total)", page.pairs.len(), page.total_rows);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Client Configuration
//!
//! Use the builder pattern for custom configuration:
//!
//! ```rust,ignore
//! use pairstream::api::{PairstreamApiClient, RetryConfig};
//! use std::time::Duration;
//!
//! let client = PairstreamApiClient::builder("https://api.pairstream.xyz")
//!     .timeout(Duration::from_secs(60))
//!     .with_retry(RetryConfig::new(3))
//!     .build()?;
//! ```
//!
//! # Error Handling
//!
//! All methods return `ApiResult<T>` which is an alias for `Result<T, ApiError>`.

pub mod client;
pub mod error;
pub mod types;

// Re-export main types for convenience
pub use client::{PairstreamApiClient, PairstreamApiClientBuilder, RetryConfig};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use types::ScannerApiResponse;
