//! # Pairstream Rust SDK
//!
//! A Rust SDK for the Pairstream token scanner: REST snapshots of scanner tables
//! plus a multiplexing WebSocket client that keeps them live.
//!
//! ## Modules
//!
//! This SDK provides two main modules:
//! - [`api`]: REST API client for scanner table snapshots
//! - [`websocket`]: Real-time pair and table streaming via WebSocket
//!
//! Plus a shared module:
//! - [`shared`]: Scanner domain types, canonical keys, and numeric helpers
//!
//! ## Quick Start - REST API
//!
//! ```rust,ignore
//! use pairstream::api::PairstreamApiClient;
//! use pairstream::shared::ScannerFilter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = PairstreamApiClient::new("https://api.pairstream.xyz")?;
//!
//!     let page = api.get_scanner(&ScannerFilter::trending_tokens()).await?;
//!     println!("Found {} pairs", page.total_rows);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Quick Start - WebSocket
//!
//! ```rust,ignore
//! use pairstream::websocket::PairstreamWebSocketClient;
//! use pairstream::shared::ScannerFilter;
//! use futures_util::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = PairstreamWebSocketClient::connect_default().await?;
//!
//!     let _table = client.subscribe_filter(&ScannerFilter::new_tokens(), |snapshot| {
//!         println!("{} rows", snapshot.pairs.len());
//!     });
//!
//!     while let Some(event) = client.next().await {
//!         println!("{:?}", event);
//!     }
//!     Ok(())
//! }
//! ```

// ============================================================================
// MODULES
// ============================================================================

/// Scanner domain types, canonical subscription keys, and numeric helpers.
/// Used across all SDK modules.
pub mod shared;

/// Network URL constants (API and WebSocket endpoints).
pub mod network;

/// REST API client module for scanner table snapshots.
#[cfg(feature = "http")]
pub mod api;

/// WebSocket client module for real-time pair and table streaming.
#[cfg(feature = "ws-native")]
pub mod websocket;

// ============================================================================
// PRELUDE
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use pairstream::prelude::*;
/// ```
pub mod prelude {
    // API module exports
    #[cfg(feature = "http")]
    pub use crate::api::{
        ApiError, ApiResult, PairstreamApiClient, PairstreamApiClientBuilder, RetryConfig,
        ScannerApiResponse,
    };

    // Network constants
    pub use crate::network::{DEFAULT_API_URL, DEFAULT_WS_URL};

    // Shared types (used by both API and WebSocket)
    pub use crate::shared::{
        canonical_key, canonical_key_of, string_map, Chain, OrderBy, PairIdentity, PairRow,
        RankBy, ScannerFilter, TimeFrame,
    };

    // WebSocket module exports
    #[cfg(feature = "ws-native")]
    pub use crate::websocket::{
        merge_stats, merge_swaps, ConnectionState, FilterSubscription, PairStatsInfo,
        PairSubscription, PairUpdate, PairstreamWebSocketClient, TableSnapshot, TableState,
        TokenSwap, WebSocketConfig, WebSocketError, WsEvent, WsResult,
    };
}
