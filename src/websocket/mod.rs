//! WebSocket client module for the Pairstream scanner.
//!
//! Multiplexes pair tick/stats streams and table snapshot streams over a single
//! connection, with reference-counted subscriptions, automatic reconnect, and
//! subscription replay.
//!
//! # Example
//!
//! ```rust,ignore
//! use pairstream::websocket::PairstreamWebSocketClient;
//! use pairstream::shared::ScannerFilter;
//!
//! let client = PairstreamWebSocketClient::connect_default().await?;
//! let _sub = client.subscribe_filter(&ScannerFilter::trending_tokens(), |snapshot| {
//!     println!("{} rows", snapshot.pairs.len());
//! });
//! ```

pub mod client;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod state;
pub mod subscriptions;
pub mod types;

pub use client::{
    ConnectionState, FilterSubscription, PairSubscription, PairstreamWebSocketClient,
    WebSocketConfig,
};
pub use error::{WebSocketError, WsResult};
pub use registry::{BroadcastRegistry, Listener, ListenerId};
pub use state::{merge_stats, merge_swaps, TableState};
pub use types::{PairStatsInfo, PairUpdate, TableSnapshot, TokenSwap, WsEvent};
