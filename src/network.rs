//! Network URL constants for the Pairstream SDK.

/// Default REST API base URL for the scanner.
pub const DEFAULT_API_URL: &str = "https://api.pairstream.xyz";

/// Default WebSocket URL for the scanner stream.
pub const DEFAULT_WS_URL: &str = "wss://ws.pairstream.xyz/ws";
