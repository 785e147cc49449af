//! Message types for the scanner WebSocket protocol.
//!
//! Both directions share one envelope: `{ "event": <tag>, "data": <payload> }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shared::key::string_map;
use crate::shared::types::{PairIdentity, PairRow, ScannerFilter};
use crate::websocket::error::WebSocketError;

// ============================================================================
// REQUEST TYPES (Client → Server)
// ============================================================================

/// Outbound control frame.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub event: &'static str,
    pub data: Value,
}

impl OutboundMessage {
    /// Subscribe to a table view's live snapshots.
    pub fn scanner_filter(filter: &ScannerFilter) -> Self {
        Self {
            event: "scanner-filter",
            data: stringified_filter(filter),
        }
    }

    /// Unsubscribe from a table view; same payload shape as the subscribe.
    pub fn unsubscribe_scanner_filter(filter: &ScannerFilter) -> Self {
        Self {
            event: "unsubscribe-scanner-filter",
            data: stringified_filter(filter),
        }
    }

    /// Subscribe to one pair's tick and stats stream.
    pub fn subscribe_pair(identity: &PairIdentity) -> Self {
        Self {
            event: "subscribe-pair",
            data: serde_json::to_value(identity).unwrap_or(Value::Null),
        }
    }

    /// Unsubscribe from one pair's stream.
    pub fn unsubscribe_pair(identity: &PairIdentity) -> Self {
        Self {
            event: "unsubscribe-pair",
            data: serde_json::to_value(identity).unwrap_or(Value::Null),
        }
    }

    /// Encode as envelope JSON.
    pub fn encode(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

/// The server expects every filter value stringified on the wire.
fn stringified_filter(filter: &ScannerFilter) -> Value {
    Value::Object(
        string_map(filter)
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    )
}

// ============================================================================
// RESPONSE TYPES (Server → Client)
// ============================================================================

/// Raw envelope wrapper for initial parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWsMessage {
    pub event: String,
    pub data: Value,
}

/// Enum for all inbound event tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Tick,
    PairStats,
    ScannerPairs,
    Unknown,
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s {
            "tick" => Self::Tick,
            "pair-stats" => Self::PairStats,
            "scanner-pairs" => Self::ScannerPairs,
            _ => Self::Unknown,
        }
    }
}

// ============================================================================
// TICK TYPES
// ============================================================================

/// One trade event inside a tick batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSwap {
    /// Address of the token that was bought; tells buy from sell.
    pub token_in_address: String,
    /// Amount of token0 as a decimal string.
    #[serde(default)]
    pub amount_token0: Option<String>,
    /// Amount of token1 as a decimal string.
    #[serde(default)]
    pub amount_token1: Option<String>,
    /// USD price of token0 as a decimal string.
    #[serde(default)]
    pub price_token0_usd: Option<String>,
    /// USD price of token1 as a decimal string.
    #[serde(default)]
    pub price_token1_usd: Option<String>,
    /// Swaps flagged as outliers carry no price signal. Absent means not an outlier.
    #[serde(default)]
    pub is_outlier: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload of a `tick` event: a batch of trades for one pair.
#[derive(Debug, Clone, Deserialize)]
pub struct TickEventPayload {
    pub pair: PairIdentity,
    pub swaps: Vec<TokenSwap>,
}

// ============================================================================
// PAIR-STATS TYPES
// ============================================================================

/// Detail record embedded in a `pair-stats` event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PairDetails {
    pub pair_address: String,
    pub token1_address: String,
    pub chain: String,
    pub token1_symbol: String,
    pub token1_name: String,
    pub token1_is_honeypot: Option<bool>,
    pub dex_paid: bool,
    pub is_verified: bool,
    pub mint_authority_renounced: bool,
    pub freeze_authority_renounced: bool,
    pub link_discord: Option<String>,
    pub link_telegram: Option<String>,
    pub link_twitter: Option<String>,
    pub link_website: Option<String>,
    pub is_migrating: Option<bool>,
}

impl PairDetails {
    /// The stream identity this detail record belongs to.
    pub fn identity(&self) -> PairIdentity {
        PairIdentity::new(
            self.pair_address.clone(),
            self.token1_address.clone(),
            self.chain.clone(),
        )
    }
}

/// Statistics for one time window.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeframeStats {
    pub diff: String,
    pub volume: String,
    pub buys: u64,
    pub sells: u64,
    pub txns: u64,
}

/// Per-window statistics carried by a `pair-stats` event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeframesPairStats {
    pub five_min: TimeframeStats,
    pub one_hour: TimeframeStats,
    pub six_hour: TimeframeStats,
    pub twenty_four_hour: TimeframeStats,
}

/// Payload of a `pair-stats` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairStatsMsgData {
    pub pair: PairDetails,
    pub pair_stats: TimeframesPairStats,
    #[serde(default)]
    pub migration_progress: String,
    #[serde(default)]
    pub call_count: u64,
}

// ============================================================================
// SCANNER-PAIRS TYPES
// ============================================================================

/// Payload of a `scanner-pairs` event: a full row set for one filter.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerPairsEventPayload {
    pub filter: ScannerFilter,
    pub results: ScannerPairsResults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerPairsResults {
    pub pairs: Vec<PairRow>,
}

// ============================================================================
// LISTENER PAYLOADS
// ============================================================================

/// Update delivered to pair-stream listeners.
#[derive(Debug, Clone)]
pub enum PairUpdate {
    /// A tick batch; fold with [`merge_swaps`](crate::websocket::state::merge_swaps).
    Swaps(Vec<TokenSwap>),
    /// A stats snapshot; fold with [`merge_stats`](crate::websocket::state::merge_stats).
    Stats(PairStatsInfo),
}

/// Stats snapshot routed to a pair stream.
#[derive(Debug, Clone)]
pub struct PairStatsInfo {
    pub details: PairDetails,
    pub stats: TimeframesPairStats,
    pub migration_progress: String,
}

/// Full replacement row set delivered to table-stream listeners.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    pub pairs: Vec<PairRow>,
}

// ============================================================================
// CLIENT EVENTS
// ============================================================================

/// Events emitted by the WebSocket client.
#[derive(Debug, Clone)]
pub enum WsEvent {
    /// Successfully connected to the server
    Connected,

    /// Disconnected from the server
    Disconnected { reason: String },

    /// Reconnecting after a non-intentional close
    Reconnecting { attempt: u32 },

    /// A pair stream received a tick or stats update
    PairUpdated { key: String },

    /// A table stream received a full snapshot
    TableUpdated { key: String, rows: usize },

    /// Error occurred
    Error { error: WebSocketError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_parsing() {
        assert_eq!(EventType::from("tick"), EventType::Tick);
        assert_eq!(EventType::from("pair-stats"), EventType::PairStats);
        assert_eq!(EventType::from("scanner-pairs"), EventType::ScannerPairs);
        assert_eq!(EventType::from("whatever"), EventType::Unknown);
    }

    #[test]
    fn test_subscribe_pair_frame() {
        let identity = PairIdentity::new("0xP", "0xT", "ETH");
        let json = OutboundMessage::subscribe_pair(&identity).encode().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "subscribe-pair");
        assert_eq!(value["data"]["pair"], "0xP");
        assert_eq!(value["data"]["token"], "0xT");
        assert_eq!(value["data"]["chain"], "ETH");
    }

    #[test]
    fn test_scanner_filter_frame_is_stringified() {
        let filter = ScannerFilter::trending_tokens();
        let json = OutboundMessage::scanner_filter(&filter).encode().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "scanner-filter");
        // Every value goes out as a string, numbers and booleans included
        assert_eq!(value["data"]["page"], "1");
        assert_eq!(value["data"]["isNotHP"], "true");
        assert_eq!(value["data"]["minVol24H"], "1000");
        assert_eq!(value["data"]["rankBy"], "volume");
    }

    #[test]
    fn test_unsubscribe_mirrors_subscribe_payload() {
        let filter = ScannerFilter::new_tokens();
        let sub = OutboundMessage::scanner_filter(&filter);
        let unsub = OutboundMessage::unsubscribe_scanner_filter(&filter);
        assert_eq!(unsub.event, "unsubscribe-scanner-filter");
        assert_eq!(sub.data, unsub.data);
    }

    #[test]
    fn test_tick_payload_deserialization() {
        let json = r#"{
            "pair": { "pair": "0xP", "token": "0xT", "chain": "ETH" },
            "swaps": [
                {
                    "timestamp": "2024-01-01T00:00:00.000Z",
                    "tokenInAddress": "0xT",
                    "amountToken1": "10",
                    "priceToken1Usd": "1.2",
                    "isOutlier": false
                },
                { "tokenInAddress": "0xOTHER" }
            ]
        }"#;
        let payload: TickEventPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.pair.chain, "ETH");
        assert_eq!(payload.swaps.len(), 2);
        assert_eq!(payload.swaps[0].amount_token1.as_deref(), Some("10"));
        // Absent isOutlier means not an outlier
        assert!(!payload.swaps[1].is_outlier);
        assert_eq!(payload.swaps[1].price_token1_usd, None);
    }

    #[test]
    fn test_pair_stats_deserialization() {
        let json = r#"{
            "pair": {
                "pairAddress": "0xP",
                "token1Address": "0xT",
                "chain": "ETH",
                "token1IsHoneypot": false,
                "dexPaid": true,
                "linkTwitter": "https://x.com/token"
            },
            "pairStats": {
                "fiveMin": { "diff": "1.5" },
                "oneHour": { "diff": "-2" },
                "sixHour": { "diff": "0" },
                "twentyFourHour": { "diff": "10" }
            },
            "migrationProgress": "42.5",
            "callCount": 3
        }"#;
        let data: PairStatsMsgData = serde_json::from_str(json).unwrap();
        assert_eq!(data.pair.identity(), PairIdentity::new("0xP", "0xT", "ETH"));
        assert_eq!(data.pair_stats.five_min.diff, "1.5");
        assert_eq!(data.migration_progress, "42.5");
        assert!(data.pair.dex_paid);
    }

    #[test]
    fn test_min_vol_stringification_drops_float_zero() {
        // The server renders round float filters without the fractional part; the
        // outbound frame has to match or the echoed filter would key differently.
        let filter = ScannerFilter {
            min_vol24_h: Some(1000.0),
            ..Default::default()
        };
        let map = string_map(&filter);
        assert_eq!(map.get("minVol24H").map(String::as_str), Some("1000"));
    }
}
