//! Message handlers for WebSocket events.
//!
//! Parses the inbound envelope, decodes the payload for its event tag, and dispatches
//! to the listeners registered under the payload's subscription key.

use std::sync::Arc;

use crate::websocket::error::WebSocketError;
use crate::websocket::registry::BroadcastRegistry;
use crate::websocket::types::{
    EventType, PairStatsInfo, PairStatsMsgData, PairUpdate, RawWsMessage,
    ScannerPairsEventPayload, TableSnapshot, TickEventPayload, WsEvent,
};

/// Routes raw frames to the pair and table registries.
pub struct MessageHandler {
    pair_registry: Arc<BroadcastRegistry<PairUpdate>>,
    table_registry: Arc<BroadcastRegistry<TableSnapshot>>,
}

impl MessageHandler {
    /// Create a new message handler over the two shared registries
    pub fn new(
        pair_registry: Arc<BroadcastRegistry<PairUpdate>>,
        table_registry: Arc<BroadcastRegistry<TableSnapshot>>,
    ) -> Self {
        Self {
            pair_registry,
            table_registry,
        }
    }

    /// Handle an incoming message and return events
    pub fn handle_message(&self, text: &str) -> Vec<WsEvent> {
        // Parse the envelope first
        let raw_msg: RawWsMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("Failed to parse WebSocket message: {}", e);
                return vec![WsEvent::Error {
                    error: WebSocketError::MessageParseError(e.to_string()),
                }];
            }
        };

        // Route by event tag
        match EventType::from(raw_msg.event.as_str()) {
            EventType::Tick => self.handle_tick(raw_msg.data),
            EventType::PairStats => self.handle_pair_stats(raw_msg.data),
            EventType::ScannerPairs => self.handle_scanner_pairs(raw_msg.data),
            EventType::Unknown => {
                tracing::debug!("Ignoring unknown event tag: {}", raw_msg.event);
                Vec::new()
            }
        }
    }

    fn handle_tick(&self, data: serde_json::Value) -> Vec<WsEvent> {
        let payload: TickEventPayload = match serde_json::from_value(data) {
            Ok(payload) => payload,
            Err(e) => return parse_error("tick", e),
        };

        let key = payload.pair.subscription_key();
        let listeners = self
            .pair_registry
            .dispatch(&key, &PairUpdate::Swaps(payload.swaps));
        tracing::trace!(key, listeners, "dispatched tick batch");

        vec![WsEvent::PairUpdated { key }]
    }

    fn handle_pair_stats(&self, data: serde_json::Value) -> Vec<WsEvent> {
        let payload: PairStatsMsgData = match serde_json::from_value(data) {
            Ok(payload) => payload,
            Err(e) => return parse_error("pair-stats", e),
        };

        let key = payload.pair.identity().subscription_key();
        let info = PairStatsInfo {
            details: payload.pair,
            stats: payload.pair_stats,
            migration_progress: payload.migration_progress,
        };
        let listeners = self.pair_registry.dispatch(&key, &PairUpdate::Stats(info));
        tracing::trace!(key, listeners, "dispatched pair stats");

        vec![WsEvent::PairUpdated { key }]
    }

    fn handle_scanner_pairs(&self, data: serde_json::Value) -> Vec<WsEvent> {
        let payload: ScannerPairsEventPayload = match serde_json::from_value(data) {
            Ok(payload) => payload,
            Err(e) => return parse_error("scanner-pairs", e),
        };

        // The echoed filter carries the sender's volatile fields; keying through
        // subscription_key strips them the same way the subscribe side did.
        let key = payload.filter.subscription_key();
        let rows = payload.results.pairs.len();
        let snapshot = TableSnapshot {
            pairs: payload.results.pairs,
        };
        let listeners = self.table_registry.dispatch(&key, &snapshot);
        tracing::trace!(key, rows, listeners, "dispatched table snapshot");

        vec![WsEvent::TableUpdated { key, rows }]
    }
}

fn parse_error(event: &str, e: serde_json::Error) -> Vec<WsEvent> {
    tracing::warn!("Failed to parse {} payload: {}", event, e);
    vec![WsEvent::Error {
        error: WebSocketError::MessageParseError(e.to_string()),
    }]
}
