//! State management for WebSocket subscriptions.
//!
//! This module provides local state for the two stream families:
//! - `pair`: pure merge functions folding tick batches and stats snapshots into rows
//! - `table`: materialized row sets driven by scanner snapshots

pub mod pair;
pub mod table;

pub use pair::{merge_stats, merge_swaps};
pub use table::TableState;
