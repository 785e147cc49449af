//! Shared utilities and types used across the REST and WebSocket modules.

pub mod chain;
pub mod key;
pub mod num;
pub mod types;

// Re-export commonly used items
pub use chain::Chain;
pub use key::{canonical_key, canonical_key_of, string_map};
pub use types::{OrderBy, PairIdentity, PairRow, RankBy, ScannerFilter, TimeFrame};
