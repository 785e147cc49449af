//! Supported chains and chain-id mapping.
//!
//! Scanner rows carry numeric chain ids while the streaming protocol addresses pairs
//! by chain name; this module converts between the two.

use serde::{Deserialize, Serialize};

/// Chains the scanner indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "BSC")]
    Bsc,
    #[serde(rename = "BASE")]
    Base,
    #[serde(rename = "SOL")]
    Sol,
}

impl Chain {
    /// Map a numeric chain id to a chain. Unknown ids fall back to ETH,
    /// matching the scanner's behavior.
    pub fn from_chain_id(chain_id: u64) -> Self {
        match chain_id {
            1 => Self::Eth,
            56 => Self::Bsc,
            8453 => Self::Base,
            900 => Self::Sol,
            _ => Self::Eth,
        }
    }

    /// Wire name of the chain (`"ETH"`, `"BSC"`, `"BASE"`, `"SOL"`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Eth => "ETH",
            Self::Bsc => "BSC",
            Self::Base => "BASE",
            Self::Sol => "SOL",
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_chain_id() {
        assert_eq!(Chain::from_chain_id(1), Chain::Eth);
        assert_eq!(Chain::from_chain_id(56), Chain::Bsc);
        assert_eq!(Chain::from_chain_id(8453), Chain::Base);
        assert_eq!(Chain::from_chain_id(900), Chain::Sol);
        // Unknown ids default to ETH
        assert_eq!(Chain::from_chain_id(11155111), Chain::Eth);
    }

    #[test]
    fn test_wire_name() {
        assert_eq!(Chain::Sol.name(), "SOL");
        assert_eq!(serde_json::to_string(&Chain::Base).unwrap(), "\"BASE\"");
    }
}
