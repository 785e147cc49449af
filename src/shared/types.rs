//! Core scanner domain types shared by the REST and WebSocket modules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::shared::chain::Chain;
use crate::shared::key::{canonical_key, canonical_key_of, string_map};
use crate::shared::num::decimal_or_zero;

/// Filter fields that identify a client session rather than a table view.
///
/// The server echoes these back inconsistently, so they are stripped before a filter's
/// subscription key is computed — on both the subscribe side and the dispatch side.
const VOLATILE_FILTER_FIELDS: [&str; 2] = ["timeFrame", "userId"];

/// Ranking column for scanner results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankBy {
    #[serde(rename = "price5M")]
    Price5M,
    #[serde(rename = "price1H")]
    Price1H,
    #[serde(rename = "price6H")]
    Price6H,
    #[serde(rename = "price24H")]
    Price24H,
    #[serde(rename = "volume")]
    Volume,
    #[serde(rename = "txns")]
    Txns,
    #[serde(rename = "buys")]
    Buys,
    #[serde(rename = "sells")]
    Sells,
    #[serde(rename = "trending")]
    Trending,
    #[serde(rename = "age")]
    Age,
    #[serde(rename = "liquidity")]
    Liquidity,
    #[serde(rename = "mcap")]
    Mcap,
    #[serde(rename = "migration")]
    Migration,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderBy {
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

/// Statistics window selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFrame {
    #[serde(rename = "5M")]
    FiveMin,
    #[serde(rename = "1H")]
    OneHour,
    #[serde(rename = "6H")]
    SixHour,
    #[serde(rename = "24H")]
    TwentyFourHour,
}

/// Query parameters defining one scanner table view.
///
/// The same struct drives the REST snapshot query, the `scanner-filter` control frame,
/// and the table stream's subscription key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<Chain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_by: Option<RankBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_frame: Option<TimeFrame>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_u32"
    )]
    pub page: Option<u32>,

    // Security filters
    #[serde(
        rename = "isNotHP",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_bool"
    )]
    pub is_not_hp: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_bool"
    )]
    pub is_verified: Option<bool>,

    // Volume filters
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_f64"
    )]
    pub min_vol24_h: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_f64"
    )]
    pub max_vol24_h: Option<f64>,

    // Age filters (hours)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_u64"
    )]
    pub min_age: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_u64"
    )]
    pub max_age: Option<u64>,

    // Liquidity filters
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_f64"
    )]
    pub min_liq: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_f64"
    )]
    pub max_liq: Option<f64>,

    // Transaction filters
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_u64"
    )]
    pub min_buys24_h: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_u64"
    )]
    pub min_sells24_h: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_u64"
    )]
    pub min_txns24_h: Option<u64>,
}

/// Lenient deserializers for filter scalars.
///
/// The server echoes a subscribed filter back with every value stringified, the same
/// shape the client puts on the wire. These accept both the typed and the
/// stringified form.
mod lenient {
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;
    use serde_json::Value;

    pub fn option_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::String(s)) => s.parse().map(Some).map_err(Error::custom),
            Some(other) => Err(Error::custom(format!("expected bool, got {other}"))),
        }
    }

    pub fn option_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| Error::custom("expected unsigned integer")),
            Some(Value::String(s)) => s.parse().map(Some).map_err(Error::custom),
            Some(other) => Err(Error::custom(format!("expected number, got {other}"))),
        }
    }

    pub fn option_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| Error::custom("expected unsigned integer")),
            Some(Value::String(s)) => s.parse().map(Some).map_err(Error::custom),
            Some(other) => Err(Error::custom(format!("expected number, got {other}"))),
        }
    }

    pub fn option_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) => s.parse().map(Some).map_err(Error::custom),
            Some(other) => Err(Error::custom(format!("expected number, got {other}"))),
        }
    }
}

impl ScannerFilter {
    /// Preset for a "trending tokens" table: ranked by volume, at least $1k 24h
    /// volume, honeypots excluded, at most 7 days old.
    pub fn trending_tokens() -> Self {
        Self {
            page: Some(1),
            rank_by: Some(RankBy::Volume),
            order_by: Some(OrderBy::Desc),
            min_vol24_h: Some(1000.0),
            is_not_hp: Some(true),
            max_age: Some(168),
            ..Default::default()
        }
    }

    /// Preset for a "new tokens" table: newest first, at most 24 hours old,
    /// honeypots excluded.
    pub fn new_tokens() -> Self {
        Self {
            page: Some(1),
            rank_by: Some(RankBy::Age),
            order_by: Some(OrderBy::Desc),
            max_age: Some(24),
            is_not_hp: Some(true),
            ..Default::default()
        }
    }

    /// Canonical key of this filter with volatile fields stripped.
    ///
    /// Subscribe side and dispatch side both key table streams through this method, so
    /// two views sharing a filter converge on one topic.
    pub fn subscription_key(&self) -> String {
        let mut map = string_map(self);
        for field in VOLATILE_FILTER_FIELDS {
            map.remove(field);
        }
        canonical_key(&map)
    }
}

/// Identity of one pair's live stream: pair address, base token address, chain name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairIdentity {
    pub pair: String,
    pub token: String,
    pub chain: String,
}

impl PairIdentity {
    pub fn new(
        pair: impl Into<String>,
        token: impl Into<String>,
        chain: impl Into<String>,
    ) -> Self {
        Self {
            pair: pair.into(),
            token: token.into(),
            chain: chain.into(),
        }
    }

    /// Build the stream identity for a scanner row.
    pub fn from_row(row: &PairRow) -> Self {
        Self {
            pair: row.pair_address.clone(),
            token: row.token1_address.clone(),
            chain: Chain::from_chain_id(row.chain_id).name().to_string(),
        }
    }

    /// Canonical key of this identity.
    pub fn subscription_key(&self) -> String {
        canonical_key_of(self)
    }
}

/// One scanner row: the live snapshot of a trading pair.
///
/// Rows are created from a table snapshot and updated only through the merge methods in
/// the websocket state module; they are never partially mutated in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PairRow {
    pub pair_address: String,
    pub token1_address: String,
    pub token1_symbol: String,
    pub token1_name: String,
    pub token0_symbol: String,
    pub chain_id: u64,
    /// Pair creation time (RFC 3339).
    pub age: String,

    /// USD price of the base token as a decimal string.
    pub price: String,
    /// Accumulated USD volume as a decimal string.
    pub volume: String,
    pub buys: Option<u64>,
    pub sells: Option<u64>,
    pub txns: Option<u64>,
    pub liquidity: String,

    pub current_mcap: String,
    pub initial_mcap: String,
    pub pair_mcap_usd: String,
    pub pair_mcap_usd_initial: String,
    pub token1_total_supply_formatted: String,

    pub migration_progress: Option<String>,
    pub honey_pot: Option<bool>,
    pub dex_paid: bool,
    pub contract_verified: bool,
    pub is_mint_auth_disabled: bool,
    pub is_freeze_auth_disabled: bool,

    pub discord_link: Option<String>,
    pub telegram_link: Option<String>,
    pub twitter_link: Option<String>,
    pub web_link: Option<String>,

    pub diff5_m: String,
    pub diff1_h: String,
    pub diff6_h: String,
    pub diff24_h: String,
}

impl PairRow {
    /// Market cap to display: the first positive figure out of current, initial, pool,
    /// and initial-pool market caps, else `"0"`.
    pub fn display_market_cap(&self) -> &str {
        for candidate in [
            &self.current_mcap,
            &self.initial_mcap,
            &self.pair_mcap_usd,
            &self.pair_mcap_usd_initial,
        ] {
            if decimal_or_zero(candidate) > Decimal::ZERO {
                return candidate;
            }
        }
        "0"
    }
}
