//! Pure merge functions for pair rows.
//!
//! Live updates never mutate a row in place; each merge takes the previous row and the
//! incoming payload and returns the next row. Callers swap the result in atomically.

use rust_decimal::Decimal;

use crate::shared::num::{decimal_or_zero, decimal_or_zero_opt, decimal_to_string};
use crate::shared::types::PairRow;
use crate::websocket::types::{PairStatsInfo, TokenSwap};

/// Fold a tick batch into a row.
///
/// Every swap counts toward volume and transaction totals, outliers included; missing
/// amounts or prices contribute zero. A swap buying the base token adds its token1
/// amount at the token1 price, a sell adds its token0 amount at the token0 price.
/// The displayed price only follows swaps that are not flagged as outliers, taking
/// the latest one in the batch that carries a token1 price. When the price moves,
/// the market cap is recomputed from the token's total supply.
pub fn merge_swaps(row: &PairRow, swaps: &[TokenSwap]) -> PairRow {
    let mut next = row.clone();

    let mut volume = decimal_or_zero(&row.volume);
    let mut buys = row.buys.unwrap_or(0);
    let mut sells = row.sells.unwrap_or(0);
    let mut txns = row.txns.unwrap_or(0);
    let mut latest_price: Option<Decimal> = None;

    for swap in swaps {
        // Addresses arrive in mixed casing; compare them case-insensitively.
        let is_buy = swap
            .token_in_address
            .eq_ignore_ascii_case(&row.token1_address);
        let (amount, swap_price) = if is_buy {
            (
                decimal_or_zero_opt(swap.amount_token1.as_deref()),
                decimal_or_zero_opt(swap.price_token1_usd.as_deref()),
            )
        } else {
            (
                decimal_or_zero_opt(swap.amount_token0.as_deref()),
                decimal_or_zero_opt(swap.price_token0_usd.as_deref()),
            )
        };
        volume += amount * swap_price;

        if is_buy {
            buys += 1;
        } else {
            sells += 1;
        }
        txns += 1;

        if !swap.is_outlier {
            if let Some(price) = swap.price_token1_usd.as_deref() {
                latest_price = Some(decimal_or_zero(price));
            }
        }
    }

    next.volume = decimal_to_string(volume);
    next.buys = Some(buys);
    next.sells = Some(sells);
    next.txns = Some(txns);

    if let Some(price) = latest_price {
        next.price = decimal_to_string(price);
        let supply = decimal_or_zero(&row.token1_total_supply_formatted);
        if supply > Decimal::ZERO {
            next.current_mcap = decimal_to_string(supply * price);
        }
    }

    next
}

/// Fold a stats snapshot into a row.
///
/// Window diffs, migration progress, audit flags, and social links come from the
/// snapshot; trade accounting fields are left to `merge_swaps`. Optional fields keep
/// the row's previous value when the snapshot omits them.
pub fn merge_stats(row: &PairRow, info: &PairStatsInfo) -> PairRow {
    let mut next = row.clone();
    let details = &info.details;

    next.diff5_m = info.stats.five_min.diff.clone();
    next.diff1_h = info.stats.one_hour.diff.clone();
    next.diff6_h = info.stats.six_hour.diff.clone();
    next.diff24_h = info.stats.twenty_four_hour.diff.clone();

    if !info.migration_progress.is_empty() {
        next.migration_progress = Some(info.migration_progress.clone());
    }

    if details.token1_is_honeypot.is_some() {
        next.honey_pot = details.token1_is_honeypot;
    }
    next.dex_paid = details.dex_paid;
    next.contract_verified = details.is_verified;
    next.is_mint_auth_disabled = details.mint_authority_renounced;
    next.is_freeze_auth_disabled = details.freeze_authority_renounced;

    if details.link_discord.is_some() {
        next.discord_link = details.link_discord.clone();
    }
    if details.link_telegram.is_some() {
        next.telegram_link = details.link_telegram.clone();
    }
    if details.link_twitter.is_some() {
        next.twitter_link = details.link_twitter.clone();
    }
    if details.link_website.is_some() {
        next.web_link = details.link_website.clone();
    }

    next
}
