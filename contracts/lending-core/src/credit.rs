use soroban_sdk::{Address, Env};

use crate::constants::BPS_SCALE;
use crate::helpers::*;
use crate::storage::{AssetConfig, AssetTier, PriceData};

/// Value of a raw collateral amount in base-currency raw units, rounded
/// down. Price is quoted per whole asset unit, so the divisor is the
/// asset's own decimal unit.
pub fn asset_value(env: &Env, amount: u128, config: &AssetConfig, price: &PriceData) -> u128 {
    let unit = pow10(env, config.decimals);
    mul_div_floor(env, amount, price.price, unit)
}

/// Blended limits over a position's collateral basket:
/// (credit_limit, liquidation_level, total_value), each the sum of
/// per-asset contributions weighted by that asset's own thresholds.
pub fn calculate_limits(
    env: &Env,
    owner: &Address,
    position_id: u32,
) -> (u128, u128, u128) {
    let _ = get_position_or_panic(env, owner, position_id);
    let assets = position_assets(env, owner, position_id);
    let mut credit_limit = 0u128;
    let mut liquidation_level = 0u128;
    let mut total_value = 0u128;
    for asset in assets.iter() {
        let amount = collateral_amount(env, owner, position_id, &asset);
        if amount == 0 {
            continue;
        }
        let config = get_asset_config_or_panic(env, &asset);
        let price = get_price_or_panic(env, &asset);
        let value = asset_value(env, amount, &config, &price);
        total_value = total_value.saturating_add(value);
        credit_limit = credit_limit.saturating_add(
            value.saturating_mul(config.borrow_threshold_bps as u128) / BPS_SCALE,
        );
        liquidation_level = liquidation_level.saturating_add(
            value.saturating_mul(config.liquidation_threshold_bps as u128) / BPS_SCALE,
        );
    }
    (credit_limit, liquidation_level, total_value)
}

/// Tier of a position: the single asset's tier for isolated positions, the
/// highest-risk tier among held assets for cross positions.
pub fn position_tier(env: &Env, owner: &Address, position_id: u32) -> AssetTier {
    let position = get_position_or_panic(env, owner, position_id);
    let assets = position_assets(env, owner, position_id);
    if position.isolated {
        return match assets.first() {
            Some(asset) => get_asset_config_or_panic(env, &asset).tier,
            None => AssetTier::Isolated,
        };
    }
    let mut tier = AssetTier::Stable;
    for asset in assets.iter() {
        let candidate = get_asset_config_or_panic(env, &asset).tier;
        if tier_risk_rank(candidate) > tier_risk_rank(tier) {
            tier = candidate;
        }
    }
    tier
}

fn tier_risk_rank(tier: AssetTier) -> u32 {
    match tier {
        AssetTier::Stable => 0,
        AssetTier::CrossA => 1,
        AssetTier::CrossB => 2,
        AssetTier::Isolated => 3,
    }
}
