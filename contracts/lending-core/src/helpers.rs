use soroban_sdk::{panic_with_error, Address, Env, Vec};

use crate::constants::*;
use crate::errors::Error;
use crate::storage::*;

/// One state-mutating operation per account per ledger sequence. The flag
/// lives in temporary storage, so it expires with the ledger on its own.
pub fn mev_guard(env: &Env, account: &Address) {
    let seq = env.ledger().sequence();
    let key = DataKey::LastOpSequence(account.clone());
    let temporary = env.storage().temporary();
    if let Some(last) = temporary.get::<_, u32>(&key) {
        if last == seq {
            panic_with_error!(env, Error::MEVSameBlockOperation);
        }
    }
    temporary.set(&key, &seq);
}

/// Symmetric basis-point envelope around the caller's quote. An expected
/// value of zero admits only an actual of zero.
pub fn check_slippage(env: &Env, expected: u128, actual: u128, max_slippage_bps: u32) {
    let tolerance = expected.saturating_mul(max_slippage_bps as u128) / BPS_SCALE;
    let low = expected.saturating_sub(tolerance);
    let high = expected.saturating_add(tolerance);
    if actual < low || actual > high {
        panic_with_error!(env, Error::MEVSlippageExceeded);
    }
}

pub fn mul_div_floor(env: &Env, a: u128, b: u128, denom: u128) -> u128 {
    if denom == 0 {
        panic_with_error!(env, Error::AmountOverflow);
    }
    match a.checked_mul(b) {
        Some(product) => product / denom,
        None => panic_with_error!(env, Error::AmountOverflow),
    }
}

pub fn pow10(env: &Env, exponent: u32) -> u128 {
    match 10u128.checked_pow(exponent) {
        Some(value) => value,
        None => panic_with_error!(env, Error::AmountOverflow),
    }
}

pub fn to_i128(env: &Env, amount: u128) -> i128 {
    if amount > i128::MAX as u128 {
        panic_with_error!(env, Error::AmountOverflow);
    }
    amount as i128
}

pub fn require_admin(env: &Env) -> Address {
    let admin: Address = env
        .storage()
        .persistent()
        .get(&DataKey::Admin)
        .expect("admin not set");
    admin.require_auth();
    admin
}

pub fn registry_client(env: &Env) -> AssetRegistryClient<'_> {
    let addr: Address = env
        .storage()
        .persistent()
        .get(&DataKey::AssetRegistry)
        .expect("asset registry not set");
    AssetRegistryClient::new(env, &addr)
}

pub fn vault_client(env: &Env) -> VaultClient<'_> {
    let addr: Address = env
        .storage()
        .persistent()
        .get(&DataKey::Vault)
        .expect("vault not set");
    VaultClient::new(env, &addr)
}

pub fn governance_token_client(env: &Env) -> GovernanceTokenClient<'_> {
    let addr: Address = env
        .storage()
        .persistent()
        .get(&DataKey::GovernanceToken)
        .expect("governance token not set");
    GovernanceTokenClient::new(env, &addr)
}

pub fn protocol_config(env: &Env) -> ProtocolConfig {
    match env.storage().persistent().get(&DataKey::Config) {
        Some(config) => config,
        None => panic_with_error!(env, Error::ConfigNotLoaded),
    }
}

pub fn get_asset_config_or_panic(env: &Env, asset: &Address) -> AssetConfig {
    match registry_client(env).get_asset_config(asset) {
        Some(config) => config,
        None => panic_with_error!(env, Error::AssetNotListed),
    }
}

/// A missing, stale, or zero price is a hard failure, never a default.
pub fn get_price_or_panic(env: &Env, asset: &Address) -> PriceData {
    match registry_client(env).get_price(asset) {
        Some(price) if price.price > 0 => price,
        _ => panic_with_error!(env, Error::PriceUnavailable),
    }
}

pub fn position_count(env: &Env, owner: &Address) -> u32 {
    env.storage()
        .persistent()
        .get(&DataKey::PositionCount(owner.clone()))
        .unwrap_or(0u32)
}

pub fn get_position_or_panic(env: &Env, owner: &Address, position_id: u32) -> Position {
    bump_position_ttl(env, owner, position_id);
    match env
        .storage()
        .persistent()
        .get(&DataKey::Position(owner.clone(), position_id))
    {
        Some(position) => position,
        None => panic_with_error!(env, Error::InvalidPosition),
    }
}

pub fn get_active_position_or_panic(env: &Env, owner: &Address, position_id: u32) -> Position {
    let position = get_position_or_panic(env, owner, position_id);
    if position.status != PositionStatus::Active {
        panic_with_error!(env, Error::PositionNotActive);
    }
    position
}

pub fn save_position(env: &Env, owner: &Address, position: &Position) {
    env.storage()
        .persistent()
        .set(&DataKey::Position(owner.clone(), position.index), position);
    bump_position_ttl(env, owner, position.index);
}

pub fn position_assets(env: &Env, owner: &Address, position_id: u32) -> Vec<Address> {
    env.storage()
        .persistent()
        .get(&DataKey::PositionAssets(owner.clone(), position_id))
        .unwrap_or(Vec::new(env))
}

pub fn collateral_amount(env: &Env, owner: &Address, position_id: u32, asset: &Address) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::Collateral(
            owner.clone(),
            position_id,
            asset.clone(),
        ))
        .unwrap_or(0u128)
}

/// Write a holding and keep the position's held-asset set in step with it.
pub fn set_collateral_amount(
    env: &Env,
    owner: &Address,
    position_id: u32,
    asset: &Address,
    amount: u128,
) {
    let key = DataKey::Collateral(owner.clone(), position_id, asset.clone());
    let mut assets = position_assets(env, owner, position_id);
    if amount == 0 {
        env.storage().persistent().remove(&key);
        let mut pruned = Vec::new(env);
        for held in assets.iter() {
            if held != *asset {
                pruned.push_back(held);
            }
        }
        env.storage().persistent().set(
            &DataKey::PositionAssets(owner.clone(), position_id),
            &pruned,
        );
        return;
    }
    env.storage().persistent().set(&key, &amount);
    if !assets.contains(asset) {
        if assets.len() >= MAX_POSITION_ASSETS {
            panic_with_error!(env, Error::TooManyCollateralAssets);
        }
        assets.push_back(asset.clone());
        env.storage().persistent().set(
            &DataKey::PositionAssets(owner.clone(), position_id),
            &assets,
        );
    }
    bump_position_ttl(env, owner, position_id);
}

pub fn total_asset_supplied(env: &Env, asset: &Address) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::TotalAssetSupplied(asset.clone()))
        .unwrap_or(0u128)
}

pub fn set_total_asset_supplied(env: &Env, asset: &Address, amount: u128) {
    env.storage()
        .persistent()
        .set(&DataKey::TotalAssetSupplied(asset.clone()), &amount);
}

pub fn pool_collateral_value(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::PoolCollateralValue)
        .unwrap_or(0u128)
}

pub fn set_pool_collateral_value(env: &Env, value: u128) {
    env.storage()
        .persistent()
        .set(&DataKey::PoolCollateralValue, &value);
}

pub fn known_assets(env: &Env) -> Vec<Address> {
    env.storage()
        .persistent()
        .get(&DataKey::KnownAssets)
        .unwrap_or(Vec::new(env))
}

pub fn remember_asset(env: &Env, asset: &Address) {
    let mut assets = known_assets(env);
    if !assets.contains(asset) {
        assets.push_back(asset.clone());
        env.storage().persistent().set(&DataKey::KnownAssets, &assets);
    }
}
