use soroban_sdk::{contracttype, panic_with_error, Address, Env};

use crate::errors::Error;

// Storage key types for the contract
#[contracttype]
pub enum DataKey {
    Admin,
    AssetRegistry,
    Vault,
    GovernanceToken,
    RateModel, // optional strategy contract
    Config,    // ProtocolConfig
    PositionCount(Address),
    Position(Address, u32),
    PositionAssets(Address, u32),      // Vec<Address> of held assets
    Collateral(Address, u32, Address), // (owner, position, asset) -> amount
    TotalAssetSupplied(Address),       // per-asset amount across all positions
    PoolCollateralValue,               // aggregate collateral value, base raw units
    KnownAssets,                       // Vec<Address> seen by supply
    LastOpSequence(Address),           // u32 ledger sequence, temporary storage
    Initialized,
}

/// Risk tier of a collateral asset.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssetTier {
    Stable,
    CrossA,
    CrossB,
    Isolated,
}

/// Per-asset configuration owned by the external asset registry; mirrored
/// here for the cross-contract interface.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssetConfig {
    pub decimals: u32,
    pub tier: AssetTier,
    pub borrow_threshold_bps: u32,
    pub liquidation_threshold_bps: u32,
    pub max_supply_threshold: u128,
    pub isolation_debt_cap: u128,
}

/// Price of a whole asset unit in base-currency raw units. Staleness is the
/// registry's contract: a stale or unknown quote comes back as None.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PriceData {
    pub price: u128,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PositionStatus {
    Active,
    Closed,
    Liquidated,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Position {
    pub index: u32,
    pub isolated: bool,
    pub status: PositionStatus,
    pub debt: u128,
    pub last_interest_accrual: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProtocolConfig {
    pub profit_target_rate_scaled: u128, // vault's cut of realized yield, 1e6
    pub borrow_rate_scaled: u128,        // annualized baseline, 1e6
    pub reward_rate_scaled: u128,        // carried for the reward module, 1e6
    pub liquidator_threshold: i128,      // minimum governance-token stake
    pub flash_loan_fee_bps: u32,
    pub pool_liquidity_cap: u128, // aggregate collateral value cap, 0 disables
}

#[soroban_sdk::contractclient(name = "AssetRegistryClient")]
pub trait AssetRegistryContract {
    fn get_asset_config(env: Env, asset: Address) -> Option<AssetConfig>;
    fn get_price(env: Env, asset: Address) -> Option<PriceData>;
}

#[soroban_sdk::contractclient(name = "VaultClient")]
pub trait VaultContract {
    fn borrow(env: Env, amount: u128, recipient: Address);
    fn repay(env: Env, amount: u128, payer: Address);
    fn add_accrued_interest(env: Env, amount: u128);
    fn boost_yield(env: Env, attributed_to: Address, amount: u128);
    fn set_fees(env: Env, flash_loan_fee_bps: u32, profit_target_rate_scaled: u128);
    fn get_available_liquidity(env: Env) -> u128;
    fn get_total_borrowed(env: Env) -> u128;
    fn utilization(env: Env) -> u128;
}

#[soroban_sdk::contractclient(name = "GovernanceTokenClient")]
pub trait GovernanceTokenContract {
    fn balance_of(env: Env, who: Address) -> i128;
}

#[soroban_sdk::contractclient(name = "RateModelClient")]
pub trait RateModelContract {
    fn get_borrow_rate(env: Env, cash: u128, borrows: u128) -> u128;
}

const TTL_THRESHOLD: u32 = 100_000;
const TTL_EXTEND_TO: u32 = 200_000;

pub fn ensure_initialized(env: &Env) {
    bump_core_ttl(env);
    if !env
        .storage()
        .persistent()
        .get::<_, bool>(&DataKey::Initialized)
        .unwrap_or(false)
    {
        panic_with_error!(env, Error::NotInitialized);
    }
}

pub fn bump_core_ttl(env: &Env) {
    let persistent = env.storage().persistent();
    if persistent.has(&DataKey::Admin) {
        persistent.extend_ttl(&DataKey::Admin, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::AssetRegistry) {
        persistent.extend_ttl(&DataKey::AssetRegistry, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::Vault) {
        persistent.extend_ttl(&DataKey::Vault, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::Initialized) {
        persistent.extend_ttl(&DataKey::Initialized, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
}

pub fn bump_position_ttl(env: &Env, owner: &Address, position_id: u32) {
    let persistent = env.storage().persistent();
    let key = DataKey::Position(owner.clone(), position_id);
    if persistent.has(&key) {
        persistent.extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    let assets_key = DataKey::PositionAssets(owner.clone(), position_id);
    if persistent.has(&assets_key) {
        persistent.extend_ttl(&assets_key, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
}
