#![no_std]
use soroban_sdk::{contract, contractimpl, contracttype, Address, Env};

// Interface types mirrored from the lending core's registry client.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssetTier {
    Stable,
    CrossA,
    CrossB,
    Isolated,
}

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

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PriceData {
    pub price: u128,
    pub timestamp: u64,
}

#[contracttype]
pub enum DataKey {
    Admin,
    MaxPriceAge, // u64 seconds; quotes older than this come back as None
    Config(Address),
    Price(Address),
}

/// Registry test double: hand-set configs and quotes, with a max-age window
/// so staleness behaves like the real oracle path.
#[contract]
pub struct MockAssetRegistry;

#[contractimpl]
impl MockAssetRegistry {
    pub fn initialize(env: Env, admin: Address, max_price_age: u64) {
        if env
            .storage()
            .persistent()
            .get::<_, Address>(&DataKey::Admin)
            .is_some()
        {
            panic!("already initialized");
        }
        admin.require_auth();
        env.storage().persistent().set(&DataKey::Admin, &admin);
        env.storage()
            .persistent()
            .set(&DataKey::MaxPriceAge, &max_price_age);
    }

    pub fn set_asset(env: Env, asset: Address, config: AssetConfig) {
        require_admin(&env);
        env.storage()
            .persistent()
            .set(&DataKey::Config(asset), &config);
    }

    /// Set a quote stamped with the current ledger time.
    pub fn set_price(env: Env, asset: Address, price: u128) {
        require_admin(&env);
        let quote = PriceData {
            price,
            timestamp: env.ledger().timestamp(),
        };
        env.storage().persistent().set(&DataKey::Price(asset), &quote);
    }

    pub fn clear_price(env: Env, asset: Address) {
        require_admin(&env);
        env.storage().persistent().remove(&DataKey::Price(asset));
    }

    pub fn set_max_price_age(env: Env, max_price_age: u64) {
        require_admin(&env);
        env.storage()
            .persistent()
            .set(&DataKey::MaxPriceAge, &max_price_age);
    }

    pub fn get_asset_config(env: Env, asset: Address) -> Option<AssetConfig> {
        env.storage().persistent().get(&DataKey::Config(asset))
    }

    pub fn get_price(env: Env, asset: Address) -> Option<PriceData> {
        let quote: PriceData = env.storage().persistent().get(&DataKey::Price(asset))?;
        let max_age: u64 = env
            .storage()
            .persistent()
            .get(&DataKey::MaxPriceAge)
            .unwrap_or(0);
        let now = env.ledger().timestamp();
        if now.saturating_sub(quote.timestamp) > max_age {
            return None;
        }
        Some(quote)
    }
}

fn require_admin(env: &Env) {
    let admin: Address = env
        .storage()
        .persistent()
        .get(&DataKey::Admin)
        .expect("admin not set");
    admin.require_auth();
}
