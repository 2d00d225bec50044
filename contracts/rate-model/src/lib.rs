#![no_std]
use soroban_sdk::{contract, contractevent, contractimpl, contracttype, Address, BytesN, Env};

const SCALE_1E6: u128 = 1_000_000u128;
const MAX_YEARLY_RATE_SCALED: u128 = 10_000_000u128; // 1000% APY cap
const TTL_THRESHOLD: u32 = 100_000;
const TTL_EXTEND_TO: u32 = 200_000;

#[contracttype]
pub enum DataKey {
    BaseRatePerYear,       // u128 scaled 1e6
    MultiplierPerYear,     // u128 scaled 1e6
    JumpMultiplierPerYear, // u128 scaled 1e6
    Kink,                  // u128 scaled 1e6
    Admin,                 // Address
}

#[contract]
pub struct RateModel;

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModelInitialized {
    pub base_rate: u128,
    pub multiplier: u128,
    pub jump_multiplier: u128,
    pub kink: u128,
}

#[contractimpl]
impl RateModel {
    pub fn initialize(
        env: Env,
        base: u128,
        multiplier: u128,
        jump: u128,
        kink: u128,
        admin: Address,
    ) {
        if env
            .storage()
            .persistent()
            .get::<_, Address>(&DataKey::Admin)
            .is_some()
        {
            panic!("already initialized");
        }
        if kink > SCALE_1E6 {
            panic!("invalid kink");
        }
        if base > MAX_YEARLY_RATE_SCALED
            || multiplier > MAX_YEARLY_RATE_SCALED
            || jump > MAX_YEARLY_RATE_SCALED
        {
            panic!("invalid rate params");
        }
        admin.require_auth();
        env.storage().persistent().set(&DataKey::Admin, &admin);
        env.storage()
            .persistent()
            .set(&DataKey::BaseRatePerYear, &base);
        env.storage()
            .persistent()
            .set(&DataKey::MultiplierPerYear, &multiplier);
        env.storage()
            .persistent()
            .set(&DataKey::JumpMultiplierPerYear, &jump);
        env.storage().persistent().set(&DataKey::Kink, &kink);
        bump_ttl(&env);
        ModelInitialized {
            base_rate: base,
            multiplier,
            jump_multiplier: jump,
            kink,
        }
        .publish(&env);
    }

    /// Annualized borrow rate (scaled 1e6) for the given pool state.
    /// Kinked curve: base + util * multiplier below the kink, plus the jump
    /// slope on the excess above it.
    pub fn get_borrow_rate(env: Env, cash: u128, borrows: u128) -> u128 {
        ensure_initialized(&env);
        bump_ttl(&env);
        let util = Self::utilization(cash, borrows);
        let base: u128 = env
            .storage()
            .persistent()
            .get(&DataKey::BaseRatePerYear)
            .unwrap_or(0);
        let mult: u128 = env
            .storage()
            .persistent()
            .get(&DataKey::MultiplierPerYear)
            .unwrap_or(0);
        let jump: u128 = env
            .storage()
            .persistent()
            .get(&DataKey::JumpMultiplierPerYear)
            .unwrap_or(0);
        let kink: u128 = env
            .storage()
            .persistent()
            .get(&DataKey::Kink)
            .unwrap_or(SCALE_1E6 * 8 / 10);
        if util <= kink {
            base.saturating_add(util.saturating_mul(mult) / SCALE_1E6)
        } else {
            let normal = base.saturating_add(kink.saturating_mul(mult) / SCALE_1E6);
            let excess = util - kink;
            normal.saturating_add(excess.saturating_mul(jump) / SCALE_1E6)
        }
    }

    pub fn upgrade_wasm(env: Env, admin: Address, new_wasm_hash: BytesN<32>) {
        require_admin(&env, &admin);
        env.deployer().update_current_contract_wasm(new_wasm_hash);
    }

    fn utilization(cash: u128, borrows: u128) -> u128 {
        if borrows == 0 {
            return 0;
        }
        let denom = cash.saturating_add(borrows);
        if denom == 0 {
            return 0;
        }
        borrows.saturating_mul(SCALE_1E6) / denom
    }
}

fn ensure_initialized(env: &Env) {
    if env
        .storage()
        .persistent()
        .get::<_, Address>(&DataKey::Admin)
        .is_none()
    {
        panic!("model not initialized");
    }
}

fn require_admin(env: &Env, admin: &Address) {
    let stored: Address = env
        .storage()
        .persistent()
        .get(&DataKey::Admin)
        .expect("admin not set");
    bump_ttl(env);
    if stored != *admin {
        panic!("not admin");
    }
    admin.require_auth();
}

fn bump_ttl(env: &Env) {
    let persistent = env.storage().persistent();
    if persistent.has(&DataKey::Admin) {
        persistent.extend_ttl(&DataKey::Admin, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::BaseRatePerYear) {
        persistent.extend_ttl(&DataKey::BaseRatePerYear, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::MultiplierPerYear) {
        persistent.extend_ttl(&DataKey::MultiplierPerYear, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::JumpMultiplierPerYear) {
        persistent.extend_ttl(&DataKey::JumpMultiplierPerYear, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::Kink) {
        persistent.extend_ttl(&DataKey::Kink, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
}
