use soroban_sdk::{contracttype, panic_with_error, Address, Bytes, Env};
use stellar_tokens::fungible::Base as TokenBase;

use crate::errors::Error;

// Storage key types for the contract
#[contracttype]
pub enum DataKey {
    UnderlyingToken,
    Admin,
    Core,                   // Address of the lending core (privileged caller)
    FeeRecipient,           // Address receiving commission shares
    TotalBase,              // u128, custodied cash + accounted receivables
    TotalBorrowed,          // u128, outstanding principal + accrued interest
    TotalSuppliedLiquidity, // u128, principal book (deposits net of withdrawals)
    TotalAccruedInterest,   // u128, lifetime yield credited to the pool
    UserPrincipal(Address), // u128, supplier cost basis for commission
    ProfitTargetRateScaled, // u128, scaled 1e6, cut of realized yield
    FlashLoanFeeBps,        // u32
    GenesisSharePrice,      // u128, scaled 1e6
    GenesisTime,            // u64
    LastOpSequence(Address), // u32 ledger sequence, temporary storage
    Initialized,
}

/// Contract that wants to receive flash loans. The callback must leave
/// `amount + fee` back in the vault and return true before it unwinds.
#[soroban_sdk::contractclient(name = "FlashLoanReceiverClient")]
pub trait FlashLoanReceiver {
    fn on_flash_loan(env: Env, initiator: Address, amount: u128, fee: u128, data: Bytes) -> bool;
}

const TTL_THRESHOLD: u32 = 100_000;
const TTL_EXTEND_TO: u32 = 200_000;

pub fn ensure_initialized(env: &Env) -> Address {
    bump_core_ttl(env);
    if !env
        .storage()
        .persistent()
        .get::<_, bool>(&DataKey::Initialized)
        .unwrap_or(false)
    {
        panic_with_error!(env, Error::NotInitialized);
    }
    env.storage()
        .persistent()
        .get(&DataKey::UnderlyingToken)
        .expect("underlying token missing")
}

pub fn bump_core_ttl(env: &Env) {
    let persistent = env.storage().persistent();
    if persistent.has(&DataKey::Admin) {
        persistent.extend_ttl(&DataKey::Admin, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::UnderlyingToken) {
        persistent.extend_ttl(&DataKey::UnderlyingToken, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::Initialized) {
        persistent.extend_ttl(&DataKey::Initialized, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
}

pub fn bump_pool_state_ttl(env: &Env) {
    let persistent = env.storage().persistent();
    if persistent.has(&DataKey::TotalBase) {
        persistent.extend_ttl(&DataKey::TotalBase, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::TotalBorrowed) {
        persistent.extend_ttl(&DataKey::TotalBorrowed, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::TotalSuppliedLiquidity) {
        persistent.extend_ttl(&DataKey::TotalSuppliedLiquidity, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::TotalAccruedInterest) {
        persistent.extend_ttl(&DataKey::TotalAccruedInterest, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
}

pub fn bump_principal_ttl(env: &Env, user: &Address) {
    let key = DataKey::UserPrincipal(user.clone());
    let persistent = env.storage().persistent();
    if persistent.has(&key) {
        persistent.extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
}

pub fn total_base(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::TotalBase)
        .expect("total base missing")
}

pub fn set_total_base(env: &Env, value: u128) {
    env.storage().persistent().set(&DataKey::TotalBase, &value);
}

pub fn total_borrowed(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::TotalBorrowed)
        .expect("total borrowed missing")
}

pub fn set_total_borrowed(env: &Env, value: u128) {
    env.storage()
        .persistent()
        .set(&DataKey::TotalBorrowed, &value);
}

pub fn total_supplied_liquidity(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::TotalSuppliedLiquidity)
        .expect("supplied liquidity missing")
}

pub fn set_total_supplied_liquidity(env: &Env, value: u128) {
    env.storage()
        .persistent()
        .set(&DataKey::TotalSuppliedLiquidity, &value);
}

pub fn total_accrued_interest(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::TotalAccruedInterest)
        .expect("accrued interest missing")
}

pub fn set_total_accrued_interest(env: &Env, value: u128) {
    env.storage()
        .persistent()
        .set(&DataKey::TotalAccruedInterest, &value);
}

pub fn user_principal(env: &Env, user: &Address) -> u128 {
    bump_principal_ttl(env, user);
    env.storage()
        .persistent()
        .get(&DataKey::UserPrincipal(user.clone()))
        .unwrap_or(0u128)
}

pub fn set_user_principal(env: &Env, user: &Address, value: u128) {
    if value == 0 {
        env.storage()
            .persistent()
            .remove(&DataKey::UserPrincipal(user.clone()));
        return;
    }
    env.storage()
        .persistent()
        .set(&DataKey::UserPrincipal(user.clone()), &value);
    bump_principal_ttl(env, user);
}

pub fn share_balance(env: &Env, addr: &Address) -> u128 {
    let bal = TokenBase::balance(env, addr);
    if bal < 0 {
        panic!("negative shares");
    }
    bal as u128
}

pub fn total_shares_supply(env: &Env) -> u128 {
    let supply = TokenBase::total_supply(env);
    if supply < 0 {
        panic!("negative supply");
    }
    supply as u128
}

pub fn to_i128(env: &Env, amount: u128) -> i128 {
    if amount > i128::MAX as u128 {
        panic_with_error!(env, Error::AmountOverflow);
    }
    amount as i128
}
