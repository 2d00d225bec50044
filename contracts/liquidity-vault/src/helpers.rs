use soroban_sdk::{panic_with_error, Address, Env};

use crate::constants::BPS_SCALE;
use crate::errors::Error;
use crate::storage::DataKey;

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
    let tolerance = expected
        .saturating_mul(max_slippage_bps as u128)
        / BPS_SCALE;
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

pub fn mul_div_ceil(env: &Env, a: u128, b: u128, denom: u128) -> u128 {
    if denom == 0 {
        panic_with_error!(env, Error::AmountOverflow);
    }
    match a.checked_mul(b) {
        Some(product) => {
            let floor = product / denom;
            if product % denom != 0 {
                floor + 1
            } else {
                floor
            }
        }
        None => panic_with_error!(env, Error::AmountOverflow),
    }
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

/// Privileged lending-core caller; invoker auth covers the nested call when
/// the core contract itself is on the stack.
pub fn require_core(env: &Env) -> Address {
    let core: Address = match env.storage().persistent().get(&DataKey::Core) {
        Some(addr) => addr,
        None => panic_with_error!(env, Error::CoreNotSet),
    };
    core.require_auth();
    core
}
