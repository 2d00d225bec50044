use soroban_sdk::{panic_with_error, Address, Env};

use crate::constants::*;
use crate::credit;
use crate::errors::Error;
use crate::events::InterestAccrued;
use crate::helpers::*;
use crate::storage::{AssetTier, DataKey, Position, RateModelClient};

/// Tier-specific annualized borrow rate (scaled 1e6): the pool's
/// utilization-sensitive rate from the strategy model when one is wired,
/// else the validated config baseline, plus the tier risk premium.
pub fn borrow_rate_for_tier(env: &Env, tier: AssetTier) -> u128 {
    let vault = vault_client(env);
    let cash = vault.get_available_liquidity();
    let borrows = vault.get_total_borrowed();
    let base: u128 = if let Some(model) = env
        .storage()
        .persistent()
        .get::<_, Address>(&DataKey::RateModel)
    {
        RateModelClient::new(env, &model).get_borrow_rate(&cash, &borrows)
    } else {
        protocol_config(env).borrow_rate_scaled
    };
    if base > MAX_YEARLY_RATE_SCALED {
        panic_with_error!(env, Error::InvalidConfig);
    }
    base.saturating_add(tier_rate_premium(tier))
}

pub fn tier_rate_premium(tier: AssetTier) -> u128 {
    match tier {
        AssetTier::Stable => STABLE_RATE_PREMIUM_SCALED,
        AssetTier::CrossA => CROSS_A_RATE_PREMIUM_SCALED,
        AssetTier::CrossB => CROSS_B_RATE_PREMIUM_SCALED,
        AssetTier::Isolated => ISOLATED_RATE_PREMIUM_SCALED,
    }
}

/// interest = debt * yearly_rate * elapsed / (seconds_per_year * 1e6).
/// Factors are reduced by gcd with the denominator first so legitimate
/// inputs never overflow the intermediate product; anything that still
/// overflows aborts the operation instead of wrapping or truncating.
pub fn checked_interest_product(
    env: &Env,
    amount: u128,
    yearly_rate_scaled: u128,
    elapsed: u128,
) -> u128 {
    let mut denom = SECONDS_PER_YEAR.saturating_mul(SCALE_1E6);
    let mut a = amount;
    let mut b = yearly_rate_scaled;
    let mut c = elapsed;

    let g1 = gcd_u128(a, denom);
    a /= g1;
    denom /= g1;
    let g2 = gcd_u128(b, denom);
    b /= g2;
    denom /= g2;
    let g3 = gcd_u128(c, denom);
    c /= g3;
    denom /= g3;

    let numerator = match a.checked_mul(b).and_then(|v| v.checked_mul(c)) {
        Some(product) => product,
        None => panic_with_error!(env, Error::InterestOverflow),
    };
    numerator / denom
}

fn gcd_u128(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Principal plus accrued-but-uncommitted interest. Pure view.
pub fn debt_with_interest(env: &Env, owner: &Address, position_id: u32) -> u128 {
    let position = get_position_or_panic(env, owner, position_id);
    if position.debt == 0 {
        return 0;
    }
    let now = env.ledger().timestamp();
    if now <= position.last_interest_accrual {
        return position.debt;
    }
    let elapsed = (now - position.last_interest_accrual) as u128;
    let tier = credit::position_tier(env, owner, position_id);
    let rate = borrow_rate_for_tier(env, tier);
    let interest = checked_interest_product(env, position.debt, rate, elapsed);
    match position.debt.checked_add(interest) {
        Some(debt) => debt,
        None => panic_with_error!(env, Error::InterestOverflow),
    }
}

/// Commit accrual: fold pending interest into the position's debt, stamp
/// the accrual time, mirror the delta into the vault, and emit it as its
/// own event. Every debt-changing operation runs this first.
pub fn accrue(env: &Env, owner: &Address, position: &mut Position) {
    let now = env.ledger().timestamp();
    if position.debt == 0 {
        position.last_interest_accrual = now;
        return;
    }
    if now <= position.last_interest_accrual {
        return;
    }
    let elapsed = (now - position.last_interest_accrual) as u128;
    let tier = credit::position_tier(env, owner, position.index);
    let rate = borrow_rate_for_tier(env, tier);
    let interest = checked_interest_product(env, position.debt, rate, elapsed);
    position.last_interest_accrual = now;
    if interest == 0 {
        return;
    }
    position.debt = match position.debt.checked_add(interest) {
        Some(debt) => debt,
        None => panic_with_error!(env, Error::InterestOverflow),
    };
    vault_client(env).add_accrued_interest(&interest);
    InterestAccrued {
        owner: owner.clone(),
        position_id: position.index,
        interest,
        debt: position.debt,
    }
    .publish(env);
}
