#![cfg(test)]

use super::*;
use crate::constants::FULL_REPAYMENT;
use governance_token::{GovernanceToken, GovernanceTokenClient};
use liquidity_vault::{LiquidityVault, LiquidityVaultClient};
use mock_asset_registry::{
    AssetConfig as RegistryAssetConfig, AssetTier as RegistryAssetTier, MockAssetRegistry,
    MockAssetRegistryClient,
};
use rate_model::{RateModel, RateModelClient};
use soroban_sdk::testutils::{Address as _, Ledger};
use soroban_sdk::{token, Address, Env, String};

const UNIT: u128 = 10_000_000; // 7-decimal whole unit
const YEAR: u64 = 365 * 24 * 60 * 60;

fn create_test_token<'a>(
    env: &'a Env,
    admin: &'a Address,
) -> (Address, token::Client<'a>, token::StellarAssetClient<'a>) {
    let contract_address = env
        .register_stellar_asset_contract_v2(admin.clone())
        .address();
    (
        contract_address.clone(),
        token::Client::new(env, &contract_address),
        token::StellarAssetClient::new(env, &contract_address),
    )
}

fn advance_ledger(env: &Env, secs: u64) {
    env.ledger().with_mut(|li| {
        li.timestamp += secs;
        li.sequence_number += 1;
    });
}

struct Setup<'a> {
    admin: Address,
    base_token: Address,
    base_client: token::Client<'a>,
    base_admin: token::StellarAssetClient<'a>,
    registry: MockAssetRegistryClient<'a>,
    vault: LiquidityVaultClient<'a>,
    vault_id: Address,
    gov: GovernanceTokenClient<'a>,
    core: LendingCoreClient<'a>,
    core_id: Address,
}

fn default_config() -> ProtocolConfig {
    ProtocolConfig {
        profit_target_rate_scaled: 0,
        borrow_rate_scaled: 0,
        reward_rate_scaled: 0,
        liquidator_threshold: (100 * UNIT) as i128,
        flash_loan_fee_bps: 0,
        pool_liquidity_cap: 0,
    }
}

fn setup(env: &Env) -> Setup<'_> {
    let admin = Address::generate(env);
    let fee_recipient = Address::generate(env);
    let (base_token, base_client, base_admin) = create_test_token(env, &admin);

    let registry_id = env.register(MockAssetRegistry, ());
    let registry = MockAssetRegistryClient::new(env, &registry_id);
    registry.initialize(&admin, &(100u64 * YEAR));

    let vault_id = env.register(LiquidityVault, ());
    let vault = LiquidityVaultClient::new(env, &vault_id);
    vault.initialize(&base_token, &admin, &fee_recipient, &0u128, &0u32);

    let gov_id = env.register(GovernanceToken, ());
    let gov = GovernanceTokenClient::new(env, &gov_id);
    gov.initialize(
        &String::from_str(env, "Citrine Governance"),
        &String::from_str(env, "CITR"),
        &7u32,
        &admin,
        &1_000_000_000_000_000i128,
    );

    let core_id = env.register(LendingCore, ());
    let core = LendingCoreClient::new(env, &core_id);
    core.initialize(&admin, &registry_id, &vault_id, &gov_id);
    vault.set_core(&core_id);
    core.load_protocol_config(&default_config());

    Setup {
        admin,
        base_token,
        base_client,
        base_admin,
        registry,
        vault,
        vault_id,
        gov,
        core,
        core_id,
    }
}

impl<'a> Setup<'a> {
    /// Register a 7-decimal collateral token with the registry, priced in
    /// whole base units.
    fn list_asset(
        &self,
        env: &'a Env,
        tier: RegistryAssetTier,
        borrow_bps: u32,
        liq_bps: u32,
        price_whole_units: u128,
    ) -> (Address, token::Client<'a>, token::StellarAssetClient<'a>) {
        self.list_asset_with_caps(env, tier, borrow_bps, liq_bps, price_whole_units, 0, 0)
    }

    fn list_asset_with_caps(
        &self,
        env: &'a Env,
        tier: RegistryAssetTier,
        borrow_bps: u32,
        liq_bps: u32,
        price_whole_units: u128,
        max_supply_threshold: u128,
        isolation_debt_cap: u128,
    ) -> (Address, token::Client<'a>, token::StellarAssetClient<'a>) {
        let token_admin = Address::generate(env);
        let contract_address = env
            .register_stellar_asset_contract_v2(token_admin)
            .address();
        self.registry.set_asset(
            &contract_address,
            &RegistryAssetConfig {
                decimals: 7,
                tier,
                borrow_threshold_bps: borrow_bps,
                liquidation_threshold_bps: liq_bps,
                max_supply_threshold,
                isolation_debt_cap,
            },
        );
        self.registry
            .set_price(&contract_address, &(price_whole_units * UNIT));
        (
            contract_address.clone(),
            token::Client::new(env, &contract_address),
            token::StellarAssetClient::new(env, &contract_address),
        )
    }

    /// Seed the vault with lendable cash from a fresh supplier.
    fn fund_vault(&self, env: &Env, amount: u128) {
        let supplier = Address::generate(env);
        self.base_admin.mint(&supplier, &(amount as i128));
        self.vault
            .deposit_liquidity(&supplier, &amount, &amount, &10_000u32);
    }
}

#[test]
fn test_initialize_twice_rejected() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let other = Address::generate(&env);
    let res = s
        .core
        .try_initialize(&s.admin, &other, &other, &other);
    assert_eq!(res, Err(Ok(Error::AlreadyInitialized)));
}

#[test]
fn test_load_protocol_config_validates_bounds() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);

    let mut config = default_config();
    config.borrow_rate_scaled = 20_000_000; // above the 1000% cap
    assert_eq!(
        s.core.try_load_protocol_config(&config),
        Err(Ok(Error::InvalidConfig))
    );

    let mut config = default_config();
    config.liquidator_threshold = -1;
    assert_eq!(
        s.core.try_load_protocol_config(&config),
        Err(Ok(Error::InvalidConfig))
    );

    let mut config = default_config();
    config.profit_target_rate_scaled = 600_000;
    assert_eq!(
        s.core.try_load_protocol_config(&config),
        Err(Ok(Error::InvalidConfig))
    );

    // A valid config lands and pushes the fee parameters to the vault
    let mut config = default_config();
    config.flash_loan_fee_bps = 30;
    config.profit_target_rate_scaled = 200_000;
    s.core.load_protocol_config(&config);
    assert_eq!(s.vault.get_flash_loan_fee(), 30u32);
    assert_eq!(s.vault.get_profit_target_rate(), 200_000u128);
    assert_eq!(s.core.get_protocol_config(), config);
}

#[test]
fn test_open_position_tier_discipline() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, _) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    let (iso, _, _) =
        s.list_asset_with_caps(&env, RegistryAssetTier::Isolated, 7_000, 7_500, 1, 0, 0);

    // Isolated-tier asset cannot seed a cross position, and vice versa
    assert_eq!(
        s.core.try_open_position(&owner, &iso, &false),
        Err(Ok(Error::IsolatedAssetViolation))
    );
    assert_eq!(
        s.core.try_open_position(&owner, &stable, &true),
        Err(Ok(Error::InvalidAssetForIsolation))
    );

    let first = s.core.open_position(&owner, &stable, &false);
    assert_eq!(first, 0u32);
    advance_ledger(&env, 5);
    let second = s.core.open_position(&owner, &iso, &true);
    assert_eq!(second, 1u32);
    assert_eq!(s.core.get_position_count(&owner), 2u32);

    let positions = s.core.get_user_positions(&owner);
    assert_eq!(positions.len(), 2);
    assert_eq!(positions.get(0).unwrap().status, PositionStatus::Active);
    assert!(positions.get(1).unwrap().isolated);
}

#[test]
fn test_unknown_position_rejected() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    assert_eq!(
        s.core.try_calculate_limits(&owner, &0u32),
        Err(Ok(Error::InvalidPosition))
    );
    assert_eq!(
        s.core.try_health_factor(&owner, &3u32),
        Err(Ok(Error::InvalidPosition))
    );
}

#[test]
fn test_limits_additive_across_basket() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, stable_mint) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    let (cross_a, _, cross_a_mint) =
        s.list_asset(&env, RegistryAssetTier::CrossA, 8_000, 8_500, 2_500);
    stable_mint.mint(&owner, &((1_000 * UNIT) as i128));
    cross_a_mint.mint(&owner, &(UNIT as i128));

    let id = s.core.open_position(&owner, &stable, &false);
    // An empty position values to all zeros
    assert_eq!(s.core.calculate_limits(&owner, &id), (0, 0, 0));

    advance_ledger(&env, 5);
    s.core.supply_collateral(&owner, &cross_a, &UNIT, &id);
    advance_ledger(&env, 5);
    s.core
        .supply_collateral(&owner, &stable, &(1_000 * UNIT), &id);

    // 2500 at 80%/85% plus 1000 at 90%/95%
    let (credit_limit, liquidation_level, total_value) = s.core.calculate_limits(&owner, &id);
    assert_eq!(total_value, 3_500 * UNIT);
    assert_eq!(credit_limit, 2_900 * UNIT);
    assert_eq!(liquidation_level, 3_075 * UNIT);
    assert_eq!(s.core.calculate_credit_limit(&owner, &id), 2_900 * UNIT);

    let held = s.core.get_position_collateral_assets(&owner, &id);
    assert_eq!(held.len(), 2);
    assert_eq!(s.core.get_collateral_amount(&owner, &id, &stable), 1_000 * UNIT);
}

#[test]
fn test_isolated_position_admits_one_asset_only() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, stable_mint) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    let (iso, _, iso_mint) =
        s.list_asset_with_caps(&env, RegistryAssetTier::Isolated, 7_000, 7_500, 1, 0, 0);
    let (iso_other, _, iso_other_mint) =
        s.list_asset_with_caps(&env, RegistryAssetTier::Isolated, 7_000, 7_500, 1, 0, 0);
    stable_mint.mint(&owner, &((100 * UNIT) as i128));
    iso_mint.mint(&owner, &((100 * UNIT) as i128));
    iso_other_mint.mint(&owner, &((100 * UNIT) as i128));

    let id = s.core.open_position(&owner, &iso, &true);
    advance_ledger(&env, 5);
    s.core.supply_collateral(&owner, &iso, &(50 * UNIT), &id);

    // Same asset again is fine
    advance_ledger(&env, 5);
    s.core.supply_collateral(&owner, &iso, &(10 * UNIT), &id);

    // A non-isolated asset never enters an isolated position
    advance_ledger(&env, 5);
    assert_eq!(
        s.core
            .try_supply_collateral(&owner, &stable, &(10 * UNIT), &id),
        Err(Ok(Error::InvalidAssetForIsolation))
    );
    // Nor does a second distinct isolated asset
    assert_eq!(
        s.core
            .try_supply_collateral(&owner, &iso_other, &(10 * UNIT), &id),
        Err(Ok(Error::InvalidAssetForIsolation))
    );

    // And an isolated-tier asset never enters a cross position
    let cross_id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    assert_eq!(
        s.core
            .try_supply_collateral(&owner, &iso, &(10 * UNIT), &cross_id),
        Err(Ok(Error::IsolatedAssetViolation))
    );
}

#[test]
fn test_asset_and_pool_supply_caps() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (capped, _, capped_mint) = s.list_asset_with_caps(
        &env,
        RegistryAssetTier::Stable,
        9_000,
        9_500,
        1,
        500 * UNIT,
        0,
    );
    capped_mint.mint(&owner, &((1_000 * UNIT) as i128));

    let id = s.core.open_position(&owner, &capped, &false);
    advance_ledger(&env, 5);
    s.core.supply_collateral(&owner, &capped, &(400 * UNIT), &id);
    advance_ledger(&env, 5);
    assert_eq!(
        s.core
            .try_supply_collateral(&owner, &capped, &(200 * UNIT), &id),
        Err(Ok(Error::AssetCapacityReached))
    );
    assert_eq!(s.core.get_total_asset_supplied(&capped), 400 * UNIT);

    // Pool-wide value cap kicks in across assets
    let mut config = default_config();
    config.pool_liquidity_cap = 450 * UNIT;
    s.core.load_protocol_config(&config);
    assert_eq!(
        s.core
            .try_supply_collateral(&owner, &capped, &(100 * UNIT), &id),
        Err(Ok(Error::PoolLiquidityLimitReached))
    );
    s.core.supply_collateral(&owner, &capped, &(50 * UNIT), &id);
    assert_eq!(s.core.get_pool_collateral_value(), 450 * UNIT);
}

#[test]
fn test_borrow_within_credit_limit() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, stable_mint) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((1_000 * UNIT) as i128));
    s.fund_vault(&env, 10_000 * UNIT);

    let id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    s.core
        .supply_collateral(&owner, &stable, &(1_000 * UNIT), &id);

    advance_ledger(&env, 5);
    s.core
        .borrow(&owner, &id, &(900 * UNIT), &(900 * UNIT), &0u32);
    assert_eq!(s.base_client.balance(&owner), (900 * UNIT) as i128);
    assert_eq!(s.core.get_user_position(&owner, &id).debt, 900 * UNIT);
    assert_eq!(s.vault.get_total_borrowed(), 900 * UNIT);

    // One more unit breaks the limit
    advance_ledger(&env, 5);
    assert_eq!(
        s.core.try_borrow(&owner, &id, &UNIT, &(900 * UNIT), &0u32),
        Err(Ok(Error::CreditLimitExceeded))
    );
}

#[test]
fn test_borrow_needs_vault_liquidity() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, stable_mint) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((1_000 * UNIT) as i128));
    s.fund_vault(&env, 100 * UNIT);

    let id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    s.core
        .supply_collateral(&owner, &stable, &(1_000 * UNIT), &id);
    advance_ledger(&env, 5);
    assert_eq!(
        s.core
            .try_borrow(&owner, &id, &(500 * UNIT), &(900 * UNIT), &0u32),
        Err(Ok(Error::LowLiquidity))
    );
}

#[test]
fn test_isolation_debt_cap_enforced() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (iso, _, iso_mint) = s.list_asset_with_caps(
        &env,
        RegistryAssetTier::Isolated,
        7_000,
        7_500,
        1,
        0,
        50 * UNIT,
    );
    iso_mint.mint(&owner, &((1_000 * UNIT) as i128));
    s.fund_vault(&env, 10_000 * UNIT);

    let id = s.core.open_position(&owner, &iso, &true);
    advance_ledger(&env, 5);
    s.core.supply_collateral(&owner, &iso, &(1_000 * UNIT), &id);

    // Credit limit would allow 700, the isolation cap stops at 50
    advance_ledger(&env, 5);
    assert_eq!(
        s.core
            .try_borrow(&owner, &id, &(60 * UNIT), &(700 * UNIT), &0u32),
        Err(Ok(Error::IsolationDebtCapExceeded))
    );
    s.core
        .borrow(&owner, &id, &(50 * UNIT), &(700 * UNIT), &0u32);
    assert_eq!(s.core.get_user_position(&owner, &id).debt, 50 * UNIT);
}

#[test]
fn test_interest_accrues_monotonically() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, stable_mint) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((2_000 * UNIT) as i128));
    s.fund_vault(&env, 10_000 * UNIT);

    let mut config = default_config();
    config.borrow_rate_scaled = 100_000; // 10% APY, stable premium is zero
    s.core.load_protocol_config(&config);

    let id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    s.core
        .supply_collateral(&owner, &stable, &(2_000 * UNIT), &id);
    advance_ledger(&env, 5);
    s.core
        .borrow(&owner, &id, &(1_000 * UNIT), &(1_800 * UNIT), &0u32);

    assert_eq!(
        s.core.calculate_debt_with_interest(&owner, &id),
        1_000 * UNIT
    );

    advance_ledger(&env, YEAR / 2);
    let half_year = s.core.calculate_debt_with_interest(&owner, &id);
    assert_eq!(half_year, 1_050 * UNIT);
    // The view commits nothing
    assert_eq!(s.core.get_user_position(&owner, &id).debt, 1_000 * UNIT);

    advance_ledger(&env, YEAR / 2);
    let full_year = s.core.calculate_debt_with_interest(&owner, &id);
    assert_eq!(full_year, 1_100 * UNIT);
    assert!(full_year > half_year);

    // A debt-changing operation commits the accrual first
    s.core
        .repay(&owner, &id, &UNIT, &(1_100 * UNIT), &0u32);
    let position = s.core.get_user_position(&owner, &id);
    assert_eq!(position.debt, 1_099 * UNIT);
    // The vault carries the mirrored interest: 1000 borrowed + 100 accrued - 1 repaid
    assert_eq!(s.vault.get_total_borrowed(), 1_099 * UNIT);
    assert_eq!(s.vault.get_total_accrued_interest(), 100 * UNIT);
}

#[test]
fn test_repay_rejects_excess_and_honors_sentinel() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, stable_mint) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((1_000 * UNIT) as i128));
    s.fund_vault(&env, 10_000 * UNIT);

    let id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    s.core
        .supply_collateral(&owner, &stable, &(1_000 * UNIT), &id);
    advance_ledger(&env, 5);
    s.core
        .borrow(&owner, &id, &(100 * UNIT), &(900 * UNIT), &0u32);

    // Over-repayment is rejected, not silently refunded
    advance_ledger(&env, 5);
    assert_eq!(
        s.core
            .try_repay(&owner, &id, &(200 * UNIT), &(100 * UNIT), &0u32),
        Err(Ok(Error::RepayExceedsDebt))
    );

    s.core
        .repay(&owner, &id, &(40 * UNIT), &(100 * UNIT), &0u32);
    assert_eq!(s.core.get_user_position(&owner, &id).debt, 60 * UNIT);

    // The sentinel clears the debt exactly
    advance_ledger(&env, 5);
    s.core
        .repay(&owner, &id, &FULL_REPAYMENT, &(60 * UNIT), &0u32);
    assert_eq!(s.core.get_user_position(&owner, &id).debt, 0u128);
    assert_eq!(s.vault.get_total_borrowed(), 0u128);

    // Nothing left to repay
    advance_ledger(&env, 5);
    assert_eq!(
        s.core.try_repay(&owner, &id, &UNIT, &0u128, &0u32),
        Err(Ok(Error::RepayExceedsDebt))
    );
}

#[test]
fn test_withdraw_keeps_debt_covered() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, stable_client, stable_mint) =
        s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((1_000 * UNIT) as i128));
    s.fund_vault(&env, 10_000 * UNIT);

    let id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    s.core
        .supply_collateral(&owner, &stable, &(1_000 * UNIT), &id);
    advance_ledger(&env, 5);
    s.core
        .borrow(&owner, &id, &(450 * UNIT), &(900 * UNIT), &0u32);

    // Withdrawing 600 would leave 400 of cover: 360 credit < 450 debt
    advance_ledger(&env, 5);
    assert_eq!(
        s.core.try_withdraw_collateral(
            &owner,
            &stable,
            &(600 * UNIT),
            &id,
            &(360 * UNIT),
            &0u32
        ),
        Err(Ok(Error::CreditLimitExceeded))
    );

    // 400 out leaves 600 of cover: 540 credit >= 450 debt
    s.core
        .withdraw_collateral(&owner, &stable, &(400 * UNIT), &id, &(540 * UNIT), &0u32);
    assert_eq!(stable_client.balance(&owner), (400 * UNIT) as i128);
    assert_eq!(
        s.core.get_collateral_amount(&owner, &id, &stable),
        600 * UNIT
    );

    // More than held is its own failure
    advance_ledger(&env, 5);
    assert_eq!(
        s.core.try_withdraw_collateral(
            &owner,
            &stable,
            &(700 * UNIT),
            &id,
            &0u128,
            &0u32
        ),
        Err(Ok(Error::InsufficientCollateral))
    );
}

#[test]
fn test_exit_position_clears_everything() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, stable_client, stable_mint) =
        s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((500 * UNIT) as i128));
    s.fund_vault(&env, 10_000 * UNIT);

    let id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    s.core
        .supply_collateral(&owner, &stable, &(500 * UNIT), &id);
    advance_ledger(&env, 5);
    s.core
        .borrow(&owner, &id, &(100 * UNIT), &(450 * UNIT), &0u32);

    advance_ledger(&env, 5);
    s.core
        .exit_position(&owner, &id, &(100 * UNIT), &0u32);

    let position = s.core.get_user_position(&owner, &id);
    assert_eq!(position.status, PositionStatus::Closed);
    assert_eq!(position.debt, 0u128);
    assert_eq!(s.core.get_collateral_amount(&owner, &id, &stable), 0u128);
    assert_eq!(
        s.core.get_position_collateral_assets(&owner, &id).len(),
        0
    );
    assert_eq!(stable_client.balance(&owner), (500 * UNIT) as i128);
    assert_eq!(s.vault.get_total_borrowed(), 0u128);

    // A closed position is frozen
    advance_ledger(&env, 5);
    assert_eq!(
        s.core
            .try_supply_collateral(&owner, &stable, &UNIT, &id),
        Err(Ok(Error::PositionNotActive))
    );
    assert_eq!(
        s.core.try_borrow(&owner, &id, &UNIT, &0u128, &0u32),
        Err(Ok(Error::PositionNotActive))
    );
}

#[test]
fn test_health_factor_sentinel_and_threshold() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, stable_mint) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((1_000 * UNIT) as i128));
    s.fund_vault(&env, 10_000 * UNIT);

    let id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    s.core
        .supply_collateral(&owner, &stable, &(1_000 * UNIT), &id);

    // Debt-free positions sit at the sentinel maximum
    assert_eq!(s.core.health_factor(&owner, &id), u128::MAX);
    assert!(!s.core.is_liquidatable(&owner, &id));

    advance_ledger(&env, 5);
    s.core
        .borrow(&owner, &id, &(900 * UNIT), &(900 * UNIT), &0u32);
    // liquidation level 950 against debt 900
    assert_eq!(s.core.health_factor(&owner, &id), 1_055_555u128);
    assert!(!s.core.is_liquidatable(&owner, &id));

    // A 10% price drop pushes the level to 855 under the 900 debt
    s.registry.set_price(&stable, &(9 * UNIT / 10));
    assert_eq!(s.core.health_factor(&owner, &id), 950_000u128);
    assert!(s.core.is_liquidatable(&owner, &id));
}

#[test]
fn test_liquidation_settles_whole_position() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let liquidator = Address::generate(&env);
    let (stable, stable_client, stable_mint) =
        s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((1_000 * UNIT) as i128));
    s.base_admin.mint(&liquidator, &((1_000 * UNIT) as i128));
    s.fund_vault(&env, 10_000 * UNIT);

    let id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    s.core
        .supply_collateral(&owner, &stable, &(1_000 * UNIT), &id);
    advance_ledger(&env, 5);
    s.core
        .borrow(&owner, &id, &(900 * UNIT), &(900 * UNIT), &0u32);

    // Healthy positions cannot be touched
    advance_ledger(&env, 5);
    let healthy_due = 905 * UNIT;
    assert_eq!(
        s.core
            .try_liquidate(&liquidator, &owner, &id, &healthy_due, &0u32),
        Err(Ok(Error::NotLiquidatable))
    );

    s.registry.set_price(&stable, &(9 * UNIT / 10));
    let debt = 900 * UNIT;
    let fee = debt * 50 / 10_000; // stable tier, 50 bps
    let total_due = debt + fee;

    // Eligibility stake comes first
    assert_eq!(
        s.core
            .try_liquidate(&liquidator, &owner, &id, &total_due, &0u32),
        Err(Ok(Error::NotEnoughGovernanceTokens))
    );
    s.gov.mint(&liquidator, &((100 * UNIT) as i128));

    // A quote below the real total is slippage
    assert_eq!(
        s.core
            .try_liquidate(&liquidator, &owner, &id, &debt, &0u32),
        Err(Ok(Error::MEVSlippageExceeded))
    );

    let vault_base_before = s.vault.get_total_base();
    s.core
        .liquidate(&liquidator, &owner, &id, &total_due, &0u32);

    // Whole debt cleared, all collateral seized, fee lands as vault profit
    let position = s.core.get_user_position(&owner, &id);
    assert_eq!(position.status, PositionStatus::Liquidated);
    assert_eq!(position.debt, 0u128);
    assert_eq!(stable_client.balance(&liquidator), (1_000 * UNIT) as i128);
    assert_eq!(
        s.base_client.balance(&liquidator),
        (1_000 * UNIT) as i128 - total_due as i128
    );
    assert_eq!(s.vault.get_total_borrowed(), 0u128);
    assert_eq!(s.vault.get_total_base(), vault_base_before + fee);
    assert_eq!(s.core.get_total_asset_supplied(&stable), 0u128);

    // Liquidating the same position again fails
    advance_ledger(&env, 5);
    assert_eq!(
        s.core
            .try_liquidate(&liquidator, &owner, &id, &total_due, &0u32),
        Err(Ok(Error::NotLiquidatable))
    );
}

#[test]
fn test_same_sequence_second_op_rejected() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, stable_mint) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((100 * UNIT) as i128));

    let id = s.core.open_position(&owner, &stable, &false);
    // Same account, same ledger sequence: rejected
    assert_eq!(
        s.core
            .try_supply_collateral(&owner, &stable, &(50 * UNIT), &id),
        Err(Ok(Error::MEVSameBlockOperation))
    );
    // Next sequence goes through
    advance_ledger(&env, 5);
    s.core.supply_collateral(&owner, &stable, &(50 * UNIT), &id);
}

#[test]
fn test_borrow_quote_slippage() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, stable_mint) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((1_000 * UNIT) as i128));
    s.fund_vault(&env, 10_000 * UNIT);

    let id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    s.core
        .supply_collateral(&owner, &stable, &(1_000 * UNIT), &id);

    // Credit limit is 900; a 1% band around a quote of 600 cannot absorb it
    advance_ledger(&env, 5);
    assert_eq!(
        s.core
            .try_borrow(&owner, &id, &(100 * UNIT), &(600 * UNIT), &100u32),
        Err(Ok(Error::MEVSlippageExceeded))
    );
    // A 2% band around 890 admits the actual 900
    s.core
        .borrow(&owner, &id, &(100 * UNIT), &(890 * UNIT), &200u32);
}

#[test]
fn test_protocol_stays_collateralized() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, stable_mint) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((1_000 * UNIT) as i128));
    s.fund_vault(&env, 10_000 * UNIT);

    assert!(s.core.is_collateralized());

    let id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    s.core
        .supply_collateral(&owner, &stable, &(1_000 * UNIT), &id);
    advance_ledger(&env, 5);
    s.core
        .borrow(&owner, &id, &(900 * UNIT), &(900 * UNIT), &0u32);
    assert!(s.core.is_collateralized());

    // Collateral value halves: 500 of cover against 900 lent out
    s.registry.set_price(&stable, &(UNIT / 2));
    assert!(!s.core.is_collateralized());
}

#[test]
fn test_stale_price_is_a_hard_failure() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, stable_mint) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((100 * UNIT) as i128));

    let id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    s.core.supply_collateral(&owner, &stable, &(100 * UNIT), &id);

    s.registry.set_max_price_age(&3_600u64);
    advance_ledger(&env, 7_200);
    assert_eq!(
        s.core.try_calculate_limits(&owner, &id),
        Err(Ok(Error::PriceUnavailable))
    );

    // A fresh quote restores the view
    s.registry.set_price(&stable, &UNIT);
    assert_eq!(
        s.core.calculate_limits(&owner, &id).2,
        100 * UNIT
    );
}

#[test]
fn test_tier_rates_carry_risk_premiums() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);

    let mut config = default_config();
    config.borrow_rate_scaled = 100_000;
    s.core.load_protocol_config(&config);

    assert_eq!(s.core.get_borrow_rate(&AssetTier::Stable), 100_000u128);
    assert_eq!(s.core.get_borrow_rate(&AssetTier::CrossA), 120_000u128);
    assert_eq!(s.core.get_borrow_rate(&AssetTier::CrossB), 150_000u128);
    assert_eq!(s.core.get_borrow_rate(&AssetTier::Isolated), 200_000u128);
}

#[test]
fn test_rate_model_drives_utilization_sensitivity() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, stable_mint) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((2_000 * UNIT) as i128));
    s.fund_vault(&env, 1_000 * UNIT);

    let model_id = env.register(RateModel, ());
    let model = RateModelClient::new(&env, &model_id);
    model.initialize(
        &20_000u128,
        &180_000u128,
        &4_000_000u128,
        &800_000u128,
        &s.admin,
    );
    s.core.set_rate_model(&model_id);

    let idle_rate = s.core.get_borrow_rate(&AssetTier::Stable);
    assert_eq!(idle_rate, 20_000u128);

    let id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    s.core
        .supply_collateral(&owner, &stable, &(2_000 * UNIT), &id);
    advance_ledger(&env, 5);
    s.core
        .borrow(&owner, &id, &(500 * UNIT), &(1_800 * UNIT), &0u32);

    // Half the pool lent out: 20_000 + 0.5 * 180_000
    let busy_rate = s.core.get_borrow_rate(&AssetTier::Stable);
    assert_eq!(busy_rate, 110_000u128);
    assert!(busy_rate > idle_rate);
    assert_eq!(
        s.core.get_borrow_rate(&AssetTier::CrossA),
        busy_rate + 20_000
    );
}

#[test]
fn test_debt_view_does_not_mutate_state() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let owner = Address::generate(&env);
    let (stable, _, stable_mint) = s.list_asset(&env, RegistryAssetTier::Stable, 9_000, 9_500, 1);
    stable_mint.mint(&owner, &((1_000 * UNIT) as i128));
    s.fund_vault(&env, 10_000 * UNIT);

    let mut config = default_config();
    config.borrow_rate_scaled = 100_000;
    s.core.load_protocol_config(&config);

    let id = s.core.open_position(&owner, &stable, &false);
    advance_ledger(&env, 5);
    s.core
        .supply_collateral(&owner, &stable, &(1_000 * UNIT), &id);
    advance_ledger(&env, 5);
    s.core
        .borrow(&owner, &id, &(100 * UNIT), &(900 * UNIT), &0u32);
    let accrual_stamp = s.core.get_user_position(&owner, &id).last_interest_accrual;

    advance_ledger(&env, YEAR);
    let first = s.core.calculate_debt_with_interest(&owner, &id);
    let second = s.core.calculate_debt_with_interest(&owner, &id);
    assert_eq!(first, second);
    assert_eq!(first, 110 * UNIT);
    let position = s.core.get_user_position(&owner, &id);
    assert_eq!(position.debt, 100 * UNIT);
    assert_eq!(position.last_interest_accrual, accrual_stamp);
}
