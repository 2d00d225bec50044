use soroban_sdk::{
    contract, contractimpl, panic_with_error, token, Address, BytesN, Env, Vec,
};

use crate::constants::*;
use crate::credit;
use crate::errors::Error;
use crate::events::*;
use crate::helpers::*;
use crate::interest;
use crate::storage::*;

#[contract]
pub struct LendingCore;

#[contractimpl]
impl LendingCore {
    /// Wire the core to its collaborators: the external asset registry, the
    /// liquidity vault it draws funds from, and the governance token whose
    /// balance gates liquidation.
    pub fn initialize(
        env: Env,
        admin: Address,
        asset_registry: Address,
        vault: Address,
        governance_token: Address,
    ) {
        let storage = env.storage().persistent();
        if storage
            .get::<_, bool>(&DataKey::Initialized)
            .unwrap_or(false)
        {
            panic_with_error!(&env, Error::AlreadyInitialized);
        }
        admin.require_auth();
        storage.set(&DataKey::Initialized, &true);
        storage.set(&DataKey::Admin, &admin);
        storage.set(&DataKey::AssetRegistry, &asset_registry);
        storage.set(&DataKey::Vault, &vault);
        storage.set(&DataKey::GovernanceToken, &governance_token);
        storage.set(&DataKey::PoolCollateralValue, &0u128);
        bump_core_ttl(&env);
    }

    /// Admin: load the protocol configuration. Out-of-bounds values are
    /// rejected outright, never clamped. Fee parameters are pushed down to
    /// the vault in the same atomic step.
    pub fn load_protocol_config(env: Env, config: ProtocolConfig) {
        ensure_initialized(&env);
        require_admin(&env);
        if config.profit_target_rate_scaled > MAX_PROFIT_TARGET_SCALED
            || config.borrow_rate_scaled > MAX_YEARLY_RATE_SCALED
            || config.reward_rate_scaled > MAX_YEARLY_RATE_SCALED
            || config.liquidator_threshold < 0
            || config.flash_loan_fee_bps > MAX_FLASH_LOAN_FEE_BPS
        {
            panic_with_error!(&env, Error::InvalidConfig);
        }
        env.storage().persistent().set(&DataKey::Config, &config);
        vault_client(&env).set_fees(
            &config.flash_loan_fee_bps,
            &config.profit_target_rate_scaled,
        );
        ProtocolConfigUpdated {
            borrow_rate_scaled: config.borrow_rate_scaled,
            profit_target_rate_scaled: config.profit_target_rate_scaled,
            liquidator_threshold: config.liquidator_threshold,
            flash_loan_fee_bps: config.flash_loan_fee_bps,
        }
        .publish(&env);
    }

    /// Admin: wire a borrow-rate strategy contract. The target's interface
    /// is probed before it is accepted.
    pub fn set_rate_model(env: Env, model: Address) {
        ensure_initialized(&env);
        require_admin(&env);
        let _ = RateModelClient::new(&env, &model).get_borrow_rate(&0u128, &0u128);
        env.storage().persistent().set(&DataKey::RateModel, &model);
        NewRateModel { model }.publish(&env);
    }

    /// Admin: transfer admin to new address.
    pub fn set_admin(env: Env, new_admin: Address) {
        ensure_initialized(&env);
        require_admin(&env);
        env.storage().persistent().set(&DataKey::Admin, &new_admin);
        NewAdmin { admin: new_admin }.publish(&env);
    }

    /// Admin: upgrade contract code.
    pub fn upgrade_wasm(env: Env, new_wasm_hash: BytesN<32>) {
        ensure_initialized(&env);
        require_admin(&env);
        env.deployer().update_current_contract_wasm(new_wasm_hash);
    }

    /// Open a fresh position for `owner`. The seed asset fixes the tier
    /// discipline up front: isolated positions take isolated-tier assets
    /// only, cross positions never do.
    pub fn open_position(env: Env, owner: Address, asset: Address, isolated: bool) -> u32 {
        ensure_initialized(&env);
        owner.require_auth();
        mev_guard(&env, &owner);
        let config = get_asset_config_or_panic(&env, &asset);
        if isolated && config.tier != AssetTier::Isolated {
            panic_with_error!(&env, Error::InvalidAssetForIsolation);
        }
        if !isolated && config.tier == AssetTier::Isolated {
            panic_with_error!(&env, Error::IsolatedAssetViolation);
        }
        let count = position_count(&env, &owner);
        if count >= MAX_USER_POSITIONS {
            panic_with_error!(&env, Error::TooManyPositions);
        }
        let position = Position {
            index: count,
            isolated,
            status: PositionStatus::Active,
            debt: 0,
            last_interest_accrual: env.ledger().timestamp(),
        };
        save_position(&env, &owner, &position);
        env.storage()
            .persistent()
            .set(&DataKey::PositionCount(owner.clone()), &(count + 1));
        PositionOpened {
            owner,
            position_id: count,
            isolated,
        }
        .publish(&env);
        count
    }

    /// Move collateral from the owner into position custody.
    pub fn supply_collateral(
        env: Env,
        owner: Address,
        asset: Address,
        amount: u128,
        position_id: u32,
    ) {
        ensure_initialized(&env);
        owner.require_auth();
        mev_guard(&env, &owner);
        if amount == 0 {
            panic_with_error!(&env, Error::ZeroAmount);
        }
        let position = get_active_position_or_panic(&env, &owner, position_id);
        let config = get_asset_config_or_panic(&env, &asset);

        if position.isolated {
            if config.tier != AssetTier::Isolated {
                panic_with_error!(&env, Error::InvalidAssetForIsolation);
            }
            let held = position_assets(&env, &owner, position_id);
            if let Some(existing) = held.first() {
                if existing != asset {
                    panic_with_error!(&env, Error::InvalidAssetForIsolation);
                }
            }
        } else if config.tier == AssetTier::Isolated {
            panic_with_error!(&env, Error::IsolatedAssetViolation);
        }

        let supplied = total_asset_supplied(&env, &asset);
        if config.max_supply_threshold > 0
            && supplied.saturating_add(amount) > config.max_supply_threshold
        {
            panic_with_error!(&env, Error::AssetCapacityReached);
        }

        let price = get_price_or_panic(&env, &asset);
        let value = credit::asset_value(&env, amount, &config, &price);
        let pool_value = pool_collateral_value(&env);
        if let Some(cap) = Self::pool_cap(&env) {
            if cap > 0 && pool_value.saturating_add(value) > cap {
                panic_with_error!(&env, Error::PoolLiquidityLimitReached);
            }
        }

        let token_client = token::Client::new(&env, &asset);
        token_client.transfer(
            &owner,
            &env.current_contract_address(),
            &to_i128(&env, amount),
        );

        let held_amount = collateral_amount(&env, &owner, position_id, &asset);
        set_collateral_amount(
            &env,
            &owner,
            position_id,
            &asset,
            held_amount.saturating_add(amount),
        );
        set_total_asset_supplied(&env, &asset, supplied.saturating_add(amount));
        set_pool_collateral_value(&env, pool_value.saturating_add(value));
        remember_asset(&env, &asset);

        CollateralSupplied {
            owner,
            asset,
            position_id,
            amount,
        }
        .publish(&env);
    }

    /// Release collateral back to the owner, provided the remaining basket
    /// still covers the debt at borrow thresholds.
    pub fn withdraw_collateral(
        env: Env,
        owner: Address,
        asset: Address,
        amount: u128,
        position_id: u32,
        expected_credit_limit: u128,
        max_slippage_bps: u32,
    ) {
        ensure_initialized(&env);
        owner.require_auth();
        mev_guard(&env, &owner);
        if amount == 0 {
            panic_with_error!(&env, Error::ZeroAmount);
        }
        let mut position = get_active_position_or_panic(&env, &owner, position_id);
        let held = collateral_amount(&env, &owner, position_id, &asset);
        if amount > held {
            panic_with_error!(&env, Error::InsufficientCollateral);
        }

        interest::accrue(&env, &owner, &mut position);
        save_position(&env, &owner, &position);

        let config = get_asset_config_or_panic(&env, &asset);
        let price = get_price_or_panic(&env, &asset);
        let value_withdrawn = credit::asset_value(&env, amount, &config, &price);

        // Mutate first, validate after: the whole invocation rolls back on
        // failure, so the hypothetical state never leaks.
        set_collateral_amount(&env, &owner, position_id, &asset, held - amount);
        let (credit_limit, _, _) = credit::calculate_limits(&env, &owner, position_id);
        if position.debt > credit_limit {
            panic_with_error!(&env, Error::CreditLimitExceeded);
        }
        check_slippage(&env, expected_credit_limit, credit_limit, max_slippage_bps);

        set_total_asset_supplied(
            &env,
            &asset,
            total_asset_supplied(&env, &asset).saturating_sub(amount),
        );
        set_pool_collateral_value(
            &env,
            pool_collateral_value(&env).saturating_sub(value_withdrawn),
        );

        let token_client = token::Client::new(&env, &asset);
        token_client.transfer(
            &env.current_contract_address(),
            &owner,
            &to_i128(&env, amount),
        );

        CollateralWithdrawn {
            owner,
            asset,
            position_id,
            amount,
        }
        .publish(&env);
    }

    /// Draw funds from the vault against the position's credit limit.
    /// Existing debt accrues before the new principal is added.
    pub fn borrow(
        env: Env,
        owner: Address,
        position_id: u32,
        amount: u128,
        expected_credit_limit: u128,
        max_slippage_bps: u32,
    ) {
        ensure_initialized(&env);
        owner.require_auth();
        mev_guard(&env, &owner);
        if amount == 0 {
            panic_with_error!(&env, Error::ZeroAmount);
        }
        let mut position = get_active_position_or_panic(&env, &owner, position_id);
        interest::accrue(&env, &owner, &mut position);

        let (credit_limit, _, _) = credit::calculate_limits(&env, &owner, position_id);
        let new_debt = match position.debt.checked_add(amount) {
            Some(debt) => debt,
            None => panic_with_error!(&env, Error::AmountOverflow),
        };
        if new_debt > credit_limit {
            panic_with_error!(&env, Error::CreditLimitExceeded);
        }
        if position.isolated {
            let assets = position_assets(&env, &owner, position_id);
            if let Some(asset) = assets.first() {
                let cap = get_asset_config_or_panic(&env, &asset).isolation_debt_cap;
                if cap > 0 && new_debt > cap {
                    panic_with_error!(&env, Error::IsolationDebtCapExceeded);
                }
            }
        }
        check_slippage(&env, expected_credit_limit, credit_limit, max_slippage_bps);

        let vault = vault_client(&env);
        if amount > vault.get_available_liquidity() {
            panic_with_error!(&env, Error::LowLiquidity);
        }

        position.debt = new_debt;
        save_position(&env, &owner, &position);
        vault.borrow(&amount, &owner);

        Borrowed {
            owner,
            position_id,
            amount,
            debt: new_debt,
        }
        .publish(&env);
    }

    /// Settle debt. The sentinel `u128::MAX` clears the whole debt; any
    /// other amount above the current debt is rejected, not refunded.
    pub fn repay(
        env: Env,
        owner: Address,
        position_id: u32,
        amount: u128,
        expected_debt: u128,
        max_slippage_bps: u32,
    ) {
        ensure_initialized(&env);
        owner.require_auth();
        mev_guard(&env, &owner);
        if amount == 0 {
            panic_with_error!(&env, Error::ZeroAmount);
        }
        let mut position = get_active_position_or_panic(&env, &owner, position_id);
        interest::accrue(&env, &owner, &mut position);

        let debt = position.debt;
        if debt == 0 {
            panic_with_error!(&env, Error::RepayExceedsDebt);
        }
        let actual = if amount == FULL_REPAYMENT {
            debt
        } else if amount > debt {
            panic_with_error!(&env, Error::RepayExceedsDebt);
        } else {
            amount
        };
        check_slippage(&env, expected_debt, debt, max_slippage_bps);

        vault_client(&env).repay(&actual, &owner);
        position.debt = debt - actual;
        save_position(&env, &owner, &position);

        Repaid {
            owner,
            position_id,
            amount: actual,
            debt: debt - actual,
        }
        .publish(&env);
    }

    /// Full repay plus full withdrawal of every held asset; the position
    /// ends Closed and stays frozen.
    pub fn exit_position(
        env: Env,
        owner: Address,
        position_id: u32,
        expected_debt: u128,
        max_slippage_bps: u32,
    ) {
        ensure_initialized(&env);
        owner.require_auth();
        mev_guard(&env, &owner);
        let mut position = get_active_position_or_panic(&env, &owner, position_id);
        interest::accrue(&env, &owner, &mut position);

        check_slippage(&env, expected_debt, position.debt, max_slippage_bps);
        if position.debt > 0 {
            let debt = position.debt;
            vault_client(&env).repay(&debt, &owner);
            position.debt = 0;
            Repaid {
                owner: owner.clone(),
                position_id,
                amount: debt,
                debt: 0,
            }
            .publish(&env);
        }

        Self::release_all_collateral(&env, &owner, position_id, &owner);

        position.status = PositionStatus::Closed;
        save_position(&env, &owner, &position);
        PositionClosed { owner, position_id }.publish(&env);
    }

    /// Clear an unhealthy position in one atomic step: the liquidator pays
    /// the whole debt plus the tier fee into the vault and takes all of the
    /// collateral. Partial liquidation does not exist.
    pub fn liquidate(
        env: Env,
        liquidator: Address,
        owner: Address,
        position_id: u32,
        max_repay_amount: u128,
        max_slippage_bps: u32,
    ) {
        ensure_initialized(&env);
        liquidator.require_auth();
        mev_guard(&env, &liquidator);
        let mut position = get_position_or_panic(&env, &owner, position_id);
        if position.status != PositionStatus::Active {
            panic_with_error!(&env, Error::NotLiquidatable);
        }
        interest::accrue(&env, &owner, &mut position);

        let (_, liquidation_level, _) = credit::calculate_limits(&env, &owner, position_id);
        let debt = position.debt;
        if debt == 0 || liquidation_level >= debt {
            panic_with_error!(&env, Error::NotLiquidatable);
        }

        let config = protocol_config(&env);
        let stake = governance_token_client(&env).balance_of(&liquidator);
        if stake < config.liquidator_threshold {
            panic_with_error!(&env, Error::NotEnoughGovernanceTokens);
        }

        let tier = credit::position_tier(&env, &owner, position_id);
        let fee = debt.saturating_mul(Self::liquidation_fee_bps(tier) as u128) / BPS_SCALE;
        let total_due = debt.saturating_add(fee);
        let allowed = max_repay_amount
            .saturating_add(max_repay_amount.saturating_mul(max_slippage_bps as u128) / BPS_SCALE);
        if total_due > allowed {
            panic_with_error!(&env, Error::MEVSlippageExceeded);
        }

        let vault = vault_client(&env);
        vault.repay(&debt, &liquidator);
        if fee > 0 {
            vault.boost_yield(&liquidator, &fee);
        }

        Self::release_all_collateral(&env, &owner, position_id, &liquidator);

        position.debt = 0;
        position.status = PositionStatus::Liquidated;
        save_position(&env, &owner, &position);

        PositionLiquidated {
            owner,
            liquidator,
            position_id,
            debt_repaid: debt,
            fee,
        }
        .publish(&env);
    }

    // --- views ---

    pub fn calculate_credit_limit(env: Env, owner: Address, position_id: u32) -> u128 {
        ensure_initialized(&env);
        credit::calculate_limits(&env, &owner, position_id).0
    }

    pub fn calculate_limits(env: Env, owner: Address, position_id: u32) -> (u128, u128, u128) {
        ensure_initialized(&env);
        credit::calculate_limits(&env, &owner, position_id)
    }

    /// Principal plus accrued interest, without committing the accrual.
    pub fn calculate_debt_with_interest(env: Env, owner: Address, position_id: u32) -> u128 {
        ensure_initialized(&env);
        interest::debt_with_interest(&env, &owner, position_id)
    }

    /// liquidation_level * 1e6 / debt, saturating to u128::MAX at zero debt.
    pub fn health_factor(env: Env, owner: Address, position_id: u32) -> u128 {
        ensure_initialized(&env);
        let debt = interest::debt_with_interest(&env, &owner, position_id);
        if debt == 0 {
            return u128::MAX;
        }
        let (_, liquidation_level, _) = credit::calculate_limits(&env, &owner, position_id);
        liquidation_level.saturating_mul(SCALE_1E6) / debt
    }

    pub fn is_liquidatable(env: Env, owner: Address, position_id: u32) -> bool {
        Self::health_factor(env, owner, position_id) < SCALE_1E6
    }

    pub fn get_position_collateral_assets(
        env: Env,
        owner: Address,
        position_id: u32,
    ) -> Vec<Address> {
        ensure_initialized(&env);
        let _ = get_position_or_panic(&env, &owner, position_id);
        position_assets(&env, &owner, position_id)
    }

    pub fn get_collateral_amount(
        env: Env,
        owner: Address,
        position_id: u32,
        asset: Address,
    ) -> u128 {
        ensure_initialized(&env);
        let _ = get_position_or_panic(&env, &owner, position_id);
        collateral_amount(&env, &owner, position_id, &asset)
    }

    pub fn get_user_position(env: Env, owner: Address, position_id: u32) -> Position {
        ensure_initialized(&env);
        get_position_or_panic(&env, &owner, position_id)
    }

    pub fn get_user_positions(env: Env, owner: Address) -> Vec<Position> {
        ensure_initialized(&env);
        let mut positions = Vec::new(&env);
        let count = position_count(&env, &owner);
        for id in 0..count {
            positions.push_back(get_position_or_panic(&env, &owner, id));
        }
        positions
    }

    pub fn get_position_count(env: Env, owner: Address) -> u32 {
        ensure_initialized(&env);
        position_count(&env, &owner)
    }

    pub fn get_borrow_rate(env: Env, tier: AssetTier) -> u128 {
        ensure_initialized(&env);
        interest::borrow_rate_for_tier(&env, tier)
    }

    /// Protocol-wide solvency: the value of everything custodied covers
    /// everything lent out.
    pub fn is_collateralized(env: Env) -> bool {
        ensure_initialized(&env);
        let mut total_value = 0u128;
        for asset in known_assets(&env).iter() {
            let amount = total_asset_supplied(&env, &asset);
            if amount == 0 {
                continue;
            }
            let config = get_asset_config_or_panic(&env, &asset);
            let price = get_price_or_panic(&env, &asset);
            total_value =
                total_value.saturating_add(credit::asset_value(&env, amount, &config, &price));
        }
        total_value >= vault_client(&env).get_total_borrowed()
    }

    pub fn get_total_asset_supplied(env: Env, asset: Address) -> u128 {
        ensure_initialized(&env);
        total_asset_supplied(&env, &asset)
    }

    pub fn get_pool_collateral_value(env: Env) -> u128 {
        ensure_initialized(&env);
        pool_collateral_value(&env)
    }

    pub fn get_protocol_config(env: Env) -> ProtocolConfig {
        ensure_initialized(&env);
        protocol_config(&env)
    }

    pub fn get_admin(env: Env) -> Address {
        ensure_initialized(&env);
        env.storage()
            .persistent()
            .get(&DataKey::Admin)
            .expect("admin not set")
    }

    // --- internal ---

    fn pool_cap(env: &Env) -> Option<u128> {
        env.storage()
            .persistent()
            .get::<_, ProtocolConfig>(&DataKey::Config)
            .map(|config| config.pool_liquidity_cap)
    }

    fn liquidation_fee_bps(tier: AssetTier) -> u32 {
        match tier {
            AssetTier::Stable => STABLE_LIQUIDATION_FEE_BPS,
            AssetTier::CrossA => CROSS_A_LIQUIDATION_FEE_BPS,
            AssetTier::CrossB => CROSS_B_LIQUIDATION_FEE_BPS,
            AssetTier::Isolated => ISOLATED_LIQUIDATION_FEE_BPS,
        }
    }

    /// Transfer every held asset to `recipient` and zero the records,
    /// keeping the per-asset and pool-wide totals in step.
    fn release_all_collateral(env: &Env, owner: &Address, position_id: u32, recipient: &Address) {
        let assets = position_assets(env, owner, position_id);
        for asset in assets.iter() {
            let amount = collateral_amount(env, owner, position_id, &asset);
            if amount == 0 {
                continue;
            }
            let config = get_asset_config_or_panic(env, &asset);
            let price = get_price_or_panic(env, &asset);
            let value = credit::asset_value(env, amount, &config, &price);

            set_collateral_amount(env, owner, position_id, &asset, 0);
            set_total_asset_supplied(
                env,
                &asset,
                total_asset_supplied(env, &asset).saturating_sub(amount),
            );
            set_pool_collateral_value(env, pool_collateral_value(env).saturating_sub(value));

            let token_client = token::Client::new(env, &asset);
            token_client.transfer(
                &env.current_contract_address(),
                recipient,
                &to_i128(env, amount),
            );
        }
    }
}
