use soroban_sdk::{
    contract, contractimpl, panic_with_error, token, Address, Bytes, Env, String,
};
use stellar_tokens::fungible::burnable::emit_burn;
use stellar_tokens::fungible::Base as TokenBase;

use crate::constants::*;
use crate::errors::Error;
use crate::events::*;
use crate::helpers::*;
use crate::storage::*;

#[contract]
pub struct LiquidityVault;

#[contractimpl]
impl LiquidityVault {
    /// Initialize the pool for one underlying asset. The profit target is
    /// the protocol's cut of realized supplier yield (scaled 1e6); the flash
    /// loan fee is quoted in basis points of principal.
    pub fn initialize(
        env: Env,
        token_address: Address,
        admin: Address,
        fee_recipient: Address,
        profit_target_rate_scaled: u128,
        flash_loan_fee_bps: u32,
    ) {
        let storage = env.storage().persistent();
        if storage
            .get::<_, bool>(&DataKey::Initialized)
            .unwrap_or(false)
        {
            panic_with_error!(&env, Error::AlreadyInitialized);
        }
        admin.require_auth();
        if profit_target_rate_scaled > MAX_PROFIT_TARGET_SCALED {
            panic_with_error!(&env, Error::InvalidConfig);
        }
        if flash_loan_fee_bps > MAX_FLASH_LOAN_FEE_BPS {
            panic_with_error!(&env, Error::InvalidConfig);
        }
        storage.set(&DataKey::Initialized, &true);
        storage.set(&DataKey::UnderlyingToken, &token_address);
        storage.set(&DataKey::Admin, &admin);
        storage.set(&DataKey::FeeRecipient, &fee_recipient);
        storage.set(&DataKey::TotalBase, &0u128);
        storage.set(&DataKey::TotalBorrowed, &0u128);
        storage.set(&DataKey::TotalSuppliedLiquidity, &0u128);
        storage.set(&DataKey::TotalAccruedInterest, &0u128);
        storage.set(&DataKey::ProfitTargetRateScaled, &profit_target_rate_scaled);
        storage.set(&DataKey::FlashLoanFeeBps, &flash_loan_fee_bps);
        storage.set(&DataKey::GenesisSharePrice, &SCALE_1E6);
        storage.set(&DataKey::GenesisTime, &env.ledger().timestamp());

        TokenBase::set_metadata(
            &env,
            SHARE_DECIMALS,
            String::from_str(&env, "Citrine Liquidity Share"),
            String::from_str(&env, "cLQS"),
        );
    }

    /// Admin: wire the lending core allowed to call the privileged surface.
    pub fn set_core(env: Env, core: Address) {
        ensure_initialized(&env);
        require_admin(&env);
        env.storage().persistent().set(&DataKey::Core, &core);
        NewCore { core }.publish(&env);
    }

    /// Admin: change the commission share recipient.
    pub fn set_fee_recipient(env: Env, recipient: Address) {
        ensure_initialized(&env);
        require_admin(&env);
        env.storage()
            .persistent()
            .set(&DataKey::FeeRecipient, &recipient);
        NewFeeRecipient { recipient }.publish(&env);
    }

    /// Admin: transfer admin to new address.
    pub fn set_admin(env: Env, new_admin: Address) {
        ensure_initialized(&env);
        require_admin(&env);
        env.storage().persistent().set(&DataKey::Admin, &new_admin);
        NewAdmin { admin: new_admin }.publish(&env);
    }

    /// Admin: upgrade contract code.
    pub fn upgrade_wasm(env: Env, new_wasm_hash: soroban_sdk::BytesN<32>) {
        ensure_initialized(&env);
        require_admin(&env);
        env.deployer().update_current_contract_wasm(new_wasm_hash);
    }

    /// Core-only: fee parameters pushed down with the protocol config.
    /// Rejected, never clamped, outside the sane bounds.
    pub fn set_fees(env: Env, flash_loan_fee_bps: u32, profit_target_rate_scaled: u128) {
        ensure_initialized(&env);
        require_core(&env);
        if profit_target_rate_scaled > MAX_PROFIT_TARGET_SCALED
            || flash_loan_fee_bps > MAX_FLASH_LOAN_FEE_BPS
        {
            panic_with_error!(&env, Error::InvalidConfig);
        }
        env.storage()
            .persistent()
            .set(&DataKey::FlashLoanFeeBps, &flash_loan_fee_bps);
        env.storage()
            .persistent()
            .set(&DataKey::ProfitTargetRateScaled, &profit_target_rate_scaled);
        FeesUpdated {
            flash_loan_fee_bps,
            profit_target_rate: profit_target_rate_scaled,
        }
        .publish(&env);
    }

    /// Deposit assets, receive pool shares (rounded down).
    pub fn deposit_liquidity(
        env: Env,
        supplier: Address,
        amount: u128,
        expected_shares: u128,
        max_slippage_bps: u32,
    ) -> u128 {
        let token_address = ensure_initialized(&env);
        supplier.require_auth();
        mev_guard(&env, &supplier);
        bump_pool_state_ttl(&env);
        if amount == 0 {
            panic_with_error!(&env, Error::ZeroAmount);
        }

        let total_shares = total_shares_supply(&env);
        let base = total_base(&env);
        let shares = if total_shares == 0 {
            amount
        } else {
            mul_div_floor(&env, amount, total_shares, base)
        };
        if shares == 0 {
            panic_with_error!(&env, Error::AmountBelowMinimum);
        }
        check_slippage(&env, expected_shares, shares, max_slippage_bps);

        let token_client = token::Client::new(&env, &token_address);
        token_client.transfer(
            &supplier,
            &env.current_contract_address(),
            &to_i128(&env, amount),
        );

        TokenBase::mint(&env, &supplier, to_i128(&env, shares));
        set_total_base(&env, base.saturating_add(amount));
        set_total_supplied_liquidity(
            &env,
            total_supplied_liquidity(&env).saturating_add(amount),
        );
        set_user_principal(
            &env,
            &supplier,
            user_principal(&env, &supplier).saturating_add(amount),
        );

        LiquidityDeposited {
            supplier,
            amount,
            shares,
        }
        .publish(&env);
        shares
    }

    /// Mint an exact number of shares, pulling the assets needed (rounded up).
    pub fn mint_shares(
        env: Env,
        supplier: Address,
        shares: u128,
        expected_amount: u128,
        max_slippage_bps: u32,
    ) -> u128 {
        let token_address = ensure_initialized(&env);
        supplier.require_auth();
        mev_guard(&env, &supplier);
        bump_pool_state_ttl(&env);
        if shares == 0 {
            panic_with_error!(&env, Error::ZeroAmount);
        }

        let total_shares = total_shares_supply(&env);
        let base = total_base(&env);
        let amount = if total_shares == 0 {
            shares
        } else {
            mul_div_ceil(&env, shares, base, total_shares)
        };
        if amount == 0 {
            panic_with_error!(&env, Error::AmountBelowMinimum);
        }
        check_slippage(&env, expected_amount, amount, max_slippage_bps);

        let token_client = token::Client::new(&env, &token_address);
        token_client.transfer(
            &supplier,
            &env.current_contract_address(),
            &to_i128(&env, amount),
        );

        TokenBase::mint(&env, &supplier, to_i128(&env, shares));
        set_total_base(&env, base.saturating_add(amount));
        set_total_supplied_liquidity(
            &env,
            total_supplied_liquidity(&env).saturating_add(amount),
        );
        set_user_principal(
            &env,
            &supplier,
            user_principal(&env, &supplier).saturating_add(amount),
        );

        SharesMinted {
            supplier,
            shares,
            amount,
        }
        .publish(&env);
        amount
    }

    /// Withdraw an exact asset entitlement, burning the shares needed
    /// (rounded up). Returns the shares burned.
    pub fn withdraw_liquidity(
        env: Env,
        supplier: Address,
        amount: u128,
        expected_shares: u128,
        max_slippage_bps: u32,
    ) -> u128 {
        let token_address = ensure_initialized(&env);
        supplier.require_auth();
        mev_guard(&env, &supplier);
        bump_pool_state_ttl(&env);
        if amount == 0 {
            panic_with_error!(&env, Error::ZeroAmount);
        }

        let total_shares = total_shares_supply(&env);
        if total_shares == 0 {
            panic_with_error!(&env, Error::InsufficientShares);
        }
        let base = total_base(&env);
        let shares = mul_div_ceil(&env, amount, total_shares, base);
        check_slippage(&env, expected_shares, shares, max_slippage_bps);

        let (commission, _payout) =
            Self::settle_redemption(&env, &token_address, &supplier, shares, amount);

        LiquidityWithdrawn {
            supplier,
            amount,
            shares,
            commission,
        }
        .publish(&env);
        shares
    }

    /// Redeem shares for assets (entitlement rounded down). Returns the
    /// amount paid out after commission.
    pub fn redeem_shares(
        env: Env,
        supplier: Address,
        shares: u128,
        expected_amount: u128,
        max_slippage_bps: u32,
    ) -> u128 {
        let token_address = ensure_initialized(&env);
        supplier.require_auth();
        mev_guard(&env, &supplier);
        bump_pool_state_ttl(&env);
        if shares == 0 {
            panic_with_error!(&env, Error::ZeroAmount);
        }

        let total_shares = total_shares_supply(&env);
        if total_shares == 0 {
            panic_with_error!(&env, Error::InsufficientShares);
        }
        let base = total_base(&env);
        let entitled = mul_div_floor(&env, shares, base, total_shares);
        if entitled == 0 {
            panic_with_error!(&env, Error::AmountBelowMinimum);
        }
        check_slippage(&env, expected_amount, entitled, max_slippage_bps);

        let (commission, payout) =
            Self::settle_redemption(&env, &token_address, &supplier, shares, entitled);

        SharesRedeemed {
            supplier,
            shares,
            amount: payout,
            commission,
        }
        .publish(&env);
        payout
    }

    /// Core-only: draw funds for a borrower. Fails when the request exceeds
    /// custodied cash (total base net of receivables).
    pub fn borrow(env: Env, amount: u128, recipient: Address) {
        let token_address = ensure_initialized(&env);
        require_core(&env);
        bump_pool_state_ttl(&env);
        if amount == 0 {
            panic_with_error!(&env, Error::ZeroAmount);
        }
        let available = Self::get_available_liquidity(env.clone());
        if amount > available {
            panic_with_error!(&env, Error::LowLiquidity);
        }
        let total = total_borrowed(&env).saturating_add(amount);
        set_total_borrowed(&env, total);

        let token_client = token::Client::new(&env, &token_address);
        token_client.transfer(
            &env.current_contract_address(),
            &recipient,
            &to_i128(&env, amount),
        );

        VaultBorrow {
            recipient,
            amount,
            total_borrowed: total,
        }
        .publish(&env);
    }

    /// Core-only: settle a repayment, pulling the funds from `payer`.
    pub fn repay(env: Env, amount: u128, payer: Address) {
        let token_address = ensure_initialized(&env);
        require_core(&env);
        bump_pool_state_ttl(&env);
        if amount == 0 {
            panic_with_error!(&env, Error::ZeroAmount);
        }
        let token_client = token::Client::new(&env, &token_address);
        token_client.transfer(
            &payer,
            &env.current_contract_address(),
            &to_i128(&env, amount),
        );
        let total = total_borrowed(&env).saturating_sub(amount);
        set_total_borrowed(&env, total);

        VaultRepay {
            payer,
            amount,
            total_borrowed: total,
        }
        .publish(&env);
    }

    /// Core-only: mirror accrued borrower interest into the pool. The
    /// receivable grows, so share price reflects yield as it accrues.
    pub fn add_accrued_interest(env: Env, amount: u128) {
        ensure_initialized(&env);
        require_core(&env);
        bump_pool_state_ttl(&env);
        if amount == 0 {
            return;
        }
        let total = total_borrowed(&env).saturating_add(amount);
        set_total_borrowed(&env, total);
        let base = total_base(&env).saturating_add(amount);
        set_total_base(&env, base);
        set_total_accrued_interest(&env, total_accrued_interest(&env).saturating_add(amount));

        InterestAccrued {
            amount,
            total_borrowed: total,
            total_base: base,
        }
        .publish(&env);
    }

    /// Inject external profit (liquidation fees and the like) directly into
    /// the pool. No shares are minted: every holder's share gains value.
    pub fn boost_yield(env: Env, attributed_to: Address, amount: u128) {
        let token_address = ensure_initialized(&env);
        bump_pool_state_ttl(&env);
        if amount == 0 {
            panic_with_error!(&env, Error::ZeroAmount);
        }
        attributed_to.require_auth();
        let token_client = token::Client::new(&env, &token_address);
        token_client.transfer(
            &attributed_to,
            &env.current_contract_address(),
            &to_i128(&env, amount),
        );
        let base = total_base(&env).saturating_add(amount);
        set_total_base(&env, base);
        set_total_accrued_interest(&env, total_accrued_interest(&env).saturating_add(amount));

        YieldBoosted {
            attributed_to,
            amount,
            total_base: base,
        }
        .publish(&env);
    }

    /// Execute a flash loan to `receiver`. The callback must return true and
    /// leave `amount + fee` back in the vault before this call unwinds.
    pub fn flash_loan(env: Env, receiver: Address, amount: u128, data: Bytes) {
        let token_address = ensure_initialized(&env);
        bump_pool_state_ttl(&env);
        if amount == 0 {
            panic_with_error!(&env, Error::ZeroAmount);
        }
        if receiver == env.current_contract_address() {
            panic_with_error!(&env, Error::InvalidReceiver);
        }
        let available = Self::get_available_liquidity(env.clone());
        if amount > available {
            panic_with_error!(&env, Error::LowLiquidity);
        }

        let fee_bps: u32 = env
            .storage()
            .persistent()
            .get(&DataKey::FlashLoanFeeBps)
            .unwrap_or(0);
        let fee = amount.saturating_mul(fee_bps as u128) / BPS_SCALE;

        let token_client = token::Client::new(&env, &token_address);
        let balance_before_i = token_client.balance(&env.current_contract_address());
        if balance_before_i < 0 {
            panic!("invalid cash state");
        }
        let balance_before = balance_before_i as u128;

        token_client.transfer(&env.current_contract_address(), &receiver, &to_i128(&env, amount));

        let accepted = FlashLoanReceiverClient::new(&env, &receiver).on_flash_loan(
            &env.current_contract_address(),
            &amount,
            &fee,
            &data,
        );
        if !accepted {
            panic_with_error!(&env, Error::FlashLoanFailed);
        }

        let balance_after_i = token_client.balance(&env.current_contract_address());
        if balance_after_i < 0 {
            panic!("invalid repayment state");
        }
        let balance_after = balance_after_i as u128;
        let required = balance_before.saturating_add(fee);
        if balance_after < required {
            panic_with_error!(&env, Error::RepaymentFailed);
        }

        let fee_paid = balance_after.saturating_sub(balance_before);
        if fee_paid > 0 {
            set_total_base(&env, total_base(&env).saturating_add(fee_paid));
            set_total_accrued_interest(
                &env,
                total_accrued_interest(&env).saturating_add(fee_paid),
            );
        }

        FlashLoanExecuted {
            receiver,
            amount,
            fee_paid,
        }
        .publish(&env);
    }

    // --- views ---

    pub fn total_assets(env: Env) -> u128 {
        ensure_initialized(&env);
        total_base(&env)
    }

    pub fn get_total_base(env: Env) -> u128 {
        ensure_initialized(&env);
        total_base(&env)
    }

    pub fn get_total_borrowed(env: Env) -> u128 {
        ensure_initialized(&env);
        total_borrowed(&env)
    }

    pub fn get_total_supplied_liquidity(env: Env) -> u128 {
        ensure_initialized(&env);
        total_supplied_liquidity(&env)
    }

    pub fn get_total_accrued_interest(env: Env) -> u128 {
        ensure_initialized(&env);
        total_accrued_interest(&env)
    }

    pub fn get_total_shares(env: Env) -> u128 {
        ensure_initialized(&env);
        total_shares_supply(&env)
    }

    pub fn get_share_balance(env: Env, who: Address) -> u128 {
        ensure_initialized(&env);
        share_balance(&env, &who)
    }

    pub fn get_user_principal(env: Env, who: Address) -> u128 {
        ensure_initialized(&env);
        user_principal(&env, &who)
    }

    /// Custodied cash: total base net of outstanding receivables.
    pub fn get_available_liquidity(env: Env) -> u128 {
        ensure_initialized(&env);
        total_base(&env).saturating_sub(total_borrowed(&env))
    }

    /// Share price scaled 1e6; the genesis price before any shares exist.
    pub fn get_share_price(env: Env) -> u128 {
        ensure_initialized(&env);
        let total_shares = total_shares_supply(&env);
        if total_shares == 0 {
            return SCALE_1E6;
        }
        mul_div_floor(&env, total_base(&env), SCALE_1E6, total_shares)
    }

    /// Borrowed fraction of the principal book, clamped to [0, 1e6].
    pub fn utilization(env: Env) -> u128 {
        ensure_initialized(&env);
        let supplied = total_supplied_liquidity(&env);
        if supplied == 0 {
            return 0;
        }
        let util = total_borrowed(&env).saturating_mul(SCALE_1E6) / supplied;
        if util > SCALE_1E6 {
            SCALE_1E6
        } else {
            util
        }
    }

    /// Effective annualized supply yield from realized share-price growth
    /// since genesis; the commission is already reflected in the price.
    pub fn get_supply_rate(env: Env) -> u128 {
        ensure_initialized(&env);
        let genesis_price: u128 = env
            .storage()
            .persistent()
            .get(&DataKey::GenesisSharePrice)
            .unwrap_or(SCALE_1E6);
        let genesis_time: u64 = env
            .storage()
            .persistent()
            .get(&DataKey::GenesisTime)
            .unwrap_or(env.ledger().timestamp());
        let now = env.ledger().timestamp();
        if now <= genesis_time {
            return 0;
        }
        let elapsed = (now - genesis_time) as u128;
        let price = Self::get_share_price(env.clone());
        if price <= genesis_price {
            return 0;
        }
        let growth = (price - genesis_price).saturating_mul(SCALE_1E6) / genesis_price;
        growth.saturating_mul(SECONDS_PER_YEAR) / elapsed
    }

    pub fn preview_deposit(env: Env, amount: u128) -> u128 {
        ensure_initialized(&env);
        let total_shares = total_shares_supply(&env);
        if total_shares == 0 {
            return amount;
        }
        mul_div_floor(&env, amount, total_shares, total_base(&env))
    }

    pub fn preview_redeem(env: Env, shares: u128) -> u128 {
        ensure_initialized(&env);
        let total_shares = total_shares_supply(&env);
        if total_shares == 0 {
            return 0;
        }
        mul_div_floor(&env, shares, total_base(&env), total_shares)
    }

    pub fn get_flash_loan_fee(env: Env) -> u32 {
        ensure_initialized(&env);
        env.storage()
            .persistent()
            .get(&DataKey::FlashLoanFeeBps)
            .unwrap_or(0)
    }

    pub fn get_profit_target_rate(env: Env) -> u128 {
        ensure_initialized(&env);
        env.storage()
            .persistent()
            .get(&DataKey::ProfitTargetRateScaled)
            .unwrap_or(0)
    }

    pub fn get_underlying_token(env: Env) -> Address {
        ensure_initialized(&env)
    }

    pub fn get_admin(env: Env) -> Address {
        ensure_initialized(&env);
        env.storage()
            .persistent()
            .get(&DataKey::Admin)
            .expect("admin not set")
    }

    // --- internal ---

    /// Burn `shares`, pay out `entitled` minus the commission on its
    /// realized-yield component, and mint the commission back to the fee
    /// recipient at the pre-burn share price so remaining holders are
    /// unaffected. Returns (commission, payout).
    fn settle_redemption(
        env: &Env,
        token_address: &Address,
        supplier: &Address,
        shares: u128,
        entitled: u128,
    ) -> (u128, u128) {
        let total_shares = total_shares_supply(env);
        let base = total_base(env);
        let user_shares = share_balance(env, supplier);
        if user_shares < shares {
            panic_with_error!(env, Error::InsufficientShares);
        }

        let principal = user_principal(env, supplier);
        let principal_portion = mul_div_floor(env, principal, shares, user_shares);
        let realized_yield = entitled.saturating_sub(principal_portion);
        let profit_target: u128 = env
            .storage()
            .persistent()
            .get(&DataKey::ProfitTargetRateScaled)
            .unwrap_or(0);
        let commission = mul_div_floor(env, realized_yield, profit_target, SCALE_1E6);
        let payout = entitled - commission;

        let available = base.saturating_sub(total_borrowed(env));
        if payout > available {
            panic_with_error!(env, Error::LowLiquidity);
        }

        let burn_i128 = to_i128(env, shares);
        TokenBase::update(env, Some(supplier), None, burn_i128);
        emit_burn(env, supplier, burn_i128);

        if commission > 0 {
            let commission_shares = mul_div_floor(env, commission, total_shares, base);
            if commission_shares > 0 {
                let recipient: Address = env
                    .storage()
                    .persistent()
                    .get(&DataKey::FeeRecipient)
                    .expect("fee recipient missing");
                TokenBase::mint(env, &recipient, to_i128(env, commission_shares));
                CommissionMinted {
                    recipient,
                    value: commission,
                    shares: commission_shares,
                }
                .publish(env);
            }
        }

        set_total_base(env, base - payout);
        set_total_supplied_liquidity(
            env,
            total_supplied_liquidity(env).saturating_sub(principal_portion),
        );
        set_user_principal(env, supplier, principal - principal_portion);

        let token_client = token::Client::new(env, token_address);
        token_client.transfer(
            &env.current_contract_address(),
            supplier,
            &to_i128(env, payout),
        );

        (commission, payout)
    }
}
