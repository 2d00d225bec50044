pub const SCALE_1E6: u128 = 1_000_000u128;
pub const BPS_SCALE: u128 = 10_000u128;
pub const SECONDS_PER_YEAR: u128 = 365 * 24 * 60 * 60;
pub const MAX_YEARLY_RATE_SCALED: u128 = 10_000_000u128; // 1000% APY cap
pub const MAX_PROFIT_TARGET_SCALED: u128 = 500_000u128;
pub const MAX_FLASH_LOAN_FEE_BPS: u32 = 1_000;
pub const MAX_USER_POSITIONS: u32 = 32;
pub const MAX_POSITION_ASSETS: u32 = 16;

/// Sentinel repay amount meaning "clear the whole debt".
pub const FULL_REPAYMENT: u128 = u128::MAX;

// Per-tier borrow-rate premium on top of the pool rate (scaled 1e6).
pub const STABLE_RATE_PREMIUM_SCALED: u128 = 0;
pub const CROSS_A_RATE_PREMIUM_SCALED: u128 = 20_000;
pub const CROSS_B_RATE_PREMIUM_SCALED: u128 = 50_000;
pub const ISOLATED_RATE_PREMIUM_SCALED: u128 = 100_000;

// Per-tier liquidation fee on the repaid debt (basis points).
pub const STABLE_LIQUIDATION_FEE_BPS: u32 = 50;
pub const CROSS_A_LIQUIDATION_FEE_BPS: u32 = 100;
pub const CROSS_B_LIQUIDATION_FEE_BPS: u32 = 150;
pub const ISOLATED_LIQUIDATION_FEE_BPS: u32 = 200;
