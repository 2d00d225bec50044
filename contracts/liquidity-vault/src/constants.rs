pub const SCALE_1E6: u128 = 1_000_000u128;
pub const BPS_SCALE: u128 = 10_000u128;
pub const SHARE_DECIMALS: u32 = 7;
pub const SECONDS_PER_YEAR: u128 = 365 * 24 * 60 * 60;
// Commission is a cut of realized yield, never more than half of it.
pub const MAX_PROFIT_TARGET_SCALED: u128 = 500_000u128;
pub const MAX_FLASH_LOAN_FEE_BPS: u32 = 1_000;
