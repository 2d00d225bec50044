use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // Lifecycle (1-9)
    AlreadyInitialized = 1,
    NotInitialized = 2,
    ConfigNotLoaded = 3,

    // Authorization (10-19)
    Unauthorized = 10,

    // Input validation (20-29)
    InvalidPosition = 20,
    PositionNotActive = 21,
    TooManyPositions = 22,
    ZeroAmount = 23,
    AssetNotListed = 24,
    PriceUnavailable = 25,
    AmountOverflow = 26,

    // Policy violations (30-39)
    IsolatedAssetViolation = 30,
    InvalidAssetForIsolation = 31,
    AssetCapacityReached = 32,
    PoolLiquidityLimitReached = 33,
    TooManyCollateralAssets = 34,
    CreditLimitExceeded = 35,
    IsolationDebtCapExceeded = 36,
    InsufficientCollateral = 37,
    RepayExceedsDebt = 38,

    // Liquidity (40-49)
    LowLiquidity = 40,

    // Liquidation state (50-59)
    NotLiquidatable = 50,
    NotEnoughGovernanceTokens = 51,

    // Timing / MEV (60-69)
    MEVSameBlockOperation = 60,
    MEVSlippageExceeded = 61,

    // Interest math (70-79)
    InterestOverflow = 70,

    // Configuration (80-89)
    InvalidConfig = 80,
}
